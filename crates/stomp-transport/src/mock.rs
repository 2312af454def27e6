//! Mock transport for testing without a real broker.
//!
//! `MockConnector` hands out `MockSession`s that record every call, serve
//! queued inbound frames, track begun transactions like a broker would, and
//! can be told to fail any operation.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::error::{TransportError, TransportResult};
use crate::session::{
    Connector, OpenRequest, OpenedSession, SessionInfo, StompSession, SubscribeRequest,
};
use stomp_protocol::{Frame, TransactionId};

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Publish,
    Subscribe,
    Unsubscribe,
    Read,
    Acknowledge,
    Reject,
    Begin,
    Commit,
    Abort,
    Close,
}

/// A recorded session call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    Publish {
        destination: String,
        payload: Vec<u8>,
        headers: Vec<(String, String)>,
    },
    Subscribe(SubscribeRequest),
    Unsubscribe {
        destination: String,
        id: String,
    },
    /// Message id of the acked frame.
    Acknowledge(Option<String>),
    Reject(Option<String>),
    Begin(TransactionId),
    Commit(TransactionId),
    Abort(TransactionId),
    Close,
}

// ── MockSession ───────────────────────────────────────────────

/// In-memory session. Thread-safe via `Mutex` (fine for test contexts).
pub struct MockSession {
    request: OpenRequest,
    calls: Mutex<Vec<SessionCall>>,
    inbound: Mutex<VecDeque<Frame>>,
    transactions: Mutex<HashSet<TransactionId>>,
    failures: Mutex<HashMap<FailPoint, TransportError>>,
    block_reads: AtomicBool,
    closed: AtomicBool,
}

impl MockSession {
    pub fn new(request: OpenRequest) -> Self {
        Self {
            request,
            calls: Mutex::new(Vec::new()),
            inbound: Mutex::new(VecDeque::new()),
            transactions: Mutex::new(HashSet::new()),
            failures: Mutex::new(HashMap::new()),
            block_reads: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// The request this session was opened with.
    pub fn request(&self) -> &OpenRequest {
        &self.request
    }

    /// Queue a frame for the next `read_frame`.
    pub fn push_frame(&self, frame: Frame) {
        self.inbound.lock().unwrap().push_back(frame);
    }

    /// Make `read_frame` park forever while the queue is empty.
    pub fn block_reads(&self, block: bool) {
        self.block_reads.store(block, Ordering::SeqCst);
    }

    /// Make every subsequent call of `point` fail with `error`.
    pub fn fail(&self, point: FailPoint, error: TransportError) {
        self.failures.lock().unwrap().insert(point, error);
    }

    pub fn clear_failure(&self, point: FailPoint) {
        self.failures.lock().unwrap().remove(&point);
    }

    /// All recorded calls, oldest first.
    pub fn calls(&self) -> Vec<SessionCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Transactions begun and not yet committed or aborted.
    pub fn open_transactions(&self) -> Vec<TransactionId> {
        self.transactions.lock().unwrap().iter().cloned().collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check(&self, point: FailPoint) -> TransportResult<()> {
        if let Some(err) = self.failures.lock().unwrap().get(&point) {
            return Err(err.clone());
        }
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        Ok(())
    }

    fn record(&self, call: SessionCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn finish_transaction(&self, transaction: &TransactionId) -> TransportResult<()> {
        if self.transactions.lock().unwrap().remove(transaction) {
            Ok(())
        } else {
            Err(TransportError::Rejected(format!(
                "transaction {transaction} not active on this session"
            )))
        }
    }
}

#[async_trait]
impl StompSession for MockSession {
    async fn publish(
        &self,
        destination: &str,
        payload: &[u8],
        headers: &[(String, String)],
    ) -> TransportResult<()> {
        self.check(FailPoint::Publish)?;
        self.record(SessionCall::Publish {
            destination: destination.to_string(),
            payload: payload.to_vec(),
            headers: headers.to_vec(),
        });
        Ok(())
    }

    async fn subscribe(&self, request: &SubscribeRequest) -> TransportResult<()> {
        self.check(FailPoint::Subscribe)?;
        self.record(SessionCall::Subscribe(request.clone()));
        Ok(())
    }

    async fn unsubscribe(&self, destination: &str, id: &str) -> TransportResult<()> {
        self.check(FailPoint::Unsubscribe)?;
        self.record(SessionCall::Unsubscribe {
            destination: destination.to_string(),
            id: id.to_string(),
        });
        Ok(())
    }

    async fn read_frame(&self) -> TransportResult<Option<Frame>> {
        self.check(FailPoint::Read)?;
        let next = self.inbound.lock().unwrap().pop_front();
        match next {
            Some(frame) => Ok(Some(frame)),
            None if self.block_reads.load(Ordering::SeqCst) => {
                std::future::pending::<()>().await;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn acknowledge(&self, frame: &Frame) -> TransportResult<()> {
        self.check(FailPoint::Acknowledge)?;
        self.record(SessionCall::Acknowledge(frame.message_id().map(str::to_string)));
        Ok(())
    }

    async fn reject(&self, frame: &Frame) -> TransportResult<()> {
        self.check(FailPoint::Reject)?;
        self.record(SessionCall::Reject(frame.message_id().map(str::to_string)));
        Ok(())
    }

    async fn begin(&self, transaction: &TransactionId) -> TransportResult<()> {
        self.check(FailPoint::Begin)?;
        self.transactions.lock().unwrap().insert(transaction.clone());
        self.record(SessionCall::Begin(transaction.clone()));
        Ok(())
    }

    async fn commit(&self, transaction: &TransactionId) -> TransportResult<()> {
        self.check(FailPoint::Commit)?;
        self.finish_transaction(transaction)?;
        self.record(SessionCall::Commit(transaction.clone()));
        Ok(())
    }

    async fn abort(&self, transaction: &TransactionId) -> TransportResult<()> {
        self.check(FailPoint::Abort)?;
        self.finish_transaction(transaction)?;
        self.record(SessionCall::Abort(transaction.clone()));
        Ok(())
    }

    async fn close(&self) -> TransportResult<()> {
        self.check(FailPoint::Close)?;
        self.closed.store(true, Ordering::SeqCst);
        self.record(SessionCall::Close);
        Ok(())
    }
}

// ── MockConnector ─────────────────────────────────────────────

/// Connector producing `MockSession`s.
///
/// By default every open succeeds, the broker confirms the requested
/// version and reports a `mock-session-N` session id.
pub struct MockConnector {
    sessions: Mutex<Vec<Arc<MockSession>>>,
    open_failure: Mutex<Option<TransportError>>,
    broker_info: Mutex<Option<SessionInfo>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(Vec::new()),
            open_failure: Mutex::new(None),
            broker_info: Mutex::new(None),
        }
    }

    /// Fail subsequent opens with `error` (`None` to recover).
    pub fn fail_open(&self, error: Option<TransportError>) {
        *self.open_failure.lock().unwrap() = error;
    }

    /// Report this CONNECTED info instead of the defaults.
    pub fn set_broker_info(&self, info: SessionInfo) {
        *self.broker_info.lock().unwrap() = Some(info);
    }

    /// Every session opened so far, oldest first.
    pub fn sessions(&self) -> Vec<Arc<MockSession>> {
        self.sessions.lock().unwrap().clone()
    }

    pub fn last_session(&self) -> Option<Arc<MockSession>> {
        self.sessions.lock().unwrap().last().cloned()
    }

    pub fn open_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, request: &OpenRequest) -> TransportResult<OpenedSession> {
        if let Some(err) = self.open_failure.lock().unwrap().clone() {
            return Err(err);
        }

        let session = Arc::new(MockSession::new(request.clone()));
        let mut sessions = self.sessions.lock().unwrap();
        sessions.push(session.clone());

        let info = self
            .broker_info
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| SessionInfo {
                session_id: Some(format!("mock-session-{}", sessions.len())),
                version: Some(request.version),
                server: Some("MockBroker/1.0".to_string()),
            });

        Ok(OpenedSession { session, info })
    }
}
