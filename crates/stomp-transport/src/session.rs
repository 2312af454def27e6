//! Session traits: what the binding needs from a broker transport client.
//!
//! One `StompSession` exists per registered connection. The binding holds it
//! as `Arc<dyn StompSession>` and clones the handle out of its registries
//! before awaiting, so a slow broker never holds a registry lock.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::TransportResult;
use stomp_protocol::{
    AckMode, BrokerAddress, Credentials, Frame, Heartbeat, StompVersion, TransactionId, headers,
};

// ── Open ──────────────────────────────────────────────────────

/// Everything a transport needs to establish a session.
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub address: BrokerAddress,
    pub credentials: Option<Credentials>,
    pub version: StompVersion,
    pub virtual_host: Option<String>,
    pub heartbeat: Option<Heartbeat>,
}

impl OpenRequest {
    /// Headers of the CONNECT/STOMP frame this request maps to.
    pub fn connect_headers(&self) -> Vec<(String, String)> {
        let mut out = vec![(
            headers::ACCEPT_VERSION.to_string(),
            self.version.accept_version_header(),
        )];
        let host = self
            .virtual_host
            .clone()
            .unwrap_or_else(|| self.address.host.clone());
        out.push((headers::HOST.to_string(), host));
        if let Some(creds) = &self.credentials {
            out.push(("login".to_string(), creds.login.clone()));
            out.push(("passcode".to_string(), creds.passcode.clone()));
        }
        if let Some(hb) = &self.heartbeat {
            out.push((headers::HEART_BEAT.to_string(), hb.header_value()));
        }
        out
    }
}

/// What the broker reported in its CONNECTED frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    /// `session` header, if the broker sent one.
    pub session_id: Option<String>,
    /// Negotiated `version` header. When absent the requested version is kept.
    pub version: Option<StompVersion>,
    /// `server` header (broker product string).
    pub server: Option<String>,
}

/// A freshly opened session plus the broker's CONNECTED details.
pub struct OpenedSession {
    pub session: Arc<dyn StompSession>,
    pub info: SessionInfo,
}

/// Opens sessions to broker endpoints.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, request: &OpenRequest) -> TransportResult<OpenedSession>;
}

// ── Session ───────────────────────────────────────────────────

/// Arguments of a SUBSCRIBE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeRequest {
    pub destination: String,
    pub id: String,
    pub ack: AckMode,
    pub selector: Option<String>,
    pub headers: Vec<(String, String)>,
}

/// Wire operations on one open broker session.
#[async_trait]
pub trait StompSession: Send + Sync {
    /// SEND a payload to a destination.
    async fn publish(
        &self,
        destination: &str,
        payload: &[u8],
        headers: &[(String, String)],
    ) -> TransportResult<()>;

    async fn subscribe(&self, request: &SubscribeRequest) -> TransportResult<()>;

    async fn unsubscribe(&self, destination: &str, id: &str) -> TransportResult<()>;

    /// Next inbound frame, or `None` when nothing is available. May block.
    async fn read_frame(&self) -> TransportResult<Option<Frame>>;

    /// ACK the given MESSAGE frame.
    async fn acknowledge(&self, frame: &Frame) -> TransportResult<()>;

    /// NACK the given MESSAGE frame.
    async fn reject(&self, frame: &Frame) -> TransportResult<()>;

    async fn begin(&self, transaction: &TransactionId) -> TransportResult<()>;

    async fn commit(&self, transaction: &TransactionId) -> TransportResult<()>;

    async fn abort(&self, transaction: &TransactionId) -> TransportResult<()>;

    /// DISCONNECT and release the underlying socket.
    async fn close(&self) -> TransportResult<()>;
}
