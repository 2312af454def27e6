//! The binding aggregate: four in-memory registries behind their own locks.
//!
//! Lock order is connections → subscriptions → pending → transactions.
//! Every method that needs more than one registry acquires them in that
//! order, and no guard is held across a transport `.await`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use stomp_protocol::{
    AckMode, BrokerAddress, ConnectionId, Credentials, Frame, Heartbeat, MessageId, StompVersion,
    SubscriptionId, TransactionId,
};
use stomp_transport::{Connector, StompSession};

use crate::config::BindingConfig;
use crate::error::{BindingError, BindingResult};

/// Lifecycle of a broker connection.
///
/// Only `Connected` is ever stored: a connect either fully succeeds or leaves
/// no entry, and a disconnect removes the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

/// A registered broker connection.
pub(crate) struct ConnectionEntry {
    pub id: ConnectionId,
    pub device_id: String,
    pub address: BrokerAddress,
    pub credentials: Option<Credentials>,
    pub version: StompVersion,
    pub virtual_host: Option<String>,
    pub heartbeat: Option<Heartbeat>,
    pub state: ConnectionState,
    pub session_id: String,
    pub server_product: Option<String>,
    pub connected_at: DateTime<Utc>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub session: Arc<dyn StompSession>,
}

/// A subscription bound to exactly one live connection.
#[derive(Debug, Clone)]
pub(crate) struct SubscriptionEntry {
    pub id: SubscriptionId,
    pub connection_id: ConnectionId,
    pub destination: String,
    pub ack_mode: AckMode,
    pub selector: Option<String>,
    pub created_at: DateTime<Utc>,
    pub message_count: u64,
}

/// Pending frames are tracked per connection: a broker fanning one message out
/// to several subscribers reuses the same `message-id` on each.
pub(crate) type PendingKey = (ConnectionId, MessageId);

/// A delivered MESSAGE frame awaiting ack or nack.
#[derive(Debug, Clone)]
pub(crate) struct PendingFrame {
    pub connection_id: ConnectionId,
    pub subscription_id: Option<SubscriptionId>,
    pub frame: Frame,
    pub received_at: DateTime<Utc>,
}

/// Connection, subscription, pending-frame and transaction bookkeeping for
/// one service instance.
///
/// Cheap to clone; clones share the same registries. Construct one at
/// service start, hand clones to callers, and call `shutdown` at the end.
#[derive(Clone)]
pub struct StompBinding {
    pub(crate) config: Arc<BindingConfig>,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) connections: Arc<RwLock<HashMap<ConnectionId, ConnectionEntry>>>,
    pub(crate) subscriptions: Arc<RwLock<HashMap<SubscriptionId, SubscriptionEntry>>>,
    pub(crate) pending: Arc<RwLock<HashMap<PendingKey, PendingFrame>>>,
    /// Owner of every open transaction.
    pub(crate) transactions: Arc<RwLock<HashMap<TransactionId, ConnectionId>>>,
}

impl StompBinding {
    pub fn new(connector: Arc<dyn Connector>, config: BindingConfig) -> Self {
        Self {
            config: Arc::new(config),
            connector,
            connections: Arc::new(RwLock::new(HashMap::new())),
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            pending: Arc::new(RwLock::new(HashMap::new())),
            transactions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Binding with default configuration.
    pub fn with_connector(connector: Arc<dyn Connector>) -> Self {
        Self::new(connector, BindingConfig::default())
    }

    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    /// Session handle of a live connection, cloned out of the registry.
    pub(crate) async fn session_for(
        &self,
        id: &ConnectionId,
    ) -> BindingResult<Arc<dyn StompSession>> {
        self.connections
            .read()
            .await
            .get(id)
            .map(|entry| entry.session.clone())
            .ok_or_else(|| BindingError::connection_not_found(id))
    }

    /// Close every connection and empty all registries.
    pub async fn shutdown(&self) {
        let ids: Vec<ConnectionId> = self.connections.read().await.keys().cloned().collect();
        for id in ids {
            // A concurrent disconnect may already have removed it.
            if let Err(e) = self.disconnect(&id).await {
                tracing::debug!(connection_id = %id, error = %e, "skipped during shutdown");
            }
        }

        self.subscriptions.write().await.clear();
        self.pending.write().await.clear();
        self.transactions.write().await.clear();
        tracing::info!("stomp binding shut down");
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn subscription_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.read().await.len()
    }

    pub async fn open_transaction_count(&self) -> usize {
        self.transactions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stomp_transport::MockConnector;

    #[tokio::test]
    async fn new_binding_is_empty() {
        let binding = StompBinding::with_connector(Arc::new(MockConnector::new()));
        assert_eq!(binding.connection_count().await, 0);
        assert_eq!(binding.subscription_count().await, 0);
        assert_eq!(binding.pending_count().await, 0);
        assert_eq!(binding.open_transaction_count().await, 0);
        assert_eq!(binding.config().read_timeout_ms, 30_000);
    }

    #[tokio::test]
    async fn session_for_unknown_connection() {
        let binding = StompBinding::with_connector(Arc::new(MockConnector::new()));
        let err = binding
            .session_for(&ConnectionId::from("conn-missing"))
            .await
            .err()
            .expect("should fail");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("conn-missing"));
    }

    #[test]
    fn connection_state_serialization() {
        assert_eq!(
            serde_json::to_string(&ConnectionState::Connected).unwrap(),
            r#""connected""#
        );
    }
}
