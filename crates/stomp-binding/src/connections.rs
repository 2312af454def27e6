//! Connection registry operations: connect, disconnect, stats.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use stomp_protocol::{
    ConnectionId, Scheme, StompVersion, SubscriptionId, local_session_id,
};

use crate::config::ConnectOptions;
use crate::error::{BindingError, BindingResult, Outcome};
use crate::state::{
    ConnectionEntry, ConnectionState, PendingFrame, PendingKey, StompBinding, SubscriptionEntry,
};

/// Result of a successful `connect`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connected {
    pub connection_id: ConnectionId,
    pub session_id: String,
    pub protocol_version: StompVersion,
    /// `host:port`
    pub server: String,
}

/// Result of `disconnect`. Local cleanup always happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Disconnected {
    pub connection_id: ConnectionId,
    pub disconnected_at: DateTime<Utc>,
    pub subscriptions_removed: usize,
    /// Set when the broker-side DISCONNECT failed; the broker may still
    /// hold state for this session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_error: Option<String>,
}

/// Point-in-time view of one connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStats {
    pub connection_id: ConnectionId,
    pub device_id: String,
    pub state: ConnectionState,
    pub session_id: String,
    pub protocol_version: StompVersion,
    pub server: String,
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_host: Option<String>,
    pub has_credentials: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat_outgoing_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat_incoming_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_product: Option<String>,
    pub subscriptions_count: usize,
    pub pending_frames_count: usize,
    pub connected_at: DateTime<Utc>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub uptime_secs: i64,
}

impl StompBinding {
    /// Open a broker session for `device_id` and register it.
    ///
    /// Invalid options fail before any network action. A transport failure
    /// comes back as `Outcome::Error` and leaves the registry untouched.
    pub async fn connect(
        &self,
        device_id: &str,
        options: ConnectOptions,
    ) -> BindingResult<Outcome<Connected>> {
        let request = options.into_open_request(self.config.default_protocol_version)?;

        let opened = match self.connector.open(&request).await {
            Ok(opened) => opened,
            Err(e) => {
                tracing::warn!(
                    device_id,
                    broker = %request.address,
                    error = %e,
                    "connect failed"
                );
                return Ok(e.into());
            }
        };

        let id = ConnectionId::generate();
        let session_id = opened.info.session_id.clone().unwrap_or_else(local_session_id);
        let version = opened.info.version.unwrap_or(request.version);
        let server = request.address.server();
        let now = Utc::now();

        let entry = ConnectionEntry {
            id: id.clone(),
            device_id: device_id.to_string(),
            address: request.address.clone(),
            credentials: request.credentials,
            version,
            virtual_host: request.virtual_host,
            heartbeat: request.heartbeat,
            state: ConnectionState::Connected,
            session_id: session_id.clone(),
            server_product: opened.info.server,
            connected_at: now,
            last_heartbeat: None,
            session: opened.session,
        };
        self.connections.write().await.insert(id.clone(), entry);

        tracing::info!(
            connection_id = %id,
            device_id,
            broker = %request.address,
            session_id = %session_id,
            version = %version,
            "connection established"
        );

        Ok(Outcome::Success(Connected {
            connection_id: id,
            session_id,
            protocol_version: version,
            server,
        }))
    }

    /// Close a connection and cascade-remove everything bound to it.
    ///
    /// Local state is removed even if the broker-side close fails; that
    /// failure is reported through `remote_error`.
    pub async fn disconnect(&self, id: &ConnectionId) -> BindingResult<Outcome<Disconnected>> {
        let session = self.session_for(id).await?;

        let remote_error = match session.close().await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(
                    connection_id = %id,
                    error = %e,
                    "broker disconnect failed, removing local state anyway"
                );
                Some(e.to_string())
            }
        };

        let mut connections = self.connections.write().await;
        let mut subscriptions = self.subscriptions.write().await;
        let mut pending = self.pending.write().await;
        let mut transactions = self.transactions.write().await;

        if connections.remove(id).is_none() {
            // Lost a race with another disconnect.
            return Err(BindingError::connection_not_found(id));
        }

        let before = subscriptions.len();
        subscriptions.retain(|_, sub| &sub.connection_id != id);
        let subscriptions_removed = before - subscriptions.len();

        let before = pending.len();
        pending.retain(|(owner, _), _| owner != id);
        let frames_dropped = before - pending.len();

        let before = transactions.len();
        transactions.retain(|_, owner| owner != id);
        let transactions_dropped = before - transactions.len();

        tracing::info!(
            connection_id = %id,
            subscriptions_removed,
            frames_dropped,
            transactions_dropped,
            "connection closed"
        );

        Ok(Outcome::Success(Disconnected {
            connection_id: id.clone(),
            disconnected_at: Utc::now(),
            subscriptions_removed,
            remote_error,
        }))
    }

    /// Snapshot of one connection.
    pub async fn get_connection_stats(&self, id: &ConnectionId) -> BindingResult<ConnectionStats> {
        let connections = self.connections.read().await;
        let entry = connections
            .get(id)
            .ok_or_else(|| BindingError::connection_not_found(id))?;
        let subscriptions = self.subscriptions.read().await;
        let pending = self.pending.read().await;

        Ok(stats_for(entry, &subscriptions, &pending, Utc::now()))
    }

    /// Snapshots of all connections, optionally only those of one device,
    /// ordered by connect time.
    pub async fn list_connections(&self, device_id: Option<&str>) -> Vec<ConnectionStats> {
        let connections = self.connections.read().await;
        let subscriptions = self.subscriptions.read().await;
        let pending = self.pending.read().await;
        let now = Utc::now();

        let mut out: Vec<ConnectionStats> = connections
            .values()
            .filter(|entry| device_id.is_none_or(|d| entry.device_id == d))
            .map(|entry| stats_for(entry, &subscriptions, &pending, now))
            .collect();
        out.sort_by(|a, b| {
            a.connected_at
                .cmp(&b.connected_at)
                .then_with(|| a.connection_id.cmp(&b.connection_id))
        });
        out
    }
}

fn stats_for(
    entry: &ConnectionEntry,
    subscriptions: &HashMap<SubscriptionId, SubscriptionEntry>,
    pending: &HashMap<PendingKey, PendingFrame>,
    now: DateTime<Utc>,
) -> ConnectionStats {
    let subscriptions_count = subscriptions
        .values()
        .filter(|sub| sub.connection_id == entry.id)
        .count();
    let pending_frames_count = pending
        .values()
        .filter(|frame| frame.connection_id == entry.id)
        .count();

    ConnectionStats {
        connection_id: entry.id.clone(),
        device_id: entry.device_id.clone(),
        state: entry.state,
        session_id: entry.session_id.clone(),
        protocol_version: entry.version,
        server: entry.address.server(),
        scheme: entry.address.scheme,
        host: entry.address.host.clone(),
        port: entry.address.port,
        virtual_host: entry.virtual_host.clone(),
        has_credentials: entry.credentials.is_some(),
        login: entry.credentials.as_ref().map(|c| c.login.clone()),
        heartbeat_outgoing_ms: entry.heartbeat.map(|hb| hb.outgoing),
        heartbeat_incoming_ms: entry.heartbeat.map(|hb| hb.incoming),
        broker_product: entry.server_product.clone(),
        subscriptions_count,
        pending_frames_count,
        connected_at: entry.connected_at,
        last_heartbeat: entry.last_heartbeat,
        uptime_secs: (now - entry.connected_at).num_seconds(),
    }
}
