//! Parameter model adapter.
//!
//! Projects a device's live connections into the flat parameter tree the
//! device data model reads:
//!
//! ```text
//! Device.STOMP.ConnectionNumberOfEntries
//! Device.STOMP.Connection.{i}.Enable | Alias | Status | Username | Password
//! Device.STOMP.Connection.{i}.CredentialsConfigured | VirtualHost | ProtocolVersion
//! Device.STOMP.Connection.{i}.EnableHeartbeats | OutgoingHeartbeat | IncomingHeartbeat
//! Device.STOMP.Connection.{i}.ServerNumberOfEntries
//! Device.STOMP.Connection.{i}.Server.1.Enable | Address | Port | EnableEncryption
//! ```
//!
//! `{i}` is 1-based and follows connect order, so an index shifts when an
//! earlier connection is closed. `Alias` carries the connection id and is
//! the stable handle.

use std::collections::BTreeMap;

use serde::Serialize;
use stomp_protocol::Heartbeat;

use crate::connections::ConnectionStats;
use crate::state::{ConnectionState, StompBinding};

/// A parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    UnsignedInt(u64),
    String(String),
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::UnsignedInt(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u64> for ParameterValue {
    fn from(value: u64) -> Self {
        Self::UnsignedInt(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Flat `path → value` map, sorted by path.
pub type ParameterMap = BTreeMap<String, ParameterValue>;

impl StompBinding {
    /// Every parameter describing `device_id`'s current connections.
    pub async fn get_all_parameters(&self, device_id: &str) -> ParameterMap {
        let connections = self.list_connections(Some(device_id)).await;
        project(&self.config.parameter_root, &connections)
    }

    /// Whether `name` lies under the parameter namespace root.
    pub fn is_valid_parameter(&self, name: &str) -> bool {
        name.starts_with(self.config.parameter_root.as_str())
    }
}

fn project(root: &str, connections: &[ConnectionStats]) -> ParameterMap {
    let mut params = ParameterMap::new();
    params.insert(
        format!("{root}ConnectionNumberOfEntries"),
        (connections.len() as u64).into(),
    );

    for (i, conn) in connections.iter().enumerate() {
        let prefix = format!("{root}Connection.{}.", i + 1);
        let mut set = |name: &str, value: ParameterValue| {
            params.insert(format!("{prefix}{name}"), value);
        };

        let heartbeat = Heartbeat {
            outgoing: conn.heartbeat_outgoing_ms.unwrap_or(0),
            incoming: conn.heartbeat_incoming_ms.unwrap_or(0),
        };
        let status = match conn.state {
            ConnectionState::Connected => "Enabled",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Disconnected => "Disabled",
        };

        set("Enable", true.into());
        set("Alias", conn.connection_id.as_str().into());
        set("Status", status.into());
        set("Username", conn.login.clone().unwrap_or_default().into());
        set("Password", String::new().into());
        set("CredentialsConfigured", conn.has_credentials.into());
        set(
            "VirtualHost",
            conn.virtual_host.clone().unwrap_or_default().into(),
        );
        set("ProtocolVersion", conn.protocol_version.as_str().into());
        set("EnableHeartbeats", heartbeat.is_enabled().into());
        set("OutgoingHeartbeat", heartbeat.outgoing.into());
        set("IncomingHeartbeat", heartbeat.incoming.into());
        set("ServerNumberOfEntries", 1u64.into());
        set("Server.1.Enable", true.into());
        set("Server.1.Address", conn.host.clone().into());
        set("Server.1.Port", u64::from(conn.port).into());
        set("Server.1.EnableEncryption", conn.scheme.is_tls().into());
    }

    params
}
