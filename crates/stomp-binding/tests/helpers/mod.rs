//! Shared test harness for binding integration tests.
//!
//! Wires a `StompBinding` to a `MockConnector` so every operation runs its
//! real code path down to the transport boundary.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use stomp_binding::{BindingConfig, ConnectOptions, ReceivedMessage, Request, StompBinding};
use stomp_protocol::{ConnectionId, Frame, headers};
use stomp_transport::{MockConnector, MockSession};

/// Binding + the mock broker behind it.
pub struct TestHarness {
    pub binding: StompBinding,
    pub connector: Arc<MockConnector>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(BindingConfig::default())
    }

    pub fn with_config(config: BindingConfig) -> Self {
        let connector = Arc::new(MockConnector::new());
        let binding = StompBinding::new(connector.clone(), config);
        Self { binding, connector }
    }

    /// Connect `device_id` to `host` with default options and return the id.
    pub async fn connect(&self, device_id: &str, host: &str) -> ConnectionId {
        self.binding
            .connect(device_id, ConnectOptions::new(host))
            .await
            .expect("connect should validate")
            .success()
            .expect("mock broker accepts connections")
            .connection_id
    }

    /// Connect through the JSON request path, the way an orchestrator would.
    pub async fn connect_json(&self, device_id: &str, config: serde_json::Value) -> serde_json::Value {
        let request: Request = serde_json::from_value(json!({
            "operation": "connect",
            "deviceId": device_id,
            "config": config,
        }))
        .unwrap();
        self.binding.execute(request).await.unwrap()
    }

    /// Mock session backing the n-th opened connection (0-based).
    pub fn session(&self, n: usize) -> Arc<MockSession> {
        self.connector.sessions()[n].clone()
    }

    /// Queue a MESSAGE frame for `subscription` on the n-th session.
    pub fn deliver(&self, n: usize, subscription: &str, message_id: &str, body: &str) {
        self.session(n).push_frame(
            Frame::message("/topic/events", message_id, body)
                .with_header(headers::SUBSCRIPTION, subscription),
        );
    }

    /// Read one frame with a short deadline.
    pub async fn read(&self, connection_id: &ConnectionId) -> Option<ReceivedMessage> {
        self.binding
            .read_frame(connection_id, Some(Duration::from_millis(100)))
            .await
            .unwrap()
            .success()
            .unwrap()
            .frame
    }
}
