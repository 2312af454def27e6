//! Operation dispatch for orchestration callers.
//!
//! Requests arrive as JSON tagged with `operation`, deserialize into the
//! closed `Request` enum, and `StompBinding::execute` handles every variant
//! exhaustively. Replies are the `{status, ...}` envelope as JSON.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use stomp_protocol::{ConnectionId, MessageId, SubscriptionId, TransactionId};

use crate::config::ConnectOptions;
use crate::error::{BindingResult, Outcome};
use crate::state::StompBinding;
use crate::subscriptions::SubscribeOptions;
use crate::transactions::SendOptions;

/// One operation on the binding.
#[derive(Debug, Clone, Deserialize)]
#[serde(
    tag = "operation",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Request {
    Connect {
        device_id: String,
        config: ConnectOptions,
    },
    Disconnect {
        connection_id: ConnectionId,
    },
    Subscribe {
        connection_id: ConnectionId,
        destination: String,
        #[serde(default)]
        options: SubscribeOptions,
    },
    Unsubscribe {
        subscription_id: SubscriptionId,
    },
    Send {
        connection_id: ConnectionId,
        destination: String,
        #[serde(default)]
        body: String,
        #[serde(default)]
        options: SendOptions,
    },
    ReadFrame {
        connection_id: ConnectionId,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    Ack {
        message_id: MessageId,
        connection_id: ConnectionId,
    },
    Nack {
        message_id: MessageId,
        connection_id: ConnectionId,
    },
    BeginTransaction {
        connection_id: ConnectionId,
    },
    CommitTransaction {
        transaction_id: TransactionId,
    },
    AbortTransaction {
        transaction_id: TransactionId,
    },
    GetConnectionStats {
        connection_id: ConnectionId,
    },
    GetAllParameters {
        device_id: String,
    },
    IsValidParameter {
        name: String,
    },
}

impl Request {
    /// Operation name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Disconnect { .. } => "disconnect",
            Self::Subscribe { .. } => "subscribe",
            Self::Unsubscribe { .. } => "unsubscribe",
            Self::Send { .. } => "send",
            Self::ReadFrame { .. } => "readFrame",
            Self::Ack { .. } => "ack",
            Self::Nack { .. } => "nack",
            Self::BeginTransaction { .. } => "beginTransaction",
            Self::CommitTransaction { .. } => "commitTransaction",
            Self::AbortTransaction { .. } => "abortTransaction",
            Self::GetConnectionStats { .. } => "getConnectionStats",
            Self::GetAllParameters { .. } => "getAllParameters",
            Self::IsValidParameter { .. } => "isValidParameter",
        }
    }
}

fn envelope<T: Serialize>(outcome: Outcome<T>) -> serde_json::Value {
    serde_json::to_value(&outcome).unwrap_or_else(|e| {
        json!({
            "status": "error",
            "message": format!("failed to encode reply: {e}"),
        })
    })
}

impl StompBinding {
    /// Run one request and return its reply envelope.
    ///
    /// Validation and not-found failures stay `Err`; transport failures are
    /// already folded into the envelope.
    pub async fn execute(&self, request: Request) -> BindingResult<serde_json::Value> {
        let op = request.name();
        tracing::debug!(op, "executing request");

        let reply = match request {
            Request::Connect { device_id, config } => {
                envelope(self.connect(&device_id, config).await?)
            }
            Request::Disconnect { connection_id } => {
                envelope(self.disconnect(&connection_id).await?)
            }
            Request::Subscribe {
                connection_id,
                destination,
                options,
            } => envelope(self.subscribe(&connection_id, &destination, options).await?),
            Request::Unsubscribe { subscription_id } => {
                envelope(self.unsubscribe(&subscription_id).await?)
            }
            Request::Send {
                connection_id,
                destination,
                body,
                options,
            } => envelope(
                self.send(&connection_id, &destination, body.as_bytes(), options)
                    .await?,
            ),
            Request::ReadFrame {
                connection_id,
                timeout_ms,
            } => envelope(
                self.read_frame(&connection_id, timeout_ms.map(Duration::from_millis))
                    .await?,
            ),
            Request::Ack {
                message_id,
                connection_id,
            } => envelope(self.ack(&message_id, &connection_id).await?),
            Request::Nack {
                message_id,
                connection_id,
            } => envelope(self.nack(&message_id, &connection_id).await?),
            Request::BeginTransaction { connection_id } => {
                envelope(self.begin_transaction(&connection_id).await?)
            }
            Request::CommitTransaction { transaction_id } => {
                envelope(self.commit_transaction(&transaction_id).await?)
            }
            Request::AbortTransaction { transaction_id } => {
                envelope(self.abort_transaction(&transaction_id).await?)
            }
            Request::GetConnectionStats { connection_id } => {
                envelope(Outcome::Success(self.get_connection_stats(&connection_id).await?))
            }
            Request::GetAllParameters { device_id } => envelope(Outcome::Success(json!({
                "parameters": self.get_all_parameters(&device_id).await,
            }))),
            Request::IsValidParameter { name } => envelope(Outcome::Success(json!({
                "valid": self.is_valid_parameter(&name),
            }))),
        };

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stomp_transport::MockConnector;

    fn binding() -> StompBinding {
        StompBinding::with_connector(Arc::new(MockConnector::new()))
    }

    #[test]
    fn deserialize_connect_request() {
        let req: Request = serde_json::from_value(json!({
            "operation": "connect",
            "deviceId": "device1",
            "config": {"host": "broker.local", "protocolVersion": "1.2"}
        }))
        .unwrap();
        assert_eq!(req.name(), "connect");
        assert!(matches!(req, Request::Connect { ref device_id, .. } if device_id == "device1"));
    }

    #[test]
    fn deserialize_subscribe_with_options() {
        let req: Request = serde_json::from_value(json!({
            "operation": "subscribe",
            "connectionId": "conn-1",
            "destination": "/topic/events",
            "options": {"ackMode": "client-individual", "id": "s-1"}
        }))
        .unwrap();
        let Request::Subscribe { options, .. } = req else {
            panic!("expected subscribe");
        };
        assert_eq!(options.ack_mode, stomp_protocol::AckMode::ClientIndividual);
        assert_eq!(options.id.as_deref(), Some("s-1"));
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let res: Result<Request, _> = serde_json::from_value(json!({
            "operation": "purgeQueue",
            "connectionId": "conn-1"
        }));
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn execute_connect_and_stats() {
        let binding = binding();
        let reply = binding
            .execute(Request::Connect {
                device_id: "device1".into(),
                config: ConnectOptions::new("broker.local"),
            })
            .await
            .unwrap();
        assert_eq!(reply["status"], "success");
        assert_eq!(reply["server"], "broker.local:61613");
        assert_eq!(reply["protocolVersion"], "1.2");

        let id = ConnectionId::from(reply["connectionId"].as_str().unwrap());
        let stats = binding
            .execute(Request::GetConnectionStats { connection_id: id })
            .await
            .unwrap();
        assert_eq!(stats["state"], "connected");
        assert_eq!(stats["subscriptionsCount"], 0);
    }

    #[tokio::test]
    async fn execute_not_found_stays_err() {
        let err = binding()
            .execute(Request::Ack {
                message_id: "nonexistent-id".into(),
                connection_id: "conn-x".into(),
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn execute_parameter_queries() {
        let binding = binding();
        let reply = binding
            .execute(Request::IsValidParameter {
                name: "Device.STOMP.Connection.1.Enable".into(),
            })
            .await
            .unwrap();
        assert_eq!(reply, json!({"status": "success", "valid": true}));

        let reply = binding
            .execute(Request::GetAllParameters {
                device_id: "device1".into(),
            })
            .await
            .unwrap();
        assert_eq!(
            reply["parameters"]["Device.STOMP.ConnectionNumberOfEntries"],
            0
        );
    }
}
