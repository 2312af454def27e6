//! Pending-frame tracker: reading deliveries and settling them with ack/nack.
//!
//! Each MESSAGE frame read from a connection is parked under the pair
//! (connection id, message id) until exactly one `ack` or `nack` on that
//! connection consumes it.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use stomp_protocol::{ConnectionId, Frame, MessageId, SubscriptionId};
use stomp_transport::{IncomingFrame, classify};

use crate::error::{BindingError, BindingResult, Outcome};
use crate::state::{PendingFrame, StompBinding};

/// A frame as handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedMessage {
    pub message_id: MessageId,
    pub subscription_id: Option<SubscriptionId>,
    pub command: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub received_at: DateTime<Utc>,
}

impl ReceivedMessage {
    fn from_frame(
        message_id: MessageId,
        subscription_id: Option<SubscriptionId>,
        frame: &Frame,
        received_at: DateTime<Utc>,
    ) -> Self {
        let mut headers = BTreeMap::new();
        for (name, value) in &frame.headers {
            headers
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
        Self {
            message_id,
            subscription_id,
            command: frame.command.as_str().to_string(),
            headers,
            body: frame.body_text(),
            received_at,
        }
    }
}

/// Result of `read_frame`; `frame` is `None` when nothing arrived in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRead {
    pub frame: Option<ReceivedMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledged {
    pub message_id: MessageId,
    pub acknowledged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejected {
    pub message_id: MessageId,
    pub rejected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settle {
    Ack,
    Nack,
}

impl Settle {
    fn as_str(self) -> &'static str {
        match self {
            Self::Ack => "ack",
            Self::Nack => "nack",
        }
    }
}

impl StompBinding {
    /// Pull the next frame from a connection.
    ///
    /// Waits at most `deadline` (or the configured `read_timeout_ms`). Call
    /// it from a task dedicated to the connection: the wait holds no
    /// registry lock, but it does occupy the calling task.
    pub async fn read_frame(
        &self,
        connection_id: &ConnectionId,
        deadline: Option<Duration>,
    ) -> BindingResult<Outcome<FrameRead>> {
        let session = self.session_for(connection_id).await?;
        let deadline =
            deadline.unwrap_or_else(|| Duration::from_millis(self.config.read_timeout_ms));

        let frame = match tokio::time::timeout(deadline, session.read_frame()).await {
            Err(_) => {
                tracing::trace!(connection_id = %connection_id, "read deadline elapsed");
                return Ok(Outcome::Success(FrameRead { frame: None }));
            }
            Ok(Err(e)) => {
                tracing::warn!(connection_id = %connection_id, error = %e, "frame read failed");
                return Ok(e.into());
            }
            Ok(Ok(None)) => return Ok(Outcome::Success(FrameRead { frame: None })),
            Ok(Ok(Some(frame))) => frame,
        };

        let received_at = Utc::now();
        let incoming = classify(frame);
        let message_id = incoming
            .frame()
            .message_id()
            .map(MessageId::from)
            .unwrap_or_else(MessageId::generate);

        let mut connections = self.connections.write().await;
        let Some(entry) = connections.get_mut(connection_id) else {
            // Disconnected while we were reading.
            return Err(BindingError::connection_not_found(connection_id));
        };
        entry.last_heartbeat = Some(received_at);

        let frame = match incoming {
            IncomingFrame::Message(frame) => frame,
            IncomingFrame::Error { message, frame } => {
                tracing::warn!(connection_id = %connection_id, error = %message, "broker sent ERROR frame");
                let received = ReceivedMessage::from_frame(message_id, None, &frame, received_at);
                return Ok(Outcome::Success(FrameRead {
                    frame: Some(received),
                }));
            }
            other => {
                tracing::debug!(
                    connection_id = %connection_id,
                    command = other.frame().command.as_str(),
                    "non-message frame received"
                );
                let received =
                    ReceivedMessage::from_frame(message_id, None, other.frame(), received_at);
                return Ok(Outcome::Success(FrameRead {
                    frame: Some(received),
                }));
            }
        };

        let mut subscriptions = self.subscriptions.write().await;
        let subscription_id = frame
            .subscription()
            .map(SubscriptionId::from)
            .filter(|id| {
                subscriptions
                    .get_mut(id)
                    .filter(|sub| &sub.connection_id == connection_id)
                    .map(|sub| sub.message_count += 1)
                    .is_some()
            });

        let received =
            ReceivedMessage::from_frame(message_id.clone(), subscription_id.clone(), &frame, received_at);

        let replaced = self.pending.write().await.insert(
            (connection_id.clone(), message_id.clone()),
            PendingFrame {
                connection_id: connection_id.clone(),
                subscription_id: subscription_id.clone(),
                frame,
                received_at,
            },
        );
        if replaced.is_some() {
            tracing::debug!(
                connection_id = %connection_id,
                message_id = %message_id,
                "redelivery replaced pending frame"
            );
        }

        tracing::debug!(
            connection_id = %connection_id,
            message_id = %message_id,
            subscription_id = subscription_id.as_ref().map(|s| s.as_str()),
            "frame received"
        );

        Ok(Outcome::Success(FrameRead {
            frame: Some(received),
        }))
    }

    /// ACK a frame previously returned by `read_frame`. Single use.
    pub async fn ack(
        &self,
        message_id: &MessageId,
        connection_id: &ConnectionId,
    ) -> BindingResult<Outcome<Acknowledged>> {
        let settled = self.settle(message_id, connection_id, Settle::Ack).await?;
        Ok(match settled {
            Outcome::Success(at) => Outcome::Success(Acknowledged {
                message_id: message_id.clone(),
                acknowledged_at: at,
            }),
            Outcome::Error { message } => Outcome::Error { message },
        })
    }

    /// NACK a frame previously returned by `read_frame`. Single use.
    pub async fn nack(
        &self,
        message_id: &MessageId,
        connection_id: &ConnectionId,
    ) -> BindingResult<Outcome<Rejected>> {
        let settled = self.settle(message_id, connection_id, Settle::Nack).await?;
        Ok(match settled {
            Outcome::Success(at) => Outcome::Success(Rejected {
                message_id: message_id.clone(),
                rejected_at: at,
            }),
            Outcome::Error { message } => Outcome::Error { message },
        })
    }

    async fn settle(
        &self,
        message_id: &MessageId,
        connection_id: &ConnectionId,
        kind: Settle,
    ) -> BindingResult<Outcome<DateTime<Utc>>> {
        let (session, version) = {
            let connections = self.connections.read().await;
            let entry = connections
                .get(connection_id)
                .ok_or_else(|| BindingError::connection_not_found(connection_id))?;
            (entry.session.clone(), entry.version)
        };
        if kind == Settle::Nack && !version.supports_nack() {
            return Err(BindingError::Validation(format!(
                "NACK is not available on STOMP {version} connections"
            )));
        }

        // Claim the frame first so two concurrent settles cannot both succeed.
        let key = (connection_id.clone(), message_id.clone());
        let pending = self
            .pending
            .write()
            .await
            .remove(&key)
            .ok_or_else(|| BindingError::frame_not_found(message_id))?;

        let result = match kind {
            Settle::Ack => session.acknowledge(&pending.frame).await,
            Settle::Nack => session.reject(&pending.frame).await,
        };

        match result {
            Ok(()) => {
                match kind {
                    Settle::Ack => tracing::debug!(
                        connection_id = %connection_id,
                        message_id = %message_id,
                        "frame acknowledged"
                    ),
                    Settle::Nack => tracing::debug!(
                        connection_id = %connection_id,
                        message_id = %message_id,
                        "frame rejected"
                    ),
                }
                Ok(Outcome::Success(Utc::now()))
            }
            Err(e) => {
                tracing::warn!(
                    connection_id = %connection_id,
                    message_id = %message_id,
                    op = kind.as_str(),
                    error = %e,
                    "settle failed, frame kept pending"
                );
                // Put it back unless the connection went away meanwhile.
                let connections = self.connections.read().await;
                if connections.contains_key(connection_id) {
                    self.pending.write().await.entry(key).or_insert(pending);
                }
                Ok(e.into())
            }
        }
    }

    /// Drop pending frames older than `pending_frame_ttl_secs`.
    ///
    /// Returns the number evicted; always 0 when no TTL is configured.
    pub async fn evict_stale(&self) -> usize {
        let Some(ttl) = self.config.pending_frame_ttl_secs else {
            return 0;
        };
        let Some(cutoff) = i64::try_from(ttl)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .and_then(|ttl| Utc::now().checked_sub_signed(ttl))
        else {
            return 0;
        };

        let mut pending = self.pending.write().await;
        let before = pending.len();
        pending.retain(|_, frame| frame.received_at > cutoff);
        let evicted = before - pending.len();
        if evicted > 0 {
            tracing::info!(evicted, "evicted stale pending frames");
        }
        evicted
    }
}
