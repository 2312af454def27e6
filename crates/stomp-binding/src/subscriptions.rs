//! Subscription registry operations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stomp_protocol::{AckMode, ConnectionId, SubscriptionId};
use stomp_transport::SubscribeRequest;

use crate::error::{BindingError, BindingResult, Outcome};
use crate::state::{StompBinding, SubscriptionEntry};

/// Optional SUBSCRIBE settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeOptions {
    /// Caller-chosen subscription id; generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub ack_mode: AckMode,
    #[serde(default)]
    pub selector: Option<String>,
    /// Extra protocol headers forwarded verbatim.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl SubscribeOptions {
    pub fn with_ack_mode(ack_mode: AckMode) -> Self {
        Self {
            ack_mode,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscribed {
    pub subscription_id: SubscriptionId,
    pub destination: String,
    pub ack_mode: AckMode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Unsubscribed {
    pub subscription_id: SubscriptionId,
    /// Deliveries counted before removal.
    pub message_count: u64,
    /// Set when the broker-side UNSUBSCRIBE failed; the broker may still
    /// deliver on this subscription.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_error: Option<String>,
}

/// Read-only view of a subscription.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    pub subscription_id: SubscriptionId,
    pub connection_id: ConnectionId,
    pub destination: String,
    pub ack_mode: AckMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    pub created_at: DateTime<Utc>,
    pub message_count: u64,
}

impl From<&SubscriptionEntry> for SubscriptionInfo {
    fn from(entry: &SubscriptionEntry) -> Self {
        Self {
            subscription_id: entry.id.clone(),
            connection_id: entry.connection_id.clone(),
            destination: entry.destination.clone(),
            ack_mode: entry.ack_mode,
            selector: entry.selector.clone(),
            created_at: entry.created_at,
            message_count: entry.message_count,
        }
    }
}

impl StompBinding {
    /// Subscribe a live connection to `destination`.
    pub async fn subscribe(
        &self,
        connection_id: &ConnectionId,
        destination: &str,
        options: SubscribeOptions,
    ) -> BindingResult<Outcome<Subscribed>> {
        if destination.trim().is_empty() {
            return Err(BindingError::Validation(
                "destination must not be empty".into(),
            ));
        }
        let session = self.session_for(connection_id).await?;

        let id = options
            .id
            .map(SubscriptionId::from)
            .unwrap_or_else(SubscriptionId::generate);
        if self.subscriptions.read().await.contains_key(&id) {
            return Err(BindingError::Validation(format!(
                "subscription id already in use: {id}"
            )));
        }

        let request = SubscribeRequest {
            destination: destination.to_string(),
            id: id.to_string(),
            ack: options.ack_mode,
            selector: options.selector.clone(),
            headers: options.headers.into_iter().collect(),
        };
        if let Err(e) = session.subscribe(&request).await {
            tracing::warn!(
                connection_id = %connection_id,
                destination,
                error = %e,
                "subscribe failed"
            );
            return Ok(e.into());
        }

        {
            let connections = self.connections.read().await;
            let mut subscriptions = self.subscriptions.write().await;
            // The connection may have been closed while the broker answered.
            if !connections.contains_key(connection_id) {
                return Err(BindingError::connection_not_found(connection_id));
            }
            if subscriptions.contains_key(&id) {
                return Err(BindingError::Validation(format!(
                    "subscription id already in use: {id}"
                )));
            }
            subscriptions.insert(
                id.clone(),
                SubscriptionEntry {
                    id: id.clone(),
                    connection_id: connection_id.clone(),
                    destination: destination.to_string(),
                    ack_mode: options.ack_mode,
                    selector: options.selector,
                    created_at: Utc::now(),
                    message_count: 0,
                },
            );
        }

        tracing::info!(
            connection_id = %connection_id,
            subscription_id = %id,
            destination,
            ack_mode = options.ack_mode.as_str(),
            "subscription created"
        );

        Ok(Outcome::Success(Subscribed {
            subscription_id: id,
            destination: destination.to_string(),
            ack_mode: options.ack_mode,
        }))
    }

    /// Remove a subscription.
    ///
    /// The broker is told on a best-effort basis; the local entry is removed
    /// regardless and a broker failure is surfaced through `remote_error`.
    pub async fn unsubscribe(&self, id: &SubscriptionId) -> BindingResult<Outcome<Unsubscribed>> {
        let entry = self
            .subscriptions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| BindingError::subscription_not_found(id))?;

        let remote_error = match self.session_for(&entry.connection_id).await {
            Ok(session) => match session.unsubscribe(&entry.destination, id.as_str()).await {
                Ok(()) => None,
                Err(e) => {
                    tracing::warn!(
                        subscription_id = %id,
                        error = %e,
                        "broker unsubscribe failed, removing local subscription anyway"
                    );
                    Some(e.to_string())
                }
            },
            Err(e) => Some(e.to_string()),
        };

        // A concurrent unsubscribe or disconnect may have removed it meanwhile.
        let message_count = self
            .subscriptions
            .write()
            .await
            .remove(id)
            .map(|sub| sub.message_count)
            .ok_or_else(|| BindingError::subscription_not_found(id))?;

        tracing::info!(
            subscription_id = %id,
            connection_id = %entry.connection_id,
            message_count,
            "subscription removed"
        );

        Ok(Outcome::Success(Unsubscribed {
            subscription_id: id.clone(),
            message_count,
            remote_error,
        }))
    }

    pub async fn get_subscription(&self, id: &SubscriptionId) -> BindingResult<SubscriptionInfo> {
        self.subscriptions
            .read()
            .await
            .get(id)
            .map(SubscriptionInfo::from)
            .ok_or_else(|| BindingError::subscription_not_found(id))
    }

    /// Subscriptions bound to one connection, oldest first.
    pub async fn list_subscriptions(&self, connection_id: &ConnectionId) -> Vec<SubscriptionInfo> {
        let mut out: Vec<SubscriptionInfo> = self
            .subscriptions
            .read()
            .await
            .values()
            .filter(|sub| &sub.connection_id == connection_id)
            .map(SubscriptionInfo::from)
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        out
    }
}
