//! Transaction coordinator and transactional publishing.
//!
//! `begin_transaction` records which connection owns the new id, so commit
//! and abort route straight to that connection instead of probing every
//! open session.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stomp_protocol::{ConnectionId, TransactionId, headers};

use crate::error::{BindingError, BindingResult, Outcome};
use crate::state::StompBinding;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStarted {
    pub transaction_id: TransactionId,
    pub connection_id: ConnectionId,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCommitted {
    pub transaction_id: TransactionId,
    pub committed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionAborted {
    pub transaction_id: TransactionId,
    pub aborted_at: DateTime<Utc>,
}

/// Optional SEND settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOptions {
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub content_type: Option<String>,
    /// Publish inside this transaction; it must be open on the same connection.
    #[serde(default)]
    pub transaction_id: Option<TransactionId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sent {
    pub destination: String,
    pub sent_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<TransactionId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finish {
    Commit,
    Abort,
}

impl StompBinding {
    /// Start a broker transaction on a live connection.
    pub async fn begin_transaction(
        &self,
        connection_id: &ConnectionId,
    ) -> BindingResult<Outcome<TransactionStarted>> {
        let session = self.session_for(connection_id).await?;
        let id = TransactionId::generate();

        if let Err(e) = session.begin(&id).await {
            tracing::warn!(connection_id = %connection_id, error = %e, "begin failed");
            return Ok(e.into());
        }

        {
            let connections = self.connections.read().await;
            if !connections.contains_key(connection_id) {
                return Err(BindingError::connection_not_found(connection_id));
            }
            self.transactions
                .write()
                .await
                .insert(id.clone(), connection_id.clone());
        }

        tracing::info!(connection_id = %connection_id, transaction_id = %id, "transaction begun");

        Ok(Outcome::Success(TransactionStarted {
            transaction_id: id,
            connection_id: connection_id.clone(),
            started_at: Utc::now(),
        }))
    }

    /// Commit on whichever connection began the transaction.
    pub async fn commit_transaction(
        &self,
        id: &TransactionId,
    ) -> BindingResult<Outcome<TransactionCommitted>> {
        Ok(match self.finish(id, Finish::Commit).await? {
            Outcome::Success(at) => Outcome::Success(TransactionCommitted {
                transaction_id: id.clone(),
                committed_at: at,
            }),
            Outcome::Error { message } => Outcome::Error { message },
        })
    }

    /// Abort on whichever connection began the transaction.
    pub async fn abort_transaction(
        &self,
        id: &TransactionId,
    ) -> BindingResult<Outcome<TransactionAborted>> {
        Ok(match self.finish(id, Finish::Abort).await? {
            Outcome::Success(at) => Outcome::Success(TransactionAborted {
                transaction_id: id.clone(),
                aborted_at: at,
            }),
            Outcome::Error { message } => Outcome::Error { message },
        })
    }

    /// Connection owning an open transaction.
    pub async fn transaction_owner(&self, id: &TransactionId) -> Option<ConnectionId> {
        self.transactions.read().await.get(id).cloned()
    }

    async fn finish(
        &self,
        id: &TransactionId,
        kind: Finish,
    ) -> BindingResult<Outcome<DateTime<Utc>>> {
        let owner = self
            .transaction_owner(id)
            .await
            .ok_or_else(|| BindingError::transaction_not_found(id))?;
        let session = self
            .session_for(&owner)
            .await
            .map_err(|_| BindingError::transaction_not_found(id))?;

        let result = match kind {
            Finish::Commit => session.commit(id).await,
            Finish::Abort => session.abort(id).await,
        };
        if let Err(e) = result {
            // Still open: the caller may retry or abort.
            tracing::warn!(
                connection_id = %owner,
                transaction_id = %id,
                error = %e,
                "transaction {} failed",
                if kind == Finish::Commit { "commit" } else { "abort" }
            );
            return Ok(e.into());
        }

        if self.transactions.write().await.remove(id).is_none() {
            // A concurrent commit/abort finished it first.
            return Err(BindingError::transaction_not_found(id));
        }

        match kind {
            Finish::Commit => {
                tracing::info!(connection_id = %owner, transaction_id = %id, "transaction committed")
            }
            Finish::Abort => {
                tracing::info!(connection_id = %owner, transaction_id = %id, "transaction aborted")
            }
        }
        Ok(Outcome::Success(Utc::now()))
    }

    /// Publish `body` to `destination` on a live connection.
    pub async fn send(
        &self,
        connection_id: &ConnectionId,
        destination: &str,
        body: &[u8],
        options: SendOptions,
    ) -> BindingResult<Outcome<Sent>> {
        if destination.trim().is_empty() {
            return Err(BindingError::Validation(
                "destination must not be empty".into(),
            ));
        }
        let session = self.session_for(connection_id).await?;

        if let Some(tx) = &options.transaction_id {
            let owner = self.transaction_owner(tx).await;
            if owner.as_ref() != Some(connection_id) {
                return Err(BindingError::transaction_not_found(tx));
            }
        }

        let mut frame_headers: Vec<(String, String)> = options.headers.into_iter().collect();
        if let Some(content_type) = options.content_type {
            frame_headers.push((headers::CONTENT_TYPE.to_string(), content_type));
        }
        if let Some(tx) = &options.transaction_id {
            frame_headers.push((headers::TRANSACTION.to_string(), tx.to_string()));
        }

        if let Err(e) = session.publish(destination, body, &frame_headers).await {
            tracing::warn!(connection_id = %connection_id, destination, error = %e, "send failed");
            return Ok(e.into());
        }

        tracing::debug!(
            connection_id = %connection_id,
            destination,
            bytes = body.len(),
            "frame sent"
        );

        Ok(Outcome::Success(Sent {
            destination: destination.to_string(),
            sent_at: Utc::now(),
            transaction_id: options.transaction_id,
        }))
    }
}
