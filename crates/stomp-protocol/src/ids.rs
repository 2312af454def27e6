//! Opaque identifiers issued by the binding.
//!
//! Connection and transaction ids are always generated locally. Subscription
//! ids may be chosen by the caller, and message ids usually come from the
//! broker's `message-id` header.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identity of a registered broker connection.
    ConnectionId
);
string_id!(
    /// Identity of a subscription (caller-suppliable).
    SubscriptionId
);
string_id!(
    /// Identity of a delivered frame awaiting ack/nack.
    MessageId
);
string_id!(
    /// Identity of a broker-side transaction.
    TransactionId
);

impl ConnectionId {
    /// Time-ordered id, unique per process.
    pub fn generate() -> Self {
        Self(format!("conn-{}", Uuid::now_v7()))
    }
}

impl SubscriptionId {
    pub fn generate() -> Self {
        Self(format!("sub-{}", Uuid::now_v7()))
    }
}

impl MessageId {
    pub fn generate() -> Self {
        Self(format!("msg-{}", Uuid::now_v7()))
    }
}

impl TransactionId {
    /// Fully random (v4) so ids cannot collide across connections.
    pub fn generate() -> Self {
        Self(format!("tx-{}", Uuid::new_v4()))
    }
}

/// Session id used when the broker's CONNECTED frame carries none.
pub fn local_session_id() -> String {
    format!("local-{}", Uuid::now_v7())
}
