//! STOMP broker binding: connection, subscription, pending-frame and
//! transaction bookkeeping for talking to managed devices over a broker.
//!
//! `StompBinding` owns the registries; the operations are split by concern:
//! - `connections`: connect / disconnect / stats
//! - `subscriptions`: subscribe / unsubscribe
//! - `frames`: read_frame / ack / nack
//! - `transactions`: begin / commit / abort / send
//! - `parameters`: flat parameter projection for the device data model
//! - `request`: closed `Request` enum dispatch

pub mod config;
pub mod connections;
pub mod error;
pub mod frames;
pub mod parameters;
pub mod request;
pub mod state;
pub mod subscriptions;
pub mod sweeper;
pub mod telemetry;
pub mod transactions;

pub use config::{BindingConfig, ConnectOptions};
pub use connections::{Connected, ConnectionStats, Disconnected};
pub use error::{BindingError, BindingResult, Outcome};
pub use frames::{Acknowledged, FrameRead, ReceivedMessage, Rejected};
pub use parameters::{ParameterMap, ParameterValue};
pub use request::Request;
pub use state::{ConnectionState, StompBinding};
pub use subscriptions::{SubscribeOptions, Subscribed, SubscriptionInfo, Unsubscribed};
pub use transactions::{
    SendOptions, Sent, TransactionAborted, TransactionCommitted, TransactionStarted,
};
