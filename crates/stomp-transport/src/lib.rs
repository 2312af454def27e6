//! Broker transport client boundary for the STOMP binding.
//!
//! The binding never touches sockets or frame encoding itself. It talks to
//! a broker through two traits defined here:
//! - `Connector` opens a session to a broker endpoint
//! - `StompSession` performs the per-connection wire operations
//!
//! `MockConnector` / `MockSession` implement both in memory for tests, and
//! `IncomingFrame` classifies what a session read hands back.

pub mod error;
pub mod handler;
pub mod mock;
pub mod session;

// Re-exports for convenience.
pub use error::{TransportError, TransportResult};
pub use handler::{IncomingFrame, classify};
pub use mock::{FailPoint, MockConnector, MockSession, SessionCall};
pub use session::{
    Connector, OpenRequest, OpenedSession, SessionInfo, StompSession, SubscribeRequest,
};
