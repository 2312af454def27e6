//! STOMP header names used by the binding.

pub const ACCEPT_VERSION: &str = "accept-version";
pub const ACK: &str = "ack";
pub const CONTENT_TYPE: &str = "content-type";
pub const DESTINATION: &str = "destination";
pub const HEART_BEAT: &str = "heart-beat";
pub const HOST: &str = "host";
pub const ID: &str = "id";
pub const MESSAGE: &str = "message";
pub const MESSAGE_ID: &str = "message-id";
pub const RECEIPT_ID: &str = "receipt-id";
pub const SELECTOR: &str = "selector";
pub const SERVER: &str = "server";
pub const SESSION: &str = "session";
pub const SUBSCRIPTION: &str = "subscription";
pub const TRANSACTION: &str = "transaction";
pub const VERSION: &str = "version";
