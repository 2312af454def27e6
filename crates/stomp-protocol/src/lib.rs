pub mod address;
pub mod frame;
pub mod headers;
pub mod ids;
pub mod version;

pub use address::*;
pub use frame::*;
pub use ids::*;
pub use version::*;
