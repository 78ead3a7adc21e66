//! Data models
//!
//! Records owned by the achievement engine and handed to the query layer.

pub mod achievement;
pub mod event_log;
pub mod user;

// Re-exports
pub use achievement::*;
pub use event_log::*;
pub use user::*;
