//! Event log - durable, deduplicated, ingest-ordered webhook events

pub mod fingerprint;
pub mod import;
mod log;

pub use fingerprint::fingerprint;
pub use import::{ImportReport, import_directory};
pub use self::log::EventLog;
