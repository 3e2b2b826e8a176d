//! The protocol engine and its event log.

pub mod engine;
pub mod events;

pub use engine::{Clock, IssueOutcome, Protocol};
pub use events::{EventLog, ProtocolEvent};
