//! Context Resurrection module
//!
//! Snapshot schema plus the client-side decision and projection layers that
//! turn a daemon lookup into a resurrection card. Nothing here performs I/O.

pub mod card;
pub mod models;
pub mod trigger;

// Re-export key types
pub use card::{tail_to_excerpt, CardDisplayData, CardTerminal};
pub use models::{CaptureReason, ContextSnapshotV1, SnapshotId, TerminalContext};
pub use trigger::{should_show_card, TriggerConfig};
