// Context Resurrection client core for the Right Now session daemon

// Snapshot schema, card trigger, and card projection
pub mod context_resurrection;

// Daemon protocol, transport, and configuration
pub mod daemon;

// Logging setup shared by binaries
pub mod logging;

pub use daemon::client::{CrClient, Transport};
pub use daemon::error::CrError;
