// Daemon communication module
// Protocol types, configuration, and the client used by the CLI and UI bridge

pub mod config;
pub mod error;
pub mod protocol;

pub mod client;
