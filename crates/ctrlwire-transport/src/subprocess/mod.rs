//! Subprocess transport
//!
//! Spawns the peer as a child process and exchanges newline-delimited JSON
//! over its stdin/stdout.

pub mod cli;
pub mod framing;
pub mod process;

pub use cli::CliTransport;
pub use framing::JsonLineDecoder;
pub use process::ProcessConfig;
