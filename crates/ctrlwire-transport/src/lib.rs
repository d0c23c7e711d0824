//! Duplex line transport abstraction for ctrlwire
//!
//! The control-protocol engine talks to its peer through the [`Transport`]
//! trait: write whole JSON lines out, read decoded JSON values in. The engine
//! never assumes how lines are framed or how the peer is hosted.
//!
//! # Architecture
//!
//! - **Transport trait**: [`traits::Transport`], the interface the engine drives
//! - **Subprocess transport**: [`subprocess::CliTransport`], a child process over stdin/stdout

#![deny(unsafe_code)]
#![warn(missing_docs)]
//! - **Error handling**: [`error::TransportError`], shared by all implementations
//!
//! # Usage
//!
//! ```ignore
//! use ctrlwire_transport::{CliTransport, ProcessConfig, Transport};
//!
//! let transport = CliTransport::new(ProcessConfig::new("claude").with_arg("--print"));
//! transport.connect().await?;
//! transport.write("{\"type\":\"user\"}\n").await?;
//! let mut inbound = transport.read_messages()?;
//! ```

pub mod error;
pub mod subprocess;
pub mod traits;

// Re-export commonly used types
pub use error::{Result, TransportError};
pub use subprocess::{CliTransport, JsonLineDecoder, ProcessConfig};
pub use traits::{InboundStream, Transport};
