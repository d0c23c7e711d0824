//! The duplex transport abstraction
//!
//! A transport moves newline-terminated JSON lines out and decoded JSON values
//! in. How lines are framed and how the peer is hosted is up to the
//! implementation.

use crate::error::Result;
use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;

/// Inbound sequence of decoded JSON values, in arrival order
///
/// An `Err` item is fatal: implementations end the sequence after yielding it.
pub type InboundStream = Pin<Box<dyn Stream<Item = Result<Value>> + Send>>;

/// Duplex line transport
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the connection
    async fn connect(&self) -> Result<()>;

    /// Write one serialized line; `line` includes its trailing newline
    async fn write(&self, line: &str) -> Result<()>;

    /// Close the outbound direction, keeping the inbound side open
    async fn end_input(&self) -> Result<()>;

    /// Take the inbound sequence
    ///
    /// The sequence is created lazily on first call. Later calls return an
    /// error until the transport is reconnected.
    fn read_messages(&self) -> Result<InboundStream>;

    /// Whether the transport is connected and writable
    fn is_ready(&self) -> bool;

    /// Close the transport and release its resources
    async fn close(&self) -> Result<()>;
}
