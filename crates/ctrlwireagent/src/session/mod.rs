//! Agent session over the control protocol
//!
//! # Module Organization
//!
//! - [`state`] - Session state
//! - [`core`] - The AgentSession struct, the initialize handshake, and message I/O
//! - [`control`] - Runtime control (interrupt, model and permission mode changes)
//!
//! # Examples
//!
//! ```no_run
//! # use ctrlwireagent::{AgentSession, SessionConfig};
//! # use ctrlwire_transport::ProcessConfig;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = AgentSession::spawn(ProcessConfig::default(), SessionConfig::new()).await?;
//!
//! session.send_user_message("What is 2+2?").await?;
//! for message in session.receive_response().await? {
//!     println!("{}", message.type_name());
//! }
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod control;
pub mod core;
pub mod state;

// Re-export public types
pub use self::core::AgentSession;
pub use self::state::SessionState;
