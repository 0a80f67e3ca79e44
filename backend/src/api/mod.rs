//! HTTP API module.
//!
//! Serves the board tools and resources over REST, with tool activity
//! streamed as Server-Sent Events.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{router, start_server, AppState};
pub use types::*;
