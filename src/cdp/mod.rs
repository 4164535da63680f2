//! Minimal Chrome DevTools Protocol client
//!
//! Transport (WebSocket + child process), connection/session wrappers, and
//! the hand-written types for the commands the workflow uses.

pub mod connection;
pub mod transport;
pub mod types;

pub use connection::{Connection, Session};
pub use transport::{launch_chrome, Transport};
pub use types::{KeyEventType, MouseButton, MouseEventType};
