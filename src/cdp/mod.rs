//! Chrome DevTools Protocol
//!
//! Just enough CDP to drive one tab: a WebSocket transport, a connection
//! with target management, and per-target sessions.

pub mod connection;
pub mod transport;
pub mod types;

pub use connection::{Connection, Session};
pub use transport::Transport;
pub use types::{RemoteObject, RuntimeEvaluateResult};
