//! WebSocket module
//!
//! `GET /ws`: each connection runs a sequential read, complete, write loop.

pub mod connection;
pub mod registry;

pub use connection::{handle_socket, ws_handler, ConnectionState, ERROR_REPLY};
pub use registry::{SessionGuard, SessionHandle, SessionId, SessionInfo, SessionRegistry};
