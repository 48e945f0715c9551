//! Real-time fan-out: client connections, their registry and the broadcaster.

pub mod broadcaster;
pub mod connection;
pub mod handler;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use broadcaster::Broadcaster;
pub use connection::{Connection, ConnectionId, ConnectionState, SendError};
pub use handler::{serve_connection, websocket_handler, ConnectionSettings};
pub use registry::ConnectionRegistry;
