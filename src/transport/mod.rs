//! The `transport` module connects websocket peers to the hub.
//!
//! `message` defines the inbound frame protocol; `websocket` runs the
//! server, one reader loop and one writer task per connection.

pub mod message;
pub mod websocket;

pub use message::{ControlMessage, InboundFrame, error_reply};
pub use websocket::{CLIENT_ID_HEADER, handle_text, serve, start_websocket_server};
