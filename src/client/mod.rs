//! The `client` module defines the broker-side view of a connected peer.
//!
//! A `Client` is shared between its transport adapter, which drains the
//! outbound queue and feeds inbound frames, and the hub, which indexes it
//! and pushes matching messages. `Permissions` decide what it may read
//! and write, scope by scope.

pub mod permission;
pub mod pubsub_client;

pub use permission::{Permission, Permissions};
pub use pubsub_client::{Client, OutboundReceiver};

#[cfg(test)]
mod tests;
