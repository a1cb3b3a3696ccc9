pub mod engine;
pub mod listener;
pub mod message;
pub mod topic;

pub use engine::{Hub, HubRunner};
pub use listener::{Listener, ListenerId, ListenerRegistry, listener_fn};
pub use message::Message;

#[cfg(test)]
mod tests;
