//! The `collect` module polls active sensors.
//!
//! - `tracker`: per-endpoint failure counting and suspension
//! - `puller`: the pull abstraction and its HTTP implementation
//! - `scheduler`: the tick loop that decides who to pull and publishes results

pub mod puller;
pub mod scheduler;
pub mod tracker;

pub use puller::{DataPuller, HttpPuller, PullResult};
pub use scheduler::CollectionScheduler;
pub use tracker::FailureTracker;
