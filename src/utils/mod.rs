//! The `utils` module provides the pieces shared by every other module:
//! the crate-wide error type and logging initialization.

pub mod error;
pub mod logging;

pub use error::{HubError, Result};
