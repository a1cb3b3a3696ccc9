//! The `data` module ships sensor readings to time-series storage.

pub mod forwarder;
pub mod series;

pub use forwarder::{DataForwarder, TimeSeriesSink, VmSink};
pub use series::to_time_series;
