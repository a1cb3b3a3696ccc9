//! The `persistence` module keeps alert records on disk.
//!
//! It uses `sled` as an embedded key-value store. Records live in one tree
//! keyed by creation time, so a scan returns them oldest first and a time
//! filter can start its scan at the lower bound.

pub mod sled_records;

pub use sled_records::SledRecordStore;

#[cfg(test)]
mod tests;
