//! Snapshot acquisition and storage
//!
//! Handles:
//! - The `SnapshotSource` seam and a JSON file source
//! - Local snapshot caching with explicit staleness bounds

pub mod cache;
pub mod source;

pub use cache::*;
pub use source::*;
