// src/models/mod.rs

//! Domain models for the change detector.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod snapshot;
mod watch;

// Re-export all public types
pub use config::{
    Config, DetectorConfig, DiffConfig, LoggingConfig, Messages, NotifyConfig,
};
pub use snapshot::{Snapshot, SnapshotKey, SnapshotRecord};
pub use watch::{WatchList, WatchedUrl, flatten};
