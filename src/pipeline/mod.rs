//! Pipeline entry points.
//!
//! - `run_cycle`: fan out one check per watched pair and collect a report
//! - `run_detection`: build the detector from config and run one cycle

pub mod cycle;

pub use cycle::{CycleReport, run_cycle, run_detection};
