//! Service layer.
//!
//! - Change detection for one watched pair (`ChangeDetector`)
//! - URL registration per user (`WatchRegistry`)

mod detector;
mod registry;

pub use detector::{ChangeDetector, CheckOutcome};
pub use registry::{AddOutcome, WatchRegistry};
