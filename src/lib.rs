//! pagewatch: notifies users when the text of a watched web page changes.

pub mod diff;
pub mod error;
pub mod extract;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
