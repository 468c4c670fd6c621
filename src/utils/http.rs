//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::DetectorConfig;

/// Create the client used for page fetches.
///
/// Without `timeout_secs` the client keeps reqwest's default (no timeout).
pub fn create_async_client(config: &DetectorConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(&config.user_agent);
    if let Some(secs) = config.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}
