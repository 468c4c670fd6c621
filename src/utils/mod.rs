//! Utility functions and helpers.

pub mod http;

use url::Url;

use crate::error::{AppError, Result};

/// Parse user input as a watchable URL.
///
/// Surrounding whitespace is ignored; the result must be absolute with both
/// a scheme and a host.
pub fn parse_watch_url(text: &str) -> Result<Url> {
    let url = Url::parse(text.trim())?;
    if url.cannot_be_a_base() || !url.has_host() {
        return Err(AppError::validation(format!("{} has no host", text.trim())));
    }
    Ok(url)
}
