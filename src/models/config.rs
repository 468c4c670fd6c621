//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP fetching and fan-out settings
    #[serde(default)]
    pub detector: DetectorConfig,

    /// Diff rendering settings
    #[serde(default)]
    pub diff: DiffConfig,

    /// Localized notification strings
    #[serde(default)]
    pub messages: Messages,

    /// Outbound notification channel
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.detector.user_agent.trim().is_empty() {
            return Err(AppError::validation("detector.user_agent is empty"));
        }
        if self.detector.timeout_secs == Some(0) {
            return Err(AppError::validation("detector.timeout_secs must be > 0"));
        }
        if self.diff.max_chars == 0 {
            return Err(AppError::validation("diff.max_chars must be > 0"));
        }
        if !self.messages.page_changed.contains("{url}") {
            return Err(AppError::validation(
                "messages.page_changed must contain {url}",
            ));
        }
        if let Some(webhook) = &self.notify.webhook_url {
            Url::parse(webhook).map_err(|e| {
                AppError::validation(format!("notify.webhook_url is invalid: {e}"))
            })?;
        }
        Ok(())
    }
}

/// HTTP client and fan-out settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// User-Agent header for page fetches
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds; unset keeps the client default
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Maximum concurrent checks per cycle (0 = one task per pair, unbounded)
    #[serde(default)]
    pub max_concurrent: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: None,
            max_concurrent: 0,
        }
    }
}

/// Diff rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Maximum rendered diff length in characters before truncation
    #[serde(default = "defaults::max_chars")]
    pub max_chars: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            max_chars: defaults::max_chars(),
        }
    }
}

/// Localized message strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Messages {
    /// Change notice; `{url}` is replaced with the watched URL
    #[serde(default = "defaults::page_changed")]
    pub page_changed: String,

    /// Appended to a diff that was cut at `diff.max_chars`
    #[serde(default = "defaults::truncated_suffix")]
    pub truncated_suffix: String,

    /// Shown when a user lists an empty watch list
    #[serde(default = "defaults::no_urls")]
    pub no_urls: String,
}

impl Messages {
    /// Render the change notice for a URL.
    pub fn page_changed(&self, url: &str) -> String {
        self.page_changed.replace("{url}", url)
    }
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            page_changed: defaults::page_changed(),
            truncated_suffix: defaults::truncated_suffix(),
            no_urls: defaults::no_urls(),
        }
    }
}

/// Outbound notification settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotifyConfig {
    /// Push endpoint; notifications are only logged when unset
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Bearer token for the push endpoint
    #[serde(default)]
    pub webhook_token: Option<String>,
}

impl NotifyConfig {
    /// Environment variable that overrides `webhook_token`.
    pub const TOKEN_ENV: &'static str = "PAGEWATCH_WEBHOOK_TOKEN";

    /// Token from the environment, falling back to the file value.
    pub fn resolved_token(&self) -> Option<String> {
        std::env::var(Self::TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.webhook_token.clone())
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Detector defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_11_6) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/56.0.2924.87 Safari/537.36"
            .into()
    }

    // Diff defaults
    pub fn max_chars() -> usize {
        200
    }

    // Message defaults
    pub fn page_changed() -> String {
        "{url} has been updated".into()
    }
    pub fn truncated_suffix() -> String {
        "\n...(truncated)".into()
    }
    pub fn no_urls() -> String {
        "No URLs registered".into()
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.detector.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_diff_limit() {
        let mut config = Config::default();
        config.diff.max_chars = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_webhook() {
        let mut config = Config::default();
        config.notify.webhook_url = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [detector]
            max_concurrent = 8

            [messages]
            page_changed = "{url} が更新されました"
            "#,
        )
        .unwrap();

        assert_eq!(config.detector.max_concurrent, 8);
        assert_eq!(config.diff.max_chars, 200);
        assert_eq!(
            config.messages.page_changed("https://a.example"),
            "https://a.example が更新されました"
        );
        assert_eq!(config.messages.truncated_suffix, "\n...(truncated)");
        assert!(config.detector.user_agent.contains("Mozilla/5.0"));
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let config = Config::load_or_default("/definitely/not/here.toml");
        assert_eq!(config.diff.max_chars, 200);
    }
}
