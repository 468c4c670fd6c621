//! AWS Lambda handler.
//!
//! Each invocation (typically a fixed schedule rule) runs one detection
//! cycle against S3 storage and answers with the cycle's counts.

use std::sync::Arc;

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::Result;
use crate::models::Config;
use crate::notify;
use crate::pipeline::{CycleReport, run_cycle};
use crate::services::ChangeDetector;
use crate::storage::s3::S3Storage;

/// Lambda invocation payload. Schedule events carry nothing we need.
#[derive(Debug, Default, Deserialize)]
pub struct DetectRequest {
    /// Override `detector.max_concurrent` for this invocation
    #[serde(default)]
    pub max_concurrent: Option<usize>,
}

/// Lambda response payload.
#[derive(Debug, Default, Serialize)]
pub struct DetectResponse {
    pub success: bool,

    #[serde(flatten)]
    pub report: CycleReport,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub execution_time_ms: u64,
}

/// Main Lambda handler function.
#[instrument(skip(event))]
pub async fn handler(
    event: LambdaEvent<DetectRequest>,
) -> std::result::Result<DetectResponse, LambdaError> {
    let start = std::time::Instant::now();
    let (request, _context) = event.into_parts();

    match run_detect(&request).await {
        Ok(report) => {
            let response = DetectResponse {
                success: true,
                report,
                error: None,
                execution_time_ms: start.elapsed().as_millis() as u64,
            };
            info!(
                "Cycle completed: {} total, {} changed, {} failed in {}ms",
                report.total, report.changed, report.failed, response.execution_time_ms
            );
            Ok(response)
        }
        Err(e) => {
            error!("Cycle failed: {}", e);
            Ok(DetectResponse {
                success: false,
                error: Some(e.to_string()),
                execution_time_ms: start.elapsed().as_millis() as u64,
                ..Default::default()
            })
        }
    }
}

async fn run_detect(request: &DetectRequest) -> Result<CycleReport> {
    let storage = Arc::new(S3Storage::from_env().await?);
    let mut config = load_lambda_config();
    if let Some(n) = request.max_concurrent {
        config.detector.max_concurrent = n;
    }
    config.validate()?;

    let sender = notify::from_config(&config.notify)?;
    let detector = ChangeDetector::from_config(&config, storage.clone(), sender)?;
    run_cycle(&detector, storage.as_ref(), config.detector.max_concurrent).await
}

/// Configuration for the Lambda environment.
///
/// `CONFIG_PATH` points at a bundled TOML file; individual settings can be
/// overridden with `MAX_CONCURRENT`, `FETCH_TIMEOUT_SECS` and `WEBHOOK_URL`.
fn load_lambda_config() -> Config {
    let mut config = match std::env::var("CONFIG_PATH") {
        Ok(path) => Config::load_or_default(path),
        Err(_) => Config::default(),
    };

    if let Ok(n) = std::env::var("MAX_CONCURRENT") {
        if let Ok(n) = n.parse() {
            config.detector.max_concurrent = n;
        }
    }

    if let Ok(secs) = std::env::var("FETCH_TIMEOUT_SECS") {
        if let Ok(secs) = secs.parse() {
            config.detector.timeout_secs = Some(secs);
        }
    }

    if let Ok(url) = std::env::var("WEBHOOK_URL") {
        config.notify.webhook_url = Some(url);
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_request_defaults() {
        let req: DetectRequest = serde_json::from_str("{}").unwrap();
        assert!(req.max_concurrent.is_none());
    }

    #[test]
    fn test_schedule_event_is_accepted() {
        let event = r#"{"version":"0","source":"aws.events","detail-type":"Scheduled Event","detail":{}}"#;
        let req: DetectRequest = serde_json::from_str(event).unwrap();
        assert!(req.max_concurrent.is_none());
    }

    #[test]
    fn test_response_flattens_report() {
        let response = DetectResponse {
            success: true,
            report: CycleReport {
                total: 3,
                changed: 1,
                ..Default::default()
            },
            ..Default::default()
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["total"], 3);
        assert_eq!(json["changed"], 1);
        assert!(json.get("error").is_none());
    }
}
