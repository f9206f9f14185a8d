//! # Structured Logging Module
//!
//! Environment-aware structured logging for embedding hosts and tests.

use crate::config::LoggingConfig;
use crate::models::CaseId;
use crate::state_machine::Stage;
use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = config
            .level
            .clone()
            .unwrap_or_else(|| get_log_level(&environment).to_string());

        let result = if config.json {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true)
                        .with_filter(EnvFilter::new(log_level.clone())),
                )
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_level(true)
                        .with_filter(EnvFilter::new(log_level.clone())),
                )
                .try_init()
        };

        // A host may already own the global subscriber
        if result.is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            environment = %environment,
            level = %log_level,
            json = config.json,
            "Structured logging initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("CASETRACK_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log structured data for a case mutation
pub fn log_case_operation(
    operation: &str,
    case_id: &CaseId,
    stage: Option<Stage>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        case_id = %case_id,
        stage = stage.map(|s| s.as_str()),
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "CASE_OPERATION"
    );
}
