//! # Structured Logging Module
//!
//! Environment-aware structured logging for the scheduling loop, the work
//! orchestrator and the dead-letter path.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
///
/// `RUST_LOG` wins over the environment default. Set `VENTURE_LOG_FORMAT=json`
/// for machine-readable output.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));
        let json = std::env::var("VENTURE_LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let layer = if json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed()
        };

        // Use try_init to avoid panic if global subscriber already set
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            json = json,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("VENTURE_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "test" => "debug".to_string(),
        "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for dispatch admission decisions
pub fn log_dispatch_operation(
    operation: &str,
    request_id: &str,
    work_item_id: &str,
    trigger_class: &str,
    active_count: usize,
    pending_count: usize,
) {
    tracing::info!(
        operation = %operation,
        request_id = %request_id,
        work_item_id = %work_item_id,
        trigger_class = %trigger_class,
        active_count = active_count,
        pending_count = pending_count,
        timestamp = %Utc::now().to_rfc3339(),
        "📋 DISPATCH_OPERATION"
    );
}

/// Log structured data for dead-letter creation, update and replay
pub fn log_dead_letter_operation(
    operation: &str,
    entry_id: &str,
    attempt_count: u32,
    failure_reason: &str,
    details: Option<&str>,
) {
    tracing::warn!(
        operation = %operation,
        entry_id = %entry_id,
        attempt_count = attempt_count,
        failure_reason = %failure_reason,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "💀 DEAD_LETTER_OPERATION"
    );
}

/// Log the outcome of one scheduler cycle
pub fn log_scheduler_cycle(
    circuit_state: &str,
    fetched: usize,
    activated: usize,
    queued: usize,
    duration_ms: u64,
) {
    tracing::info!(
        circuit_state = %circuit_state,
        fetched = fetched,
        activated = activated,
        queued = queued,
        duration_ms = duration_ms,
        timestamp = %Utc::now().to_rfc3339(),
        "⏱️ SCHEDULER_CYCLE"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}
