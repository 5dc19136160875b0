/*!
 * Structured Tracing
 * Subscriber setup and per-call spans using the tracing crate
 *
 * Features:
 * - EnvFilter driven verbosity (RUST_LOG)
 * - JSON-formatted logs for structured parsing
 * - One span per OS call with duration and outcome
 */

use std::time::Instant;
use tracing::{debug, info, span, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Environment variable switching the subscriber to JSON output
pub const TRACE_JSON_ENV: &str = "POSIX_SYSTEM_TRACE_JSON";

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - POSIX_SYSTEM_TRACE_JSON: Enable JSON output (default: false)
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(TRACE_JSON_ENV)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "Structured tracing initialized");
    }
    installed
}

/// Span around a single OS call
///
/// Records the call name and its target on creation, the outcome while
/// running, and the elapsed time when dropped.
pub struct OsCallSpan {
    span: tracing::Span,
    start: Instant,
    call: &'static str,
}

impl OsCallSpan {
    pub fn new(call: &'static str, target: &str) -> Self {
        let span = span!(
            Level::DEBUG,
            "os_call",
            call = call,
            target = target,
            duration_us = tracing::field::Empty,
            result = tracing::field::Empty,
            error = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            call,
        }
    }

    /// Record an error
    fn record_error(&self, error: &dyn std::fmt::Display) {
        self.span.record("error", tracing::field::display(error));
        self.span.record("result", "error");
    }

    /// Record the outcome of a `Result` and hand it back unchanged
    pub fn finish<T, E: std::fmt::Display>(self, result: Result<T, E>) -> Result<T, E> {
        match &result {
            Ok(_) => {
                self.span.record("result", "success");
            }
            Err(e) => self.record_error(e),
        }
        result
    }
}

impl Drop for OsCallSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        self.span.record("duration_us", duration.as_micros() as u64);
        debug!(
            call = self.call,
            duration_us = duration.as_micros() as u64,
            "os call completed"
        );
    }
}
