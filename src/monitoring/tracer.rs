/*!
 * Structured Tracing
 * Subscriber setup and timed spans for toolkit workloads
 *
 * Features:
 * - Run IDs for correlating every event of one workload
 * - JSON-formatted logs for structured parsing
 * - Slow-workload warnings with durations embedded in the span
 */

use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Workloads slower than this are reported at warn level
const SLOW_WORKLOAD_MS: u128 = 1_000;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - SYNC_TRACE_JSON: Enable JSON output (default: false)
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("SYNC_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .init();
        info!("Structured tracing initialized with JSON output");
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .init();
        info!("Structured tracing initialized");
    }
}

/// Generate a unique run ID for correlating events
pub fn generate_run_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Timed span around one workload, reported when dropped
pub struct WorkloadSpan {
    span: tracing::Span,
    start: Instant,
    workload: &'static str,
    run_id: String,
}

impl WorkloadSpan {
    pub fn new(workload: &'static str, threads: usize) -> Self {
        let run_id = generate_run_id();

        let span = span!(
            Level::INFO,
            "workload",
            run_id = %run_id,
            workload = workload,
            threads = threads,
            operations = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
        );

        span.in_scope(|| debug!(workload, threads, "workload started"));

        Self {
            span,
            start: Instant::now(),
            workload,
            run_id,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Record how many operations the workload completed
    pub fn record_operations(&self, count: u64) {
        self.span.record("operations", count);
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for WorkloadSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.span.record("duration_ms", duration.as_millis() as u64);
        let _entered = self.span.enter();

        if duration.as_millis() > SLOW_WORKLOAD_MS {
            warn!(
                run_id = %self.run_id,
                workload = self.workload,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow workload"
            );
        } else {
            debug!(
                run_id = %self.run_id,
                workload = self.workload,
                duration_us = duration.as_micros() as u64,
                "workload completed"
            );
        }
    }
}

/// Helper to create a workload span
#[inline]
pub fn span_workload(workload: &'static str, threads: usize) -> WorkloadSpan {
    WorkloadSpan::new(workload, threads)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_ids_are_unique() {
        let a = generate_run_id();
        let b = generate_run_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_workload_span_without_subscriber() {
        let span = span_workload("test", 2);
        span.record_operations(10);
        assert_eq!(span.run_id().len(), 32);
    }
}
