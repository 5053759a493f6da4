/*!
 * Monitoring
 * Structured logging setup and workload tracing
 */

mod tracer;

pub use tracer::{generate_run_id, init_tracing, span_workload, WorkloadSpan};
