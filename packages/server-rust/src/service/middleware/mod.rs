//! Tower middleware layers for the operation pipeline.
//!
//! - [`metrics`]: request counter and latency histogram
//! - [`logging`]: one structured event per call
//! - [`trace`]: one span per call, named after the operation
//! - [`reporting`]: error capture through an [`ErrorReporter`](crate::report::ErrorReporter)
//! - [`pipeline`]: composes the enabled layers around the user service
//!
//! Every layer passes the operation through untouched and returns the inner
//! result verbatim.

pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod reporting;
pub mod trace;

pub use logging::LoggingLayer;
pub use metrics::MetricsLayer;
pub use pipeline::{build_operation_pipeline, PipelineService};
pub use reporting::ErrorReportingLayer;
pub use trace::TracingLayer;
