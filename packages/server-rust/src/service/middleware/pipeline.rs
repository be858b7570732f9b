//! Pipeline composition: wraps the user service in the enabled middleware.

use std::sync::Arc;

use tower::util::BoxCloneSyncService;
use tower::{Service, ServiceBuilder};

use super::logging::LoggingLayer;
use super::metrics::MetricsLayer;
use super::reporting::ErrorReportingLayer;
use super::trace::TracingLayer;
use crate::report::ErrorReporter;
use crate::service::config::ServiceConfig;
use crate::service::operation::{Operation, OperationError, OperationResponse};

/// Type-erased, cloneable pipeline handed to transports.
pub type PipelineService = BoxCloneSyncService<Operation, OperationResponse, OperationError>;

/// Build the operation pipeline around `core`.
///
/// Layer order (outermost to innermost):
/// 1. `MetricsLayer` -- latency includes every inner layer
/// 2. `LoggingLayer` -- one event per call with the same timing scope
/// 3. `TracingLayer` -- the span encloses error reporting and the core
/// 4. `ErrorReportingLayer` -- sees the core's error first-hand
///
/// Each layer is skipped when its toggle in `config` is off. The order of
/// the remaining layers never changes.
#[must_use]
pub fn build_operation_pipeline<S>(
    core: S,
    config: &ServiceConfig,
    reporter: Arc<dyn ErrorReporter>,
) -> PipelineService
where
    S: Service<Operation, Response = OperationResponse, Error = OperationError>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
{
    let stack = ServiceBuilder::new()
        .option_layer(
            config
                .metrics_enabled
                .then(|| MetricsLayer::new(config.service_name)),
        )
        .option_layer(config.logging_enabled.then_some(LoggingLayer))
        .option_layer(config.tracing_enabled.then_some(TracingLayer))
        .option_layer(
            config
                .error_reporting_enabled
                .then(|| ErrorReportingLayer::new(reporter)),
        )
        .service(core);

    BoxCloneSyncService::new(stack)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
