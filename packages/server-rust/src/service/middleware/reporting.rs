//! Error-reporting middleware.
//!
//! Forwards failed calls to an [`ErrorReporter`], tagged with the operation
//! name and status code. Caller mistakes (`ValidationFailed`) are not faults
//! and are never reported.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use roster_core::Field;
use tower::{Layer, Service};

use crate::report::{ErrorReport, ErrorReporter};
use crate::service::operation::{ErrorKind, Operation, OperationError, OperationResponse};

#[derive(Clone)]
pub struct ErrorReportingLayer {
    reporter: Arc<dyn ErrorReporter>,
}

impl ErrorReportingLayer {
    #[must_use]
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { reporter }
    }
}

impl<S> Layer<S> for ErrorReportingLayer {
    type Service = ErrorReportingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ErrorReportingService {
            inner,
            reporter: Arc::clone(&self.reporter),
        }
    }
}

#[derive(Clone)]
pub struct ErrorReportingService<S> {
    inner: S,
    reporter: Arc<dyn ErrorReporter>,
}

fn build_report(operation: &'static str, err: &OperationError, request: Vec<Field>) -> ErrorReport {
    ErrorReport::new(err.to_string())
        .tag("operation", operation)
        .tag("code", err.status_code().to_string())
        .extra("request", request)
        // A failed call carries no response payload.
        .extra("response", Vec::new())
}

impl<S> Service<Operation> for ErrorReportingService<S>
where
    S: Service<Operation, Response = OperationResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let operation = op.name();
        let request = op.request().report_extras();
        let reporter = Arc::clone(&self.reporter);
        let fut = self.inner.call(op);

        Box::pin(async move {
            let result = fut.await;
            if let Err(err) = &result {
                if err.kind() != ErrorKind::ValidationFailed {
                    reporter.capture(build_report(operation, err, request));
                }
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use tower::ServiceExt;

    use super::*;
    use crate::report::testing::CapturingReporter;
    use crate::service::middleware::testing::{delete_op, Outcome, StubService};

    fn layered(outcome: Outcome) -> (Arc<CapturingReporter>, ErrorReportingService<StubService>) {
        let reporter = Arc::new(CapturingReporter::default());
        let svc = ErrorReportingLayer::new(reporter.clone()).layer(StubService::new(outcome));
        (reporter, svc)
    }

    #[tokio::test]
    async fn success_is_not_reported() {
        let (reporter, svc) = layered(Outcome::Ok);
        svc.oneshot(delete_op("u1")).await.unwrap();
        assert!(reporter.reports().is_empty());
    }

    #[tokio::test]
    async fn validation_failure_is_not_reported() {
        let (reporter, svc) = layered(Outcome::Invalid);
        let err = svc.oneshot(delete_op("")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert!(reporter.reports().is_empty());
    }

    #[tokio::test]
    async fn unavailable_is_reported_with_tags_and_extras() {
        let (reporter, svc) = layered(Outcome::Unavailable);
        let err = svc.oneshot(delete_op("u1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);

        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.tag_value("operation"), Some("DeleteUser"));
        assert_eq!(report.tag_value("code"), Some("503"));
        assert_eq!(report.extras[0], ("request", vec![("id", "u1".to_string())]));
        assert_eq!(report.message, "DeleteUser: store unreachable");
    }

    #[tokio::test]
    async fn not_found_is_reported_as_404() {
        let (reporter, svc) = layered(Outcome::NotFound);
        assert!(svc.oneshot(delete_op("u1")).await.is_err());
        assert_eq!(reporter.reports()[0].tag_value("code"), Some("404"));
    }
}
