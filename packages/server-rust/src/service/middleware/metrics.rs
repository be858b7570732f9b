//! Metrics middleware for operations.
//!
//! Counts requests and records latency through the `metrics` facade, tagged
//! with service, handler and status code. Recording happens on a detached
//! task so the caller's return is never held up by the recorder.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use tower::{Layer, Service};

use crate::service::operation::{status_code_of, Operation, OperationError, OperationResponse};

/// Counter incremented once per call.
pub const REQUESTS_TOTAL: &str = "roster_requests_total";
/// Histogram of call latency in seconds.
pub const REQUEST_DURATION_SECONDS: &str = "roster_request_duration_seconds";

/// Records one finished call against the installed recorder.
pub fn record_request(service: &'static str, handler: &'static str, code: u16, elapsed: Duration) {
    let code = code.to_string();
    metrics::counter!(
        REQUESTS_TOTAL,
        "service" => service,
        "handler" => handler,
        "code" => code.clone()
    )
    .increment(1);
    metrics::histogram!(
        REQUEST_DURATION_SECONDS,
        "service" => service,
        "handler" => handler,
        "code" => code
    )
    .record(elapsed.as_secs_f64());
}

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

/// Tower layer that counts and times operations.
#[derive(Debug, Clone)]
pub struct MetricsLayer {
    service_name: &'static str,
}

impl MetricsLayer {
    #[must_use]
    pub fn new(service_name: &'static str) -> Self {
        Self { service_name }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            service_name: self.service_name,
        }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
    service_name: &'static str,
}

impl<S> Service<Operation> for MetricsService<S>
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
        let service = self.service_name;
        let handler = op.name();
        let fut = self.inner.call(op);

        Box::pin(async move {
            let start = Instant::now();
            let result = fut.await;
            let elapsed = start.elapsed();
            let code = status_code_of(&result);

            tokio::spawn(async move {
                record_request(service, handler, code, elapsed);
            });

            result
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
