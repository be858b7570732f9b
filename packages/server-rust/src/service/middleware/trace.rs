//! Tracing middleware: one span per call, named after the operation.
//!
//! Traceable request fields are recorded when the span opens, response
//! fields and the status code when the call returns. The span closes on
//! every outcome, failures included.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use roster_core::FieldList;
use tower::{Layer, Service};
use tracing::field::Empty;
use tracing::{info_span, Instrument, Span};

use crate::service::operation::{
    operation_names, status_code_of, Operation, OperationError, OperationResponse,
};

/// Opens the span for `op`. Span names must be static, hence one arm per
/// operation.
fn operation_span(op: &Operation) -> Span {
    macro_rules! span_for {
        ($name:expr) => {
            info_span!(
                $name,
                call_id = op.ctx().call_id,
                protocol = op.ctx().protocol.as_str(),
                request = %FieldList(&op.request().trace_fields()),
                response = Empty,
                code = Empty,
                otel.status_code = Empty,
                error = Empty,
            )
        };
    }

    match op {
        Operation::CreateUser { .. } => span_for!(operation_names::CREATE_USER),
        Operation::GetUsers { .. } => span_for!(operation_names::GET_USERS),
        Operation::UpdateUser { .. } => span_for!(operation_names::UPDATE_USER),
        Operation::DeleteUser { .. } => span_for!(operation_names::DELETE_USER),
    }
}

#[derive(Debug, Clone, Default)]
pub struct TracingLayer;

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct TracingService<S> {
    inner: S,
}

impl<S> Service<Operation> for TracingService<S>
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
        let span = operation_span(&op);
        // Inner layers (and the repository span) nest under this one.
        let fut = span.in_scope(|| self.inner.call(op));
        let handle = span.clone();

        Box::pin(
            async move {
                let result = fut.await;
                handle.record("code", status_code_of(&result));
                match &result {
                    Ok(resp) => {
                        handle.record(
                            "response",
                            tracing::field::display(FieldList(&resp.observed().trace_fields())),
                        );
                    }
                    Err(err) => {
                        handle.record("otel.status_code", "ERROR");
                        handle.record("error", tracing::field::display(err));
                    }
                }
                result
            }
            .instrument(span),
        )
    }
}
