//! Logging middleware: one structured event per call.
//!
//! Severity follows the resolved status code: `WARN` for 404, `ERROR` for
//! any other failure, `INFO` otherwise.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use roster_core::{Field, FieldList};
use tower::{Layer, Service};
use tracing::{error, info, warn};

use crate::service::operation::{status_code_of, Operation, OperationError, OperationResponse};

#[derive(Debug, Clone, Default)]
pub struct LoggingLayer;

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingService<S> {
    inner: S,
}

impl<S> Service<Operation> for LoggingService<S>
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
        let call_id = op.ctx().call_id;
        let protocol = op.ctx().protocol.as_str();
        let url = op.ctx().protocol.url().unwrap_or_default().to_string();
        let mut fields: Vec<Field> = op.request().log_fields();
        let fut = self.inner.call(op);

        Box::pin(async move {
            let start = Instant::now();
            let result = fut.await;
            #[allow(clippy::cast_possible_truncation)]
            let took_ms = start.elapsed().as_millis() as u64;
            let code = status_code_of(&result);

            if let Ok(resp) = &result {
                fields.extend(resp.observed().log_fields());
            }
            let fields = FieldList(&fields).to_string();

            match &result {
                Ok(_) => info!(
                    operation,
                    call_id,
                    code,
                    took_ms,
                    protocol,
                    url = %url,
                    fields = %fields,
                    "call finished"
                ),
                Err(err) if code == 404 => warn!(
                    operation,
                    call_id,
                    code,
                    took_ms,
                    protocol,
                    url = %url,
                    fields = %fields,
                    error = %err,
                    "call finished"
                ),
                Err(err) => error!(
                    operation,
                    call_id,
                    code,
                    took_ms,
                    protocol,
                    url = %url,
                    fields = %fields,
                    error = %err,
                    "call failed"
                ),
            }

            result
        })
    }
}
