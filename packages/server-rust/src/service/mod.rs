//! User service and its decoration pipeline.
//!
//! 1. **Operations** (`operation`): typed `Operation` values with context
//! 2. **Core** (`user`): business rules over the repository and notifier
//! 3. **Middleware** (`middleware`): metrics, logging, tracing and error
//!    reporting layers composed by `build_operation_pipeline`
//! 4. **Client** (`client`): typed facade used by transports
//! 5. **Background workers** (`worker`): periodic tasks (readiness probing)

pub mod client;
pub mod config;
pub mod middleware;
pub mod operation;
pub mod user;
pub mod worker;

pub use client::UserClient;
pub use config::ServiceConfig;
pub use middleware::{build_operation_pipeline, PipelineService};
pub use operation::{
    operation_names, status_code_of, ErrorKind, Interrupted, Operation, OperationContext,
    OperationError, OperationResponse, Protocol,
};
pub use user::UserService;
pub use worker::{BackgroundRunnable, BackgroundWorker};
