use roster_core::DEFAULT_MAX_PAGE_LIMIT;

/// Settings for the user service and its decoration pipeline.
///
/// Layer toggles are decided once at startup; the pipeline is never
/// reconfigured per call.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Service label attached to metrics.
    pub service_name: &'static str,
    /// Largest page size a list call may request.
    pub max_page_limit: u32,
    /// Default deadline for store calls in milliseconds.
    pub default_operation_timeout_ms: u64,
    pub metrics_enabled: bool,
    pub logging_enabled: bool,
    pub tracing_enabled: bool,
    pub error_reporting_enabled: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "user",
            max_page_limit: DEFAULT_MAX_PAGE_LIMIT,
            default_operation_timeout_ms: 30_000,
            metrics_enabled: true,
            logging_enabled: true,
            tracing_enabled: true,
            error_reporting_enabled: true,
        }
    }
}
