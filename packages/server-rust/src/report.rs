//! Error-tracking sink.
//!
//! Decorators hand failed calls to an [`ErrorReporter`]. The default
//! [`LogReporter`] emits each report as an `error_report` tracing event, so a
//! log shipper or a subscriber layer can forward them to a tracking service.

use std::fmt;

use roster_core::{Field, FieldList};

/// One captured error with its tags and structured extras.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    /// Rendered error chain.
    pub message: String,
    pub tags: Vec<(&'static str, String)>,
    pub extras: Vec<(&'static str, Vec<Field>)>,
}

impl ErrorReport {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tags: Vec::new(),
            extras: Vec::new(),
        }
    }

    #[must_use]
    pub fn tag(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.tags.push((key, value.into()));
        self
    }

    #[must_use]
    pub fn extra(mut self, key: &'static str, fields: Vec<Field>) -> Self {
        self.extras.push((key, fields));
        self
    }

    #[must_use]
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        for (key, value) in &self.tags {
            write!(f, " {key}={value}")?;
        }
        for (key, fields) in &self.extras {
            write!(f, " {key}=[{}]", FieldList(fields))?;
        }
        Ok(())
    }
}

/// Destination for captured errors. Capturing must not block the caller.
pub trait ErrorReporter: Send + Sync {
    fn capture(&self, report: ErrorReport);
}

/// Reporter that writes reports to the `error_report` tracing target.
#[derive(Debug, Clone, Default)]
pub struct LogReporter {
    environment: String,
}

impl LogReporter {
    #[must_use]
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
        }
    }
}

impl ErrorReporter for LogReporter {
    fn capture(&self, report: ErrorReport) {
        tracing::error!(
            target: "error_report",
            environment = %self.environment,
            report = %report,
            "captured error"
        );
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;

    use super::{ErrorReport, ErrorReporter};

    /// Reporter that keeps every report for assertions.
    #[derive(Default)]
    pub(crate) struct CapturingReporter {
        reports: Mutex<Vec<ErrorReport>>,
    }

    impl CapturingReporter {
        pub(crate) fn reports(&self) -> Vec<ErrorReport> {
            self.reports.lock().clone()
        }
    }

    impl ErrorReporter for CapturingReporter {
        fn capture(&self, report: ErrorReport) {
            self.reports.lock().push(report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_builder_and_display() {
        let report = ErrorReport::new("UpdateUser: db down")
            .tag("method", "UpdateUser")
            .tag("code", "503")
            .extra("request", vec![("id", "u1".to_string())]);

        assert_eq!(report.tag_value("code"), Some("503"));
        assert_eq!(report.tag_value("missing"), None);
        assert_eq!(
            report.to_string(),
            "UpdateUser: db down method=UpdateUser code=503 request=[id=u1]"
        );
    }

    #[test]
    fn log_reporter_does_not_panic_without_subscriber() {
        LogReporter::new("test").capture(ErrorReport::new("boom"));
    }
}
