//! Optional observation capability for request and response types.
//!
//! Decorators ask each request/response for extra fields to attach to log
//! records, trace spans and error reports. Every method defaults to "no
//! fields", so a type opts in only to what it wants to expose. Secrets such
//! as passwords must never be returned from any of these.

use std::fmt;

/// A single named value exposed to an observer.
pub type Field = (&'static str, String);

pub trait Observed {
    /// Fields attached to the structured log record.
    fn log_fields(&self) -> Vec<Field> {
        Vec::new()
    }

    /// Fields attached to the operation span.
    fn trace_fields(&self) -> Vec<Field> {
        Vec::new()
    }

    /// Extras attached to an error report.
    fn report_extras(&self) -> Vec<Field> {
        Vec::new()
    }
}

/// Renders fields as `key=value` pairs separated by spaces.
pub struct FieldList<'a>(pub &'a [Field]);

impl fmt::Display for FieldList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;
    impl Observed for Silent {}

    #[test]
    fn default_capability_exposes_nothing() {
        assert!(Silent.log_fields().is_empty());
        assert!(Silent.trace_fields().is_empty());
        assert!(Silent.report_extras().is_empty());
    }

    #[test]
    fn field_list_display() {
        let fields = vec![("id", "u1".to_string()), ("count", "3".to_string())];
        assert_eq!(FieldList(&fields).to_string(), "id=u1 count=3");
        assert_eq!(FieldList(&[]).to_string(), "");
    }
}
