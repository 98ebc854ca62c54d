//! Error notices handed to a notifier.

use std::any::Any;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Opaque identifier returned by a notifier for a delivered notice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(String);

impl ReportId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An error captured for reporting.
///
/// This is a detached description of the error, not the error itself: the
/// original value keeps flowing to the caller untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportableError {
    pub class: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl ReportableError {
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: message.into(),
            status: None,
            causes: Vec::new(),
        }
    }

    /// Describe any error value, using its type name as the class.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error,
    {
        Self::from_dyn(short_type_name::<E>(), err)
    }

    /// Describe a type-erased error under an explicit class name.
    pub fn from_dyn(class: impl Into<String>, err: &dyn std::error::Error) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            class: class.into(),
            message: err.to_string(),
            status: None,
            causes,
        }
    }

    /// Describe a panic payload as caught by `catch_unwind`.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Box<dyn Any>".to_string()
        };

        Self::new("panic", message)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl fmt::Display for ReportableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class, self.message)
    }
}

fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    // Keep generic arguments intact, strip only the leading module path.
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => full[idx + 2..].to_string(),
        None => full.to_string(),
    }
}

/// Everything a notifier receives for one report.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorNotice {
    pub error: ReportableError,
    /// Request data: either a controller's own diagnostics or the raw request.
    pub request: Value,
    pub context: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorNotice {
    pub fn new(error: ReportableError, request: Value) -> Self {
        Self {
            error,
            request,
            context: Map::new(),
            framework: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }

    pub fn with_framework(mut self, framework: Option<&str>) -> Self {
        self.framework = framework.map(String::from);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("outer failure")]
    struct Outer(#[source] Inner);

    #[derive(Debug, thiserror::Error)]
    #[error("inner failure")]
    struct Inner;

    #[test]
    fn test_from_error_collects_class_and_causes() {
        let err = ReportableError::from_error(&Outer(Inner));
        assert_eq!(err.class, "Outer");
        assert_eq!(err.message, "outer failure");
        assert_eq!(err.causes, vec!["inner failure".to_string()]);
    }

    #[test]
    fn test_from_panic_reads_string_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(ReportableError::from_panic(payload.as_ref()).message, "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        let err = ReportableError::from_panic(payload.as_ref());
        assert_eq!(err.class, "panic");
        assert_eq!(err.message, "owned boom");
    }

    #[test]
    fn test_notice_serializes_without_empty_fields() {
        let notice = ErrorNotice::new(ReportableError::new("RuntimeError", "boom"), Value::Null);
        let json = serde_json::to_value(&notice).unwrap();
        assert!(json.get("framework").is_none());
        assert!(json["error"].get("status").is_none());
        assert_eq!(json["error"]["class"], "RuntimeError");
    }
}
