//! Collaborator interfaces the processor consumes: the externally supplied
//! result-shape contract and the optional output sanitizer.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// One itemized shape mismatch, e.g. a missing or mistyped field.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Externally supplied validator deciding whether generated content matches
/// the expected structure. The validation rules themselves live with the
/// caller; the pipeline only enforces the verdict.
pub trait ShapeContract: Send + Sync {
    /// Returns the (possibly coerced) value on success, or the itemized
    /// mismatches on failure.
    fn validate(&self, data: &Value) -> Result<Value, Vec<ValidationIssue>>;
}

/// Pure post-validation cleanup hook applied to the validated value.
pub type Sanitizer = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Contract that accepts any value unchanged, for callers that only need the
/// pipeline mechanics.
pub struct AcceptAny;

impl ShapeContract for AcceptAny {
    fn validate(&self, data: &Value) -> Result<Value, Vec<ValidationIssue>> {
        Ok(data.clone())
    }
}
