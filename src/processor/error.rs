//! The uniform error surface exposed to callers, and the mapping from
//! provider-level failures onto it.

use crate::processor::contract::ValidationIssue;
use crate::provider::types::ProviderError;
use serde::Serialize;
use serde_json::{Value, json};

/// Fixed enumeration of processor-level failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessorErrorCode {
    CliNotAvailable,
    Timeout,
    ParseFailed,
    ExecutionFailed,
    ValidationFailed,
    Unknown,
}

/// Error surfaced by [`ContentProcessor::process`](crate::processor::ContentProcessor::process).
///
/// Carries a human-readable message plus enough structured detail for the
/// calling layer to render actionable feedback without stack traces.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProcessorError {
    #[error("AI CLI '{backend}' is not available: {message}")]
    CliNotAvailable { backend: String, message: String },
    #[error("AI generation timed out: {message}")]
    Timeout { message: String },
    #[error("could not parse AI output as JSON: {message}")]
    ParseFailed {
        message: String,
        preview: Option<String>,
    },
    #[error("AI generation failed: {message}")]
    ExecutionFailed { message: String },
    #[error("generated content did not match the expected shape after {attempts} attempts")]
    ValidationFailed {
        attempts: u32,
        issues: Vec<ValidationIssue>,
        /// The raw offending value, kept for diagnosability.
        data: Value,
    },
    #[error("unexpected error: {message}")]
    Unknown { message: String },
}

impl ProcessorError {
    pub fn code(&self) -> ProcessorErrorCode {
        match self {
            Self::CliNotAvailable { .. } => ProcessorErrorCode::CliNotAvailable,
            Self::Timeout { .. } => ProcessorErrorCode::Timeout,
            Self::ParseFailed { .. } => ProcessorErrorCode::ParseFailed,
            Self::ExecutionFailed { .. } => ProcessorErrorCode::ExecutionFailed,
            Self::ValidationFailed { .. } => ProcessorErrorCode::ValidationFailed,
            Self::Unknown { .. } => ProcessorErrorCode::Unknown,
        }
    }

    /// Structured detail payload for the calling layer, when the variant
    /// carries one.
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::ParseFailed { preview, .. } => preview
                .as_ref()
                .map(|preview| json!({ "preview": preview })),
            Self::ValidationFailed {
                attempts,
                issues,
                data,
            } => Some(json!({
                "attempts": attempts,
                "issues": issues,
                "data": data,
            })),
            _ => None,
        }
    }
}

impl From<ProviderError> for ProcessorError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotAvailable { backend, message } => Self::CliNotAvailable {
                backend,
                message,
            },
            ProviderError::AuthFailed { backend, message } => Self::CliNotAvailable {
                backend,
                message: format!("authentication failed: {message}"),
            },
            ProviderError::Timeout {
                backend,
                timeout_ms,
            } => Self::Timeout {
                message: format!("{backend} did not answer within {timeout_ms}ms"),
            },
            ProviderError::InvalidJson { backend, preview } => Self::ParseFailed {
                message: format!("{backend} returned no recoverable JSON"),
                preview: Some(preview),
            },
            ProviderError::RateLimited { backend, message } => Self::ExecutionFailed {
                message: format!("Rate limited: {backend}: {message}"),
            },
            other => Self::ExecutionFailed {
                message: other.to_string(),
            },
        }
    }
}
