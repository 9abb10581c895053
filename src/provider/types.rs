use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Desired shape of the backend's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
}

/// A single generation request. Immutable, consumed by one execution.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub output_format: OutputFormat,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, output_format: OutputFormat) -> Self {
        Self {
            prompt: prompt.into(),
            output_format,
        }
    }
}

/// Successful backend output.
///
/// `data` is populated only for [`OutputFormat::Json`] requests whose output
/// survived the parser's fallback ladder.
#[derive(Debug, Clone)]
pub struct Completion {
    pub raw_text: String,
    pub data: Option<serde_json::Value>,
}

/// Fixed enumeration of provider-level failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderErrorCode {
    ProviderNotAvailable,
    AuthFailed,
    Timeout,
    Cancelled,
    ProviderError,
    InvalidJson,
    RateLimited,
}

/// Failure of a single backend execution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("{backend}: executable not available: {message}")]
    NotAvailable { backend: String, message: String },
    #[error("{backend}: authentication failed: {message}")]
    AuthFailed { backend: String, message: String },
    #[error("{backend}: timed out after {timeout_ms}ms")]
    Timeout { backend: String, timeout_ms: u64 },
    #[error("{backend}: execution cancelled")]
    Cancelled { backend: String },
    #[error("{backend}: backend failed (exit code {exit_code:?}): {message}")]
    Backend {
        backend: String,
        exit_code: Option<i32>,
        message: String,
    },
    #[error("{backend}: no JSON value could be extracted from output: {preview}")]
    InvalidJson { backend: String, preview: String },
    #[error("{backend}: rate limited: {message}")]
    RateLimited { backend: String, message: String },
}

impl ProviderError {
    pub fn code(&self) -> ProviderErrorCode {
        match self {
            Self::NotAvailable { .. } => ProviderErrorCode::ProviderNotAvailable,
            Self::AuthFailed { .. } => ProviderErrorCode::AuthFailed,
            Self::Timeout { .. } => ProviderErrorCode::Timeout,
            Self::Cancelled { .. } => ProviderErrorCode::Cancelled,
            Self::Backend { .. } => ProviderErrorCode::ProviderError,
            Self::InvalidJson { .. } => ProviderErrorCode::InvalidJson,
            Self::RateLimited { .. } => ProviderErrorCode::RateLimited,
        }
    }

    pub fn backend(&self) -> &str {
        match self {
            Self::NotAvailable { backend, .. }
            | Self::AuthFailed { backend, .. }
            | Self::Timeout { backend, .. }
            | Self::Cancelled { backend }
            | Self::Backend { backend, .. }
            | Self::InvalidJson { backend, .. }
            | Self::RateLimited { backend, .. } => backend,
        }
    }

    /// Transient failures are the only codes `execute_with_retry` retries.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.code(),
            ProviderErrorCode::Timeout
                | ProviderErrorCode::Cancelled
                | ProviderErrorCode::RateLimited
        )
    }
}

/// Per-provider execution configuration.
///
/// Owned by exactly one [`CliProvider`](crate::provider::CliProvider);
/// `config()` returns snapshots, never live references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub executable: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub model: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            executable: String::new(),
            timeout_ms: 120_000,
            max_retries: 2,
            model: None,
        }
    }
}

/// Shallow field-overwrite patch applied by `update_config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfigPatch {
    pub executable: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub model: Option<Option<String>>,
}

impl ProviderConfigPatch {
    pub fn apply(&self, config: &mut ProviderConfig) {
        if let Some(executable) = &self.executable {
            config.executable = executable.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
    }
}

/// Result of an availability probe. Computed on demand, never cached here.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub backend: String,
    pub available: bool,
    pub version: Option<String>,
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Caller-owned handle for one in-flight pipeline call: a correlation id plus
/// a cancellation flag. Cloning shares the underlying token, so any clone can
/// abort the subprocess.
#[derive(Debug, Clone)]
pub struct Operation {
    pub id: Uuid,
    cancel: CancellationToken,
}

impl Operation {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl Default for Operation {
    fn default() -> Self {
        Self::new()
    }
}
