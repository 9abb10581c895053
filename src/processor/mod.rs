//! Processing orchestrator: the single entry point application code calls.
//!
//! `ContentProcessor::process` owns the cross-cutting policy around one
//! generation: provider selection, availability gating, per-call timeout
//! override, provider-error translation, shape validation, validation retry,
//! and optional output sanitation.
//!
//! The two retry loops are deliberately disjoint: transient process-level
//! failures (timeout, cancellation, rate limiting) are retried inside the
//! provider's `execute_with_retry`, while the orchestrator's own loop retries
//! only shape-validation failures, re-issuing the same prompt for a fresh
//! generation since AI output is non-deterministic.

pub mod contract;
pub mod error;

pub use contract::{AcceptAny, Sanitizer, ShapeContract, ValidationIssue};
pub use error::{ProcessorError, ProcessorErrorCode};

use crate::provider::registry::ProviderRegistry;
use crate::provider::types::{GenerationRequest, Operation, OutputFormat};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-call knobs for [`ContentProcessor::process`].
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Explicit provider name; `None` selects the registry default.
    pub provider: Option<String>,
    pub output_format: OutputFormat,
    /// One-shot timeout for this call only; the provider's stored
    /// configuration is never touched.
    pub override_timeout_ms: Option<u64>,
    /// Extra generation attempts allowed when output parses but fails the
    /// shape contract.
    pub max_validation_retries: u32,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            provider: None,
            output_format: OutputFormat::Json,
            override_timeout_ms: None,
            max_validation_retries: 1,
        }
    }
}

pub struct ContentProcessor {
    registry: Arc<ProviderRegistry>,
    sanitizer: Option<Sanitizer>,
}

impl ContentProcessor {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            sanitizer: None,
        }
    }

    /// Installs a post-validation sanitation hook.
    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = Some(sanitizer);
        self
    }

    /// Runs one generation end to end: select provider, gate on availability,
    /// execute with transient retries, validate against `contract`, retry
    /// validation failures up to `opts.max_validation_retries` times, then
    /// sanitize.
    ///
    /// Text-format output is validated as a JSON string value so a single
    /// contract interface covers both formats.
    pub async fn process(
        &self,
        prompt: &str,
        contract: &dyn ShapeContract,
        opts: &ProcessOptions,
        op: &Operation,
    ) -> Result<Value, ProcessorError> {
        let provider = match &opts.provider {
            Some(name) => {
                self.registry
                    .provider(name)
                    .await
                    .ok_or_else(|| ProcessorError::Unknown {
                        message: format!("provider '{name}' is not registered"),
                    })?
            }
            None => self
                .registry
                .default_provider()
                .await
                .map_err(|e| ProcessorError::Unknown {
                    message: e.to_string(),
                })?,
        };

        let status = provider.status().await;
        if !status.available {
            return Err(ProcessorError::CliNotAvailable {
                backend: status.backend,
                message: status
                    .error
                    .unwrap_or_else(|| "availability check failed".to_string()),
            });
        }

        // Per-call effective config: the override never mutates the shared
        // provider config, so concurrent calls cannot corrupt each other.
        let mut effective = provider.config().await;
        if let Some(timeout_ms) = opts.override_timeout_ms {
            effective.timeout_ms = timeout_ms;
        }

        let request = GenerationRequest::new(prompt, opts.output_format);
        let attempts = 1 + opts.max_validation_retries;
        let mut last_issues = Vec::new();
        let mut last_data = Value::Null;

        for attempt in 1..=attempts {
            debug!(
                operation = %op.id,
                backend = provider.backend_name(),
                attempt,
                attempts,
                "executing generation attempt"
            );

            let completion = provider
                .execute_with_retry_scoped(&request, &effective, op)
                .await?;

            let candidate = match opts.output_format {
                OutputFormat::Json => completion
                    .data
                    .unwrap_or_else(|| Value::String(completion.raw_text)),
                OutputFormat::Text => Value::String(completion.raw_text),
            };

            match contract.validate(&candidate) {
                Ok(valid) => {
                    info!(
                        operation = %op.id,
                        backend = provider.backend_name(),
                        attempt,
                        "generation validated"
                    );
                    let output = match &self.sanitizer {
                        Some(sanitize) => sanitize(valid),
                        None => valid,
                    };
                    return Ok(output);
                }
                Err(issues) => {
                    warn!(
                        operation = %op.id,
                        attempt,
                        issues = issues.len(),
                        "generated content failed shape validation"
                    );
                    last_issues = issues;
                    last_data = candidate;
                }
            }
        }

        Err(ProcessorError::ValidationFailed {
            attempts,
            issues: last_issues,
            data: last_data,
        })
    }
}
