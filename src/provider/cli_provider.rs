//! Uniform provider façade over one backend CLI.
//!
//! `CliProvider` composes the subprocess runner and the JSON-recovery parser
//! behind one contract shared by every backend; which CLI it drives is decided
//! entirely by its [`Backend`] value. The owned [`ProviderConfig`] is only
//! written by `update_config`; per-call overrides travel as explicit effective
//! configs through the `*_scoped` variants, so concurrent calls never race on
//! shared mutable state.

use crate::provider::backend::Backend;
use crate::provider::parser;
use crate::provider::runner::{self, CliInvocation};
use crate::provider::types::{
    Completion, GenerationRequest, Operation, OutputFormat, ProviderConfig, ProviderConfigPatch,
    ProviderError, ProviderStatus,
};
use chrono::Utc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use which::which;

/// Cap on the availability probe; a version query should never take long.
const VERSION_CHECK_TIMEOUT_MS: u64 = 10_000;

/// Exponential backoff ceiling between retry attempts.
const MAX_BACKOFF_MS: u64 = 10_000;

#[derive(Debug)]
pub struct CliProvider {
    backend: Backend,
    config: RwLock<ProviderConfig>,
}

impl CliProvider {
    pub fn new(backend: Backend, config: ProviderConfig) -> Self {
        Self {
            backend,
            config: RwLock::new(config),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Snapshot of the current configuration. Callers get a clone, never a
    /// live reference.
    pub async fn config(&self) -> ProviderConfig {
        self.config.read().await.clone()
    }

    /// Shallow field-overwrite merge into the owned configuration.
    pub async fn update_config(&self, patch: ProviderConfigPatch) {
        let mut config = self.config.write().await;
        patch.apply(&mut config);
        debug!(
            backend = self.backend.name(),
            timeout_ms = config.timeout_ms,
            max_retries = config.max_retries,
            "provider configuration updated"
        );
    }

    /// Runs one generation against the stored configuration.
    pub async fn execute(
        &self,
        request: &GenerationRequest,
        op: &Operation,
    ) -> Result<Completion, ProviderError> {
        let config = self.config().await;
        self.execute_scoped(request, &config, op).await
    }

    /// Runs one generation against an explicit per-call configuration,
    /// leaving the stored configuration untouched.
    pub async fn execute_scoped(
        &self,
        request: &GenerationRequest,
        config: &ProviderConfig,
        op: &Operation,
    ) -> Result<Completion, ProviderError> {
        let (args, stdin) =
            self.backend
                .invocation(&request.prompt, request.output_format, config.model.as_deref());

        let execution = runner::run_cli(
            self.backend.name(),
            CliInvocation {
                executable: config.executable.clone(),
                args,
                stdin,
                timeout_ms: config.timeout_ms,
            },
            op.token(),
        )
        .await?;

        let raw_text = execution.stdout.trim().to_string();
        let data = match request.output_format {
            OutputFormat::Json => Some(
                parser::extract_json(&self.backend, &execution.stdout).map_err(|failure| {
                    ProviderError::InvalidJson {
                        backend: self.backend.name().to_string(),
                        preview: failure.preview,
                    }
                })?,
            ),
            OutputFormat::Text => None,
        };

        Ok(Completion { raw_text, data })
    }

    /// `execute` with bounded retries for transient failures (timeout,
    /// cancellation, rate limiting). All other failure codes return on first
    /// occurrence.
    pub async fn execute_with_retry(
        &self,
        request: &GenerationRequest,
        op: &Operation,
    ) -> Result<Completion, ProviderError> {
        let config = self.config().await;
        self.execute_with_retry_scoped(request, &config, op).await
    }

    /// Scoped variant of [`execute_with_retry`](Self::execute_with_retry).
    pub async fn execute_with_retry_scoped(
        &self,
        request: &GenerationRequest,
        config: &ProviderConfig,
        op: &Operation,
    ) -> Result<Completion, ProviderError> {
        let mut retries_used = 0u32;
        loop {
            match self.execute_scoped(request, config, op).await {
                Ok(completion) => return Ok(completion),
                Err(err) => {
                    if !err.is_transient() || retries_used >= config.max_retries {
                        return Err(err);
                    }
                    retries_used += 1;
                    let delay_ms = backoff_delay_ms(retries_used);
                    warn!(
                        backend = self.backend.name(),
                        code = ?err.code(),
                        retry = retries_used,
                        max_retries = config.max_retries,
                        delay_ms,
                        "transient failure, retrying after backoff"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }

    pub async fn is_available(&self) -> bool {
        self.status().await.available
    }

    /// Probes the backend executable with its version-query arguments.
    /// Computed fresh on every call; callers may cache if they want to.
    pub async fn status(&self) -> ProviderStatus {
        let config = self.config().await;
        let checked_at = Utc::now();
        let backend = self.backend.name().to_string();

        if which(&config.executable).is_err() {
            return ProviderStatus {
                backend,
                available: false,
                version: None,
                error: Some(format!(
                    "executable '{}' not found on PATH",
                    config.executable
                )),
                checked_at,
            };
        }

        let probe = CliInvocation {
            executable: config.executable.clone(),
            args: self.backend.version_args(),
            stdin: None,
            timeout_ms: VERSION_CHECK_TIMEOUT_MS,
        };

        match runner::run_cli(&backend, probe, &CancellationToken::new()).await {
            Ok(execution) => {
                let version = execution.stdout.trim().to_string();
                info!(backend = %backend, version = %version, "backend available");
                ProviderStatus {
                    backend,
                    available: true,
                    version: Some(version),
                    error: None,
                    checked_at,
                }
            }
            Err(err) => ProviderStatus {
                backend,
                available: false,
                version: None,
                error: Some(err.to_string()),
                checked_at,
            },
        }
    }
}

/// Backoff before retry `n` (1-based): 1s, 2s, 4s, ... capped at 10s.
fn backoff_delay_ms(retry: u32) -> u64 {
    let exponent = retry.saturating_sub(1).min(16);
    (1_000u64 << exponent).min(MAX_BACKOFF_MS)
}
