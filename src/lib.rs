//! # Tailorgen
//!
//! Generates AI-tailored content (resume text, cover letters) by driving one
//! of several interchangeable command-line AI backends as a subprocess. The
//! library is the **AI provider execution and validation pipeline**; the
//! bundled binary is a thin reference caller.
//!
//! ## Architecture Overview
//!
//! - **[`provider`]**: subprocess runner with timeout and cancellation, the
//!   JSON-recovery parser for unreliable backend output, the per-backend
//!   provider façade, and the registry that owns all providers
//! - **[`processor`]**: the orchestrator application code calls; availability
//!   gating, error-code translation, shape validation, and validation retry
//! - **[`settings`]**: TOML configuration with a discovery hierarchy
//! - **[`cli`]**: argument parsing and subcommand handlers for the binary
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tailorgen::processor::{AcceptAny, ContentProcessor, ProcessOptions};
//! use tailorgen::provider::{Operation, ProviderRegistry};
//! use tailorgen::settings::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::discover()?;
//!     let registry = Arc::new(ProviderRegistry::with_standard_backends(&settings));
//!     let processor = ContentProcessor::new(registry);
//!
//!     let result = processor
//!         .process(
//!             "Summarize my experience as JSON",
//!             &AcceptAny,
//!             &ProcessOptions::default(),
//!             &Operation::new(),
//!         )
//!         .await?;
//!
//!     println!("{result}");
//!     Ok(())
//! }
//! ```

/// Provider execution layer.
///
/// Spawns backend CLIs as subprocesses, manages their lifecycle under timeout
/// and cancellation, and recovers structured JSON from heterogeneously
/// wrapped output.
pub mod provider;

/// Processing orchestrator.
///
/// The sole integration point for callers: provider selection, error mapping,
/// shape validation with bounded retry, and optional output sanitation.
pub mod processor;

/// Configuration discovery and loading.
pub mod settings;

/// Command-line interface for the bundled binary.
pub mod cli;

pub use processor::{
    AcceptAny, ContentProcessor, ProcessOptions, ProcessorError, ProcessorErrorCode, Sanitizer,
    ShapeContract, ValidationIssue,
};
pub use provider::{
    Backend, CliProvider, Completion, CustomBackend, GenerationRequest, Operation, OutputFormat,
    ProviderConfig, ProviderConfigPatch, ProviderError, ProviderErrorCode, ProviderRegistry,
    ProviderStatus, RegistryError,
};
pub use settings::{BackendSettings, Settings, SettingsError};
