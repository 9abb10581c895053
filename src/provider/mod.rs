//! Provider execution layer: subprocess runner, JSON-recovery parser, the
//! per-backend provider façade, and the registry that owns all providers.

pub mod backend;
pub mod cli_provider;
pub mod parser;
pub mod registry;
pub mod runner;
pub mod types;

pub use backend::{Backend, CustomBackend};
pub use cli_provider::CliProvider;
pub use registry::{ProviderRegistry, RegistryError};
pub use types::{
    Completion, GenerationRequest, Operation, OutputFormat, ProviderConfig, ProviderConfigPatch,
    ProviderError, ProviderErrorCode, ProviderStatus,
};
