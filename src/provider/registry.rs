//! Ownership and selection of provider instances.
//!
//! The registry is constructed once at application startup and handed to the
//! processor by reference; there is no global instance. Providers are kept in
//! registration order so fallback scanning is deterministic.

use crate::provider::backend::Backend;
use crate::provider::cli_provider::CliProvider;
use crate::provider::types::{ProviderConfig, ProviderStatus};
use crate::settings::Settings;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("provider '{0}' is not registered")]
    UnknownProvider(String),
    #[error("configured default provider '{0}' is not registered")]
    UnknownDefault(String),
}

struct RegistryInner {
    /// Registration order matters for fallback scanning.
    providers: Vec<(String, Arc<CliProvider>)>,
    default_name: String,
}

pub struct ProviderRegistry {
    inner: RwLock<RegistryInner>,
}

impl ProviderRegistry {
    pub fn new(default_name: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                providers: Vec::new(),
                default_name: default_name.into(),
            }),
        }
    }

    /// Builds a registry with the three standard backends wired from the
    /// application settings.
    pub fn with_standard_backends(settings: &Settings) -> Self {
        let mut providers = Vec::new();
        for (backend, backend_settings) in [
            (Backend::Claude, &settings.claude),
            (Backend::Gemini, &settings.gemini),
            (Backend::Codex, &settings.codex),
        ] {
            let name = backend.name().to_string();
            let provider = Arc::new(CliProvider::new(backend, backend_settings.provider_config()));
            providers.push((name, provider));
        }

        info!(
            default = %settings.default_provider,
            "provider registry initialized with standard backends"
        );

        Self {
            inner: RwLock::new(RegistryInner {
                providers,
                default_name: settings.default_provider.clone(),
            }),
        }
    }

    /// Runtime extension point: registers a provider under `name`, replacing
    /// any previous registration with that name.
    pub async fn register(&self, name: impl Into<String>, provider: Arc<CliProvider>) {
        let name = name.into();
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.providers.iter_mut().find(|(n, _)| *n == name) {
            existing.1 = provider;
        } else {
            inner.providers.push((name.clone(), provider));
        }
        debug!(provider = %name, "provider registered");
    }

    pub async fn provider(&self, name: &str) -> Option<Arc<CliProvider>> {
        let inner = self.inner.read().await;
        inner
            .providers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| Arc::clone(p))
    }

    pub async fn default_provider(&self) -> Result<Arc<CliProvider>, RegistryError> {
        let inner = self.inner.read().await;
        inner
            .providers
            .iter()
            .find(|(n, _)| *n == inner.default_name)
            .map(|(_, p)| Arc::clone(p))
            .ok_or_else(|| RegistryError::UnknownDefault(inner.default_name.clone()))
    }

    pub async fn default_name(&self) -> String {
        self.inner.read().await.default_name.clone()
    }

    pub async fn set_default(&self, name: &str) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        if !inner.providers.iter().any(|(n, _)| n == name) {
            return Err(RegistryError::UnknownProvider(name.to_string()));
        }
        inner.default_name = name.to_string();
        Ok(())
    }

    pub async fn names(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        inner.providers.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Sequentially probes every registered provider.
    pub async fn check_all_availability(&self) -> Vec<ProviderStatus> {
        let providers: Vec<Arc<CliProvider>> = {
            let inner = self.inner.read().await;
            inner.providers.iter().map(|(_, p)| Arc::clone(p)).collect()
        };

        let mut statuses = Vec::with_capacity(providers.len());
        for provider in providers {
            statuses.push(provider.status().await);
        }
        statuses
    }

    /// Returns the default provider if it is available, otherwise the first
    /// available provider in registration order, otherwise `None`.
    pub async fn first_available(&self) -> Option<Arc<CliProvider>> {
        let (default_name, providers): (String, Vec<(String, Arc<CliProvider>)>) = {
            let inner = self.inner.read().await;
            (inner.default_name.clone(), inner.providers.clone())
        };

        if let Some((_, default)) = providers.iter().find(|(n, _)| *n == default_name)
            && default.is_available().await
        {
            return Some(Arc::clone(default));
        }

        for (name, provider) in &providers {
            if *name == default_name {
                continue;
            }
            if provider.is_available().await {
                debug!(provider = %name, "falling back to first available provider");
                return Some(Arc::clone(provider));
            }
        }

        None
    }

    /// Convenience for registering a custom CLI backend at runtime.
    pub async fn register_backend(&self, backend: Backend, config: ProviderConfig) {
        let name = backend.name().to_string();
        self.register(name, Arc::new(CliProvider::new(backend, config)))
            .await;
    }
}
