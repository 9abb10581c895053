//! Configuration discovery and loading.
//!
//! Settings are discovered through this hierarchy:
//! 1. Current directory: ./tailorgen.toml or ./.tailorgen/config.toml
//! 2. User config: ~/.tailorgen/config.toml
//! 3. System config: /etc/tailorgen/config.toml
//! 4. Built-in defaults

use crate::provider::types::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::env as std_env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Hidden application directory name (like .git, .vscode).
pub const APP_DIR_NAME: &str = ".tailorgen";

/// Configuration file name inside the application directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Execution settings for one backend CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub executable: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub model: Option<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            executable: String::new(),
            timeout_ms: 120_000,
            max_retries: 2,
            model: None,
        }
    }
}

impl BackendSettings {
    fn for_executable(executable: &str) -> Self {
        Self {
            executable: executable.to_string(),
            ..Default::default()
        }
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            executable: self.executable.clone(),
            timeout_ms: self.timeout_ms,
            max_retries: self.max_retries,
            model: self.model.clone(),
        }
    }
}

/// Application settings loaded from the discovery hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_provider: String,
    pub max_validation_retries: u32,
    pub claude: BackendSettings,
    pub gemini: BackendSettings,
    pub codex: BackendSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_provider: "claude".to_string(),
            max_validation_retries: 1,
            claude: BackendSettings::for_executable("claude"),
            gemini: BackendSettings::for_executable("gemini"),
            codex: BackendSettings::for_executable("codex"),
        }
    }
}

impl Settings {
    /// Discovers and loads settings using the hierarchy, falling back to
    /// built-in defaults when no file is found.
    pub fn discover() -> Result<Self, SettingsError> {
        if let Some(path) = Self::find_config_file() {
            info!("Loading configuration from: {:?}", path);
            return Self::from_toml_file(path);
        }
        info!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// First existing candidate in the discovery hierarchy, if any.
    pub fn find_config_file() -> Option<PathBuf> {
        for candidate in Self::config_candidates() {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                debug!("Found config file: {:?}", candidate);
                return Some(candidate);
            }
        }
        None
    }

    /// Candidate paths in priority order.
    pub fn config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = std_env::current_dir() {
            candidates.push(current_dir.join("tailorgen.toml"));
            candidates.push(current_dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME));
        }

        if let Some(home_dir) = Self::home_dir() {
            candidates.push(home_dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME));
        }

        #[cfg(unix)]
        candidates.push(PathBuf::from("/etc/tailorgen/config.toml"));

        #[cfg(windows)]
        if let Ok(program_data) = std_env::var("PROGRAMDATA") {
            candidates.push(
                PathBuf::from(program_data)
                    .join("tailorgen")
                    .join("config.toml"),
            );
        }

        candidates
    }

    fn home_dir() -> Option<PathBuf> {
        std_env::var("HOME")
            .ok()
            .or_else(|| std_env::var("USERPROFILE").ok())
            .map(PathBuf::from)
    }

    /// Prints the discovery hierarchy and which file is active.
    pub fn show_discovery_info() {
        println!("Configuration Discovery Hierarchy:");
        println!();

        for (i, candidate) in Self::config_candidates().iter().enumerate() {
            let status = if candidate.exists() {
                if candidate.is_file() {
                    "✓ EXISTS"
                } else {
                    "✗ NOT A FILE"
                }
            } else {
                "✗ NOT FOUND"
            };
            println!("  {}. {:?} - {}", i + 1, candidate, status);
        }

        println!();
        if let Some(found) = Self::find_config_file() {
            println!("Active configuration: {:?}", found);
        } else {
            println!("Active configuration: Built-in defaults");
        }
    }
}
