//! Subcommand handlers. These play the role of the calling layer: they wire
//! up the registry and processor, run one pipeline call, and render the
//! outcome for a terminal user.

use crate::cli::args::FormatArg;
use crate::processor::{AcceptAny, ContentProcessor, ProcessOptions};
use crate::provider::registry::ProviderRegistry;
use crate::provider::types::{Operation, OutputFormat};
use crate::settings::Settings;
use anyhow::Context;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

fn load_settings(config_override: Option<&Path>) -> anyhow::Result<Settings> {
    match config_override {
        Some(path) => Settings::from_toml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => Settings::discover().context("configuration discovery failed"),
    }
}

fn read_prompt(prompt_file: Option<&Path>) -> anyhow::Result<String> {
    let prompt = match prompt_file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read prompt file {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read prompt from stdin")?;
            buffer
        }
    };

    let prompt = prompt.trim().to_string();
    anyhow::ensure!(!prompt.is_empty(), "prompt is empty");
    Ok(prompt)
}

pub async fn generate(
    prompt_file: Option<PathBuf>,
    provider: Option<String>,
    format: FormatArg,
    timeout_ms: Option<u64>,
    out: Option<PathBuf>,
    config: Option<PathBuf>,
) -> anyhow::Result<()> {
    let settings = load_settings(config.as_deref())?;
    let prompt = read_prompt(prompt_file.as_deref())?;

    let registry = Arc::new(ProviderRegistry::with_standard_backends(&settings));
    let processor = ContentProcessor::new(registry);

    let opts = ProcessOptions {
        provider,
        output_format: format.into(),
        override_timeout_ms: timeout_ms,
        max_validation_retries: settings.max_validation_retries,
    };

    let op = Operation::new();
    info!(operation = %op.id, "starting generation");

    // Ctrl-C aborts the in-flight subprocess via the operation's token.
    let cancel_handle = op.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling generation");
            cancel_handle.cancel();
        }
    });

    match processor.process(&prompt, &AcceptAny, &opts, &op).await {
        Ok(result) => {
            let rendered = render_result(&result, opts.output_format)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("failed to write result to {}", path.display()))?;
                    println!("Result written to {}", path.display());
                }
                None => println!("{rendered}"),
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("Error [{:?}]: {}", err.code(), err);
            if let Some(details) = err.details() {
                eprintln!("Details: {}", serde_json::to_string_pretty(&details)?);
            }
            std::process::exit(1);
        }
    }
}

fn render_result(result: &Value, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        // Text results come back as a JSON string value; print it bare.
        OutputFormat::Text => match result {
            Value::String(text) => Ok(text.clone()),
            other => Ok(other.to_string()),
        },
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
    }
}

pub async fn status(config: Option<PathBuf>) -> anyhow::Result<()> {
    let settings = load_settings(config.as_deref())?;
    let registry = ProviderRegistry::with_standard_backends(&settings);

    println!("Backend Availability:");
    println!();

    for status in registry.check_all_availability().await {
        let marker = if status.available { "✓" } else { "✗" };
        let detail = status
            .version
            .or(status.error)
            .unwrap_or_else(|| "no details".to_string());
        let default_tag = if status.backend == settings.default_provider {
            " (default)"
        } else {
            ""
        };
        println!("  {} {}{} - {}", marker, status.backend, default_tag, detail);
    }

    Ok(())
}
