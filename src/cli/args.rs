//! Command line argument parsing.
//!
//! Subcommands:
//! - `generate`: run one generation through the pipeline
//! - `status`: probe availability of every registered backend
//! - `show-config`: show configuration discovery information

use crate::provider::types::OutputFormat;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "tailorgen")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Generate AI-tailored resume and cover-letter content by driving command-line AI backends"
)]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one generation and print (or write) the result
    Generate {
        /// File containing the prompt; reads stdin when omitted
        prompt_file: Option<PathBuf>,
        /// Backend to use instead of the configured default
        #[arg(short = 'p', long = "provider")]
        provider: Option<String>,
        /// Expected output format
        #[arg(short = 'f', long = "format", value_enum, default_value_t = FormatArg::Json)]
        format: FormatArg,
        /// One-shot timeout override for this call, in milliseconds
        #[arg(long = "timeout-ms")]
        timeout_ms: Option<u64>,
        /// Write the result to a file instead of stdout
        #[arg(short = 'o', long = "out")]
        out: Option<PathBuf>,
        /// Configuration file path (bypasses discovery)
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
    },
    /// Check availability of every registered backend
    Status {
        /// Configuration file path (bypasses discovery)
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
    },
    /// Show configuration discovery information
    ShowConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}
