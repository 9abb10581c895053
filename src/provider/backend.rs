//! Backend command-line conventions.
//!
//! Each supported AI CLI takes its prompt and flags differently; the argument
//! lists built here must match the real executables byte for byte:
//!
//! ```bash
//! claude --print [--output-format json]            # prompt on stdin
//! gemini -p "prompt" [-m model] [--output-format json]
//! codex  [--model model] [--json] "prompt"         # prompt positional, last
//! ```
//!
//! Claude wraps its JSON-mode payload in a `{"type":"result","result":"..."}`
//! envelope and Gemini in `{"response":"..."}`; Codex emits the payload bare.

use crate::provider::types::OutputFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder substituted with the prompt in custom argument templates.
pub const PROMPT_PLACEHOLDER: &str = "{prompt}";

/// One concrete AI CLI and its invocation conventions.
#[derive(Debug, Clone)]
pub enum Backend {
    Claude,
    Gemini,
    Codex,
    Custom(CustomBackend),
}

/// Runtime-registered backend described by an argument template instead of
/// compiled-in conventions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomBackend {
    pub name: String,
    /// Argument template; occurrences of `{prompt}` are replaced with the
    /// prompt unless `prompt_via_stdin` is set.
    pub args: Vec<String>,
    /// Extra arguments appended in JSON mode.
    pub json_args: Vec<String>,
    pub version_args: Vec<String>,
    pub prompt_via_stdin: bool,
}

impl Backend {
    pub fn name(&self) -> &str {
        match self {
            Self::Claude => "claude",
            Self::Gemini => "gemini",
            Self::Codex => "codex",
            Self::Custom(custom) => &custom.name,
        }
    }

    /// Builds the argument list for one generation request and decides whether
    /// the prompt travels on stdin or as an argument.
    ///
    /// Returns `(args, stdin_payload)`.
    pub fn invocation(
        &self,
        prompt: &str,
        format: OutputFormat,
        model: Option<&str>,
    ) -> (Vec<String>, Option<String>) {
        match self {
            Self::Claude => {
                let mut args = vec!["--print".to_string()];
                if format == OutputFormat::Json {
                    args.push("--output-format".to_string());
                    args.push("json".to_string());
                }
                (args, Some(prompt.to_string()))
            }
            Self::Gemini => {
                let mut args = vec!["-p".to_string(), prompt.to_string()];
                if let Some(model) = model {
                    args.push("-m".to_string());
                    args.push(model.to_string());
                }
                if format == OutputFormat::Json {
                    args.push("--output-format".to_string());
                    args.push("json".to_string());
                }
                (args, None)
            }
            Self::Codex => {
                let mut args = Vec::new();
                if let Some(model) = model {
                    args.push("--model".to_string());
                    args.push(model.to_string());
                }
                if format == OutputFormat::Json {
                    args.push("--json".to_string());
                }
                args.push(prompt.to_string());
                (args, None)
            }
            Self::Custom(custom) => {
                let mut args: Vec<String> = custom
                    .args
                    .iter()
                    .map(|arg| {
                        if custom.prompt_via_stdin {
                            arg.clone()
                        } else {
                            arg.replace(PROMPT_PLACEHOLDER, prompt)
                        }
                    })
                    .collect();
                if format == OutputFormat::Json {
                    args.extend(custom.json_args.iter().cloned());
                }
                let stdin = custom.prompt_via_stdin.then(|| prompt.to_string());
                (args, stdin)
            }
        }
    }

    /// Arguments for the availability probe. No stdin, no prompt.
    pub fn version_args(&self) -> Vec<String> {
        match self {
            Self::Claude | Self::Gemini | Self::Codex => vec!["--version".to_string()],
            Self::Custom(custom) => custom.version_args.clone(),
        }
    }

    /// Recognizes this backend's JSON envelope and returns the inner textual
    /// payload when `value` matches it.
    pub fn unwrap_envelope(&self, value: &Value) -> Option<String> {
        match self {
            Self::Claude => {
                let object = value.as_object()?;
                if object.get("type").and_then(Value::as_str) != Some("result") {
                    return None;
                }
                object
                    .get("result")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            }
            Self::Gemini => value
                .as_object()?
                .get("response")
                .and_then(Value::as_str)
                .map(str::to_string),
            Self::Codex | Self::Custom(_) => None,
        }
    }
}
