//! End-to-end orchestrator tests against fake backend CLIs.

#![cfg(unix)]

use serde_json::{Value, json};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;
use tailorgen::processor::{
    AcceptAny, ContentProcessor, ProcessOptions, ProcessorErrorCode, ShapeContract,
    ValidationIssue,
};
use tailorgen::provider::{
    Backend, CliProvider, Operation, OutputFormat, ProviderConfig, ProviderRegistry,
};
use tempfile::TempDir;

fn write_script(dir: &TempDir, name: &str, body: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_str().unwrap().to_string()
}

/// Registry with one claude-convention provider backed by `script`.
async fn registry_with(script: String, max_retries: u32) -> Arc<ProviderRegistry> {
    let registry = ProviderRegistry::new("claude");
    registry
        .register(
            "claude",
            Arc::new(CliProvider::new(
                Backend::Claude,
                ProviderConfig {
                    executable: script,
                    timeout_ms: 10_000,
                    max_retries,
                    model: None,
                },
            )),
        )
        .await;
    Arc::new(registry)
}

/// Contract requiring an object with an `x` field.
struct RequireX;

impl ShapeContract for RequireX {
    fn validate(&self, data: &Value) -> Result<Value, Vec<ValidationIssue>> {
        if data.get("x").is_some() {
            Ok(data.clone())
        } else {
            Err(vec![ValidationIssue::new("$.x", "missing required field")])
        }
    }
}

struct RejectAll;

impl ShapeContract for RejectAll {
    fn validate(&self, data: &Value) -> Result<Value, Vec<ValidationIssue>> {
        let _ = data;
        Err(vec![ValidationIssue::new("$", "always rejected")])
    }
}

#[tokio::test]
async fn end_to_end_json_generation_succeeds() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "claude", r#"printf '%s' '{"x":1}'"#);
    let processor = ContentProcessor::new(registry_with(script, 0).await);

    let result = processor
        .process(
            "return {\"x\":1}",
            &RequireX,
            &ProcessOptions::default(),
            &Operation::new(),
        )
        .await
        .unwrap();

    assert_eq!(result, json!({"x": 1}));
}

#[tokio::test]
async fn validation_failure_retries_then_reports_itemized_issues() {
    let dir = TempDir::new().unwrap();
    let count_file = dir.path().join("attempts");
    let script = write_script(
        &dir,
        "claude",
        &format!(
            "if [ \"$1\" = \"--version\" ]; then echo ok; exit 0; fi\necho run >> {}\nprintf '%s' '{{\"wrong\":true}}'",
            count_file.display()
        ),
    );
    let processor = ContentProcessor::new(registry_with(script, 0).await);

    let opts = ProcessOptions {
        max_validation_retries: 1,
        ..Default::default()
    };
    let err = processor
        .process("anything", &RejectAll, &opts, &Operation::new())
        .await
        .unwrap_err();

    assert_eq!(err.code(), ProcessorErrorCode::ValidationFailed);
    // 1 initial + 1 validation retry, each a fresh generation.
    let attempts = fs::read_to_string(&count_file).unwrap().lines().count();
    assert_eq!(attempts, 2);

    let details = err.details().unwrap();
    assert_eq!(details["attempts"], 2);
    assert_eq!(details["issues"][0]["path"], "$");
    assert_eq!(details["data"], json!({"wrong": true}));
}

#[tokio::test]
async fn timeout_override_never_touches_the_stored_config() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        &dir,
        "claude",
        "if [ \"$1\" = \"--version\" ]; then echo ok; exit 0; fi\nsleep 30",
    );
    let registry = registry_with(script, 0).await;
    let provider = registry.provider("claude").await.unwrap();
    let processor = ContentProcessor::new(Arc::clone(&registry));

    let opts = ProcessOptions {
        override_timeout_ms: Some(50),
        max_validation_retries: 0,
        ..Default::default()
    };
    let err = processor
        .process("anything", &AcceptAny, &opts, &Operation::new())
        .await
        .unwrap_err();

    assert_eq!(err.code(), ProcessorErrorCode::Timeout);
    // The override was a per-call effective config; the provider still holds
    // its original timeout even though the call failed.
    assert_eq!(provider.config().await.timeout_ms, 10_000);
}

#[tokio::test]
async fn missing_executable_gates_as_cli_not_available() {
    let registry = registry_with("/nonexistent/claude-cli".to_string(), 0).await;
    let processor = ContentProcessor::new(registry);

    let err = processor
        .process(
            "anything",
            &AcceptAny,
            &ProcessOptions::default(),
            &Operation::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), ProcessorErrorCode::CliNotAvailable);
}

#[tokio::test]
async fn unparseable_json_surfaces_as_parse_failed() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "claude", "printf '%s' 'prose with no json at all'");
    let processor = ContentProcessor::new(registry_with(script, 0).await);

    let err = processor
        .process(
            "anything",
            &AcceptAny,
            &ProcessOptions::default(),
            &Operation::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), ProcessorErrorCode::ParseFailed);
    let details = err.details().unwrap();
    assert!(
        details["preview"]
            .as_str()
            .unwrap()
            .contains("prose with no json")
    );
}

#[tokio::test]
async fn text_format_validates_and_sanitizes_the_raw_string() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "claude", "echo '  hello  '");
    let processor = ContentProcessor::new(registry_with(script, 0).await).with_sanitizer(
        Arc::new(|value| match value {
            Value::String(text) => Value::String(text.to_uppercase()),
            other => other,
        }),
    );

    let opts = ProcessOptions {
        output_format: OutputFormat::Text,
        ..Default::default()
    };
    let result = processor
        .process("say hello", &AcceptAny, &opts, &Operation::new())
        .await
        .unwrap();

    assert_eq!(result, json!("HELLO"));
}

#[tokio::test]
async fn unknown_provider_selection_is_an_unknown_error() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "claude", "printf '%s' '{}'");
    let processor = ContentProcessor::new(registry_with(script, 0).await);

    let opts = ProcessOptions {
        provider: Some("missing".to_string()),
        ..Default::default()
    };
    let err = processor
        .process("anything", &AcceptAny, &opts, &Operation::new())
        .await
        .unwrap_err();

    assert_eq!(err.code(), ProcessorErrorCode::Unknown);
}
