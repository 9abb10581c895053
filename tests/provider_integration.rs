//! Provider-level integration tests driving fake backend CLIs written as
//! shell scripts into temporary directories.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::time::{Duration, Instant};
use tailorgen::provider::{
    Backend, CliProvider, GenerationRequest, Operation, OutputFormat, ProviderConfig,
    ProviderErrorCode,
};
use tempfile::TempDir;

fn write_script(dir: &TempDir, name: &str, body: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_str().unwrap().to_string()
}

fn provider_for(backend: Backend, executable: String, max_retries: u32) -> CliProvider {
    CliProvider::new(
        backend,
        ProviderConfig {
            executable,
            timeout_ms: 10_000,
            max_retries,
            model: None,
        },
    )
}

#[tokio::test]
async fn claude_prompt_travels_via_stdin() {
    let dir = TempDir::new().unwrap();
    // Echoes whatever arrives on stdin, like `claude --print` echoing a
    // trivial prompt back.
    let script = write_script(&dir, "claude", "cat");
    let provider = provider_for(Backend::Claude, script, 0);

    let completion = provider
        .execute(
            &GenerationRequest::new("write my resume", OutputFormat::Text),
            &Operation::new(),
        )
        .await
        .unwrap();

    assert_eq!(completion.raw_text, "write my resume");
    assert!(completion.data.is_none());
}

#[tokio::test]
async fn json_output_is_parsed_into_data() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "claude", r#"printf '%s' '{"x":1}'"#);
    let provider = provider_for(Backend::Claude, script, 0);

    let completion = provider
        .execute(
            &GenerationRequest::new("return {\"x\":1}", OutputFormat::Json),
            &Operation::new(),
        )
        .await
        .unwrap();

    assert_eq!(completion.data.unwrap(), serde_json::json!({"x": 1}));
}

#[tokio::test]
async fn claude_envelope_with_fenced_payload_is_unwrapped() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        &dir,
        "claude",
        r#"printf '%s' '{"type":"result","result":"```json\n{\"a\":1}\n```"}'"#,
    );
    let provider = provider_for(Backend::Claude, script, 0);

    let completion = provider
        .execute(
            &GenerationRequest::new("anything", OutputFormat::Json),
            &Operation::new(),
        )
        .await
        .unwrap();

    assert_eq!(completion.data.unwrap(), serde_json::json!({"a": 1}));
}

#[tokio::test]
async fn unparseable_output_fails_without_retry() {
    let dir = TempDir::new().unwrap();
    let count_file = dir.path().join("attempts");
    let script = write_script(
        &dir,
        "claude",
        &format!(
            "echo run >> {}\nprintf '%s' 'no json here, sorry'",
            count_file.display()
        ),
    );
    let provider = provider_for(Backend::Claude, script, 5);

    let err = provider
        .execute_with_retry(
            &GenerationRequest::new("anything", OutputFormat::Json),
            &Operation::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), ProviderErrorCode::InvalidJson);
    let attempts = fs::read_to_string(&count_file).unwrap().lines().count();
    assert_eq!(attempts, 1);
}

#[tokio::test]
async fn rate_limited_failures_retry_with_backoff() {
    let dir = TempDir::new().unwrap();
    let count_file = dir.path().join("attempts");
    let script = write_script(
        &dir,
        "gemini",
        &format!(
            "echo run >> {}\necho 'rate limit exceeded' >&2\nexit 1",
            count_file.display()
        ),
    );
    let provider = provider_for(Backend::Gemini, script, 2);

    let start = Instant::now();
    let err = provider
        .execute_with_retry(
            &GenerationRequest::new("anything", OutputFormat::Text),
            &Operation::new(),
        )
        .await
        .unwrap_err();
    let elapsed = start.elapsed();

    assert_eq!(err.code(), ProviderErrorCode::RateLimited);
    // 1 initial + 2 retries, with ~1s then ~2s of backoff between them.
    let attempts = fs::read_to_string(&count_file).unwrap().lines().count();
    assert_eq!(attempts, 3);
    assert!(elapsed >= Duration::from_millis(2_900), "took {elapsed:?}");
    assert!(elapsed < Duration::from_secs(10), "took {elapsed:?}");
}

#[tokio::test]
async fn generic_backend_failure_never_retries() {
    let dir = TempDir::new().unwrap();
    let count_file = dir.path().join("attempts");
    let script = write_script(
        &dir,
        "codex",
        &format!(
            "echo run >> {}\necho 'model exploded' >&2\nexit 2",
            count_file.display()
        ),
    );
    let provider = provider_for(Backend::Codex, script, 5);

    let err = provider
        .execute_with_retry(
            &GenerationRequest::new("anything", OutputFormat::Text),
            &Operation::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), ProviderErrorCode::ProviderError);
    let attempts = fs::read_to_string(&count_file).unwrap().lines().count();
    assert_eq!(attempts, 1);
}

#[tokio::test]
async fn status_reports_version_from_the_probe() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        &dir,
        "codex",
        "if [ \"$1\" = \"--version\" ]; then echo 'fake-cli 1.2.3'; exit 0; fi\ncat",
    );
    let provider = provider_for(Backend::Codex, script, 0);

    let status = provider.status().await;
    assert!(status.available);
    assert_eq!(status.version.as_deref(), Some("fake-cli 1.2.3"));
    assert!(status.error.is_none());
}

#[tokio::test]
async fn status_reports_probe_failure_as_unavailable() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "codex", "echo 'broken install' >&2\nexit 1");
    let provider = provider_for(Backend::Codex, script, 0);

    let status = provider.status().await;
    assert!(!status.available);
    assert!(status.version.is_none());
    assert!(status.error.unwrap().contains("broken install"));
}

#[tokio::test]
async fn fallback_scan_skips_unavailable_default() {
    use tailorgen::provider::ProviderRegistry;

    let dir = TempDir::new().unwrap();
    let working = write_script(&dir, "gemini", "echo 'gemini 2.0'");
    let registry = ProviderRegistry::new("claude");
    registry
        .register(
            "claude",
            std::sync::Arc::new(provider_for(
                Backend::Claude,
                "/nonexistent/claude-cli".to_string(),
                0,
            )),
        )
        .await;
    registry
        .register(
            "gemini",
            std::sync::Arc::new(provider_for(Backend::Gemini, working, 0)),
        )
        .await;

    let fallback = registry.first_available().await.unwrap();
    assert_eq!(fallback.backend_name(), "gemini");

    let statuses = registry.check_all_availability().await;
    assert_eq!(statuses.len(), 2);
    assert!(!statuses[0].available);
    assert!(statuses[1].available);
}

#[tokio::test]
async fn custom_backend_runs_through_its_template() {
    let dir = TempDir::new().unwrap();
    // Prints its last argument, which the template makes the prompt.
    let script = write_script(&dir, "mycli", "for arg do last=$arg; done\nprintf '%s' \"$last\"");
    let backend = Backend::Custom(tailorgen::provider::CustomBackend {
        name: "mycli".to_string(),
        args: vec!["ask".to_string(), "{prompt}".to_string()],
        json_args: vec![],
        version_args: vec!["--version".to_string()],
        prompt_via_stdin: false,
    });
    let provider = provider_for(backend, script, 0);

    let completion = provider
        .execute(
            &GenerationRequest::new("hello there", OutputFormat::Text),
            &Operation::new(),
        )
        .await
        .unwrap();

    assert_eq!(completion.raw_text, "hello there");
}
