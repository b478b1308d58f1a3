use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

const ENV_VARS: [&str; 17] = [
    "LM_PROVIDER",
    "LM_MODEL",
    "LM_TOKEN",
    "LM_BASE_URL",
    "LM_TEMPERATURE",
    "LM_MAX_TOKENS",
    "LM_TIMEOUT",
    "LM_RETRIES",
    "LM_RETRY_DELAY",
    "ANTHROPIC_API_KEY",
    "OPENAI_API_KEY",
    "FIREWORKS_API_KEY",
    "OCL_TOKEN",
    "OCL_URL",
    "OCLCHAT_CONFIG",
    "OCLCHAT_LOG_FORMAT",
    "RUST_LOG",
];

fn clean(mut cmd: Command) -> Command {
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn oclask_cmd() -> Command {
    clean(Command::new(assert_cmd::cargo::cargo_bin!("oclask")))
}

fn oclchat_cmd() -> Command {
    clean(Command::new(assert_cmd::cargo::cargo_bin!("oclchat")))
}

fn unique_temp_path(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("oclask-test-{label}-{nanos}"))
}

fn parse_stdout_json(output: &[u8]) -> Value {
    let text = String::from_utf8(output.to_vec()).expect("stdout should be utf-8");
    serde_json::from_str(text.trim()).expect("stdout should contain valid JSON")
}

#[test]
fn dry_run_succeeds_without_api_key() {
    let assert = oclask_cmd()
        .args(["--provider", "openai", "--model", "gpt-4o-mini", "--dry-run", "fever"])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["dry_run"], Value::Bool(true));
    assert_eq!(body["provider"], "openai");
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["ocl_url"], "http://api.openconceptlab.org/");
    assert_eq!(body["tools"].as_array().map(Vec::len), Some(16));
    assert_eq!(body["max_tool_rounds"], 4);
}

#[test]
fn missing_model_returns_explicit_error() {
    oclask_cmd()
        .arg("hello")
        .assert()
        .failure()
        .stderr(contains("No model provided. Use --model or set LM_MODEL."));
}

#[test]
fn invalid_provider_from_env_returns_error() {
    oclask_cmd()
        .env("LM_PROVIDER", "bad")
        .args(["--model", "x", "hello"])
        .assert()
        .failure()
        .stderr(contains(
            "Invalid LM_PROVIDER 'bad'. Supported values: anthropic, openai, fireworks.",
        ));
}

#[test]
fn missing_api_key_is_reported_before_any_request() {
    oclask_cmd()
        .args(["--provider", "fireworks", "--model", "m", "hello"])
        .assert()
        .failure()
        .stderr(contains(
            "No API key provided for fireworks. Set LM_TOKEN or FIREWORKS_API_KEY.",
        ));
}

#[test]
fn argument_prompt_has_priority_over_stdin() {
    let assert = oclask_cmd()
        .args(["--model", "claude-test", "--dry-run", "argument prompt"])
        .write_stdin("stdin prompt")
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    let messages = body["messages"].as_array().expect("messages should be an array");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(messages[1]["content"], "argument prompt");
}

#[test]
fn prompt_is_read_from_stdin() {
    let assert = oclask_cmd()
        .args(["--model", "claude-test", "--dry-run"])
        .write_stdin("stdin prompt\n")
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["messages"][1]["content"], "stdin prompt");
}

#[test]
fn tool_selection_is_validated() {
    let assert = oclask_cmd()
        .args([
            "--model",
            "claude-test",
            "--tools",
            "search_concepts,match_concepts",
            "--dry-run",
            "fever",
        ])
        .assert()
        .success();
    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["tools"], json!(["search_concepts", "match_concepts"]));

    oclask_cmd()
        .args(["--model", "claude-test", "--tools", "search_everything", "--dry-run", "x"])
        .assert()
        .failure()
        .stderr(contains("unknown tool 'search_everything'"));
}

#[test]
fn ocl_url_alias_is_resolved() {
    let assert = oclask_cmd()
        .env("OCL_URL", "staging")
        .args(["--model", "claude-test", "--dry-run", "fever"])
        .assert()
        .success();
    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["ocl_url"], "https://api.staging.openconceptlab.org/");
}

#[test]
fn profile_loads_provider_and_model_for_dry_run() {
    let config_path = unique_temp_path("config");
    fs::write(
        &config_path,
        "[profiles.fw]\nprovider = \"fireworks\"\n\
         model = \"accounts/fireworks/models/kimi-k2-instruct-0905\"\nocl_url = \"local\"\n",
    )
    .expect("config should be writable");

    let assert = oclask_cmd()
        .env("OCLCHAT_CONFIG", &config_path)
        .args(["--profile", "fw", "--dry-run", "hello"])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["provider"], "fireworks");
    assert_eq!(body["model"], "accounts/fireworks/models/kimi-k2-instruct-0905");
    assert_eq!(body["ocl_url"], "http://api.ocl.localhost");
}

#[test]
fn profile_is_not_implicit_when_not_passed() {
    let config_path = unique_temp_path("config-no-implicit");
    fs::write(&config_path, "[profiles.default]\nmodel = \"m\"\n")
        .expect("config should be writable");

    oclask_cmd()
        .env("OCLCHAT_CONFIG", &config_path)
        .arg("hello")
        .assert()
        .failure()
        .stderr(contains("No model provided. Use --model or set LM_MODEL."));
}

#[test]
fn precedence_for_temperature_and_timeout_is_respected() {
    let config_path = unique_temp_path("precedence");
    fs::write(
        &config_path,
        "[profiles.fw]\nprovider = \"fireworks\"\nmodel = \"m\"\ntemperature = 0.1\ntimeout = 7\n",
    )
    .expect("config should be writable");

    let env_over_profile = oclask_cmd()
        .env("OCLCHAT_CONFIG", &config_path)
        .env("LM_TEMPERATURE", "0.5")
        .env("LM_TIMEOUT", "21")
        .args(["--profile", "fw", "--dry-run", "hello"])
        .assert()
        .success();
    let env_body = parse_stdout_json(&env_over_profile.get_output().stdout);
    assert_eq!(env_body["request"]["temperature"], json!(0.5));
    assert_eq!(env_body["request"]["timeout_secs"], Value::from(21));

    let cli_over_env = oclask_cmd()
        .env("OCLCHAT_CONFIG", &config_path)
        .env("LM_TEMPERATURE", "0.5")
        .env("LM_TIMEOUT", "21")
        .args(["--profile", "fw", "--dry-run", "--temperature", "1.25", "--timeout", "33", "hello"])
        .assert()
        .success();
    let cli_body = parse_stdout_json(&cli_over_env.get_output().stdout);
    assert_eq!(cli_body["request"]["temperature"], json!(1.25));
    assert_eq!(cli_body["request"]["timeout_secs"], Value::from(33));
}

#[test]
fn invalid_numeric_env_names_the_variable() {
    oclask_cmd()
        .env("LM_MAX_TOKENS", "lots")
        .args(["--model", "m", "--dry-run", "hello"])
        .assert()
        .failure()
        .stderr(contains("Invalid LM_MAX_TOKENS 'lots'."));
}

#[test]
fn verbose_does_not_leak_secrets() {
    let secret = "anthropic-secret-value";
    let token = "ocl-secret-token";

    oclask_cmd()
        .env("ANTHROPIC_API_KEY", secret)
        .env("OCL_TOKEN", token)
        .args(["--model", "claude-test", "--dry-run", "--verbose", "hello"])
        .assert()
        .success()
        .stderr(
            contains("api_key_present=true")
                .and(contains("ocl_token_present=true"))
                .and(contains(secret).not())
                .and(contains(token).not()),
        )
        .stdout(contains(secret).not().and(contains(token).not()));
}

#[test]
fn json_flag_sets_json_output_mode() {
    let assert = oclask_cmd()
        .args(["--model", "claude-test", "--dry-run", "--json", "hello"])
        .assert()
        .success();
    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["output"], "json");
}

#[test]
fn config_check_reports_valid_file() {
    let config_path = unique_temp_path("config-check");
    fs::write(&config_path, "[profiles.fw]\nprovider = \"fireworks\"\n")
        .expect("config should be writable");

    oclchat_cmd()
        .env("OCLCHAT_CONFIG", &config_path)
        .args(["config", "check", "--profile", "fw"])
        .assert()
        .success()
        .stdout(contains("config OK"));
}

#[test]
fn config_check_rejects_unknown_provider() {
    let config_path = unique_temp_path("config-bad-provider");
    fs::write(&config_path, "[profiles.x]\nprovider = \"mystery\"\n")
        .expect("config should be writable");

    oclchat_cmd()
        .env("OCLCHAT_CONFIG", &config_path)
        .args(["config", "check"])
        .assert()
        .failure()
        .stderr(contains("Profile 'x': Unsupported provider 'mystery'"));
}

#[test]
fn config_check_reports_missing_profile() {
    let config_path = unique_temp_path("config-missing-profile");
    fs::write(&config_path, "[profiles.fw]\nmodel = \"m\"\n").expect("config should be writable");

    oclchat_cmd()
        .env("OCLCHAT_CONFIG", &config_path)
        .args(["config", "check", "--profile", "nope"])
        .assert()
        .failure()
        .stderr(contains("Profile 'nope' not found"));
}

#[test]
fn tools_json_lists_catalogue() {
    let assert = oclchat_cmd().args(["tools", "--json"]).assert().success();
    let body = parse_stdout_json(&assert.get_output().stdout);
    let tools = body.as_array().expect("tools should be an array");
    assert_eq!(tools.len(), 16);
    assert!(tools.iter().any(|tool| tool["id"] == "bulk_map_terms"));
}

#[test]
fn completion_generates_script() {
    oclchat_cmd()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(contains("oclchat"));
}
