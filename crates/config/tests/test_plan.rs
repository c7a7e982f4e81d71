//! Test plan for the `lectern-config` crate.
//!
//! These tests exercise the configuration loader across default handling,
//! file discovery, environment overrides, and engine validation.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use lectern_config::{load, AppConfig, AuthConfig, EngineConfig, HttpConfig};

const ENV_VARS_TO_RESET: &[&str] = &[
    "LECTERN_CONFIG",
    "LECTERN__AUTH__SESSION_TTL_SECONDS",
    "LECTERN__AUTH__MIN_PASSWORD_LENGTH",
    "LECTERN__DATABASE__MAX_CONNECTIONS",
    "LECTERN__DATABASE__URL",
    "LECTERN__HTTP__ADDRESS",
    "LECTERN__HTTP__PORT",
    "LECTERN__ENGINE__LOCKOUT__MAX_FAILED_ATTEMPTS",
    "LECTERN__ENGINE__LOCKOUT__LOCKOUT_MINUTES",
    "LECTERN__ENGINE__PROGRESSION__PASS_SCORE",
    "LECTERN__ENGINE__PROGRESSION__TOTAL_LESSONS",
    "LECTERN__ENGINE__SUBSCRIPTION__EXPIRY_WARNING_DAYS",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(path, contents).expect("failed to write config file");
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.http.port, defaults.http.port);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(
        config.database.max_connections,
        defaults.database.max_connections
    );
    assert_eq!(config.auth.session_ttl_seconds, defaults.auth.session_ttl_seconds);
    assert_eq!(config.engine.lockout.max_failed_attempts, 5);
    assert_eq!(config.engine.lockout.lockout_minutes, 120);
    assert_eq!(config.engine.progression.pass_score, 70);
    assert_eq!(config.engine.progression.total_lessons, 35);
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "lectern.toml",
        r#"
        [http]
        port = 4242
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/lectern.toml",
        r#"
        [http]
        port = 5151
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.http.port, 4242);
}

#[test]
#[serial]
fn load_merges_partial_engine_section_with_defaults() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "lectern.toml",
        r#"
        [engine.progression]
        pass_score = 80

        [engine.lockout]
        lockout_minutes = 30
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = EngineConfig::default();

    assert_eq!(config.engine.progression.pass_score, 80);
    assert_eq!(
        config.engine.progression.total_lessons,
        defaults.progression.total_lessons
    );
    assert_eq!(config.engine.lockout.lockout_minutes, 30);
    assert_eq!(
        config.engine.lockout.max_failed_attempts,
        defaults.lockout.max_failed_attempts
    );
    assert_eq!(
        config.engine.engagement.max_comment_length,
        defaults.engagement.max_comment_length
    );
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "lectern.toml",
        r#"
        [http]
        port = 3030
        "#,
    );

    ctx.set_var("LECTERN__HTTP__PORT", "8080");
    ctx.set_var("LECTERN__ENGINE__LOCKOUT__MAX_FAILED_ATTEMPTS", "3");

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.http.port, 8080);
    assert_eq!(config.engine.lockout.max_failed_attempts, 3);
}

#[test]
#[serial]
fn load_reads_explicit_config_path() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "elsewhere/custom.toml",
        r#"
        [database]
        url = "sqlite://custom.db"
        "#,
    );
    ctx.set_var(
        "LECTERN_CONFIG",
        temp_dir.path().join("elsewhere/custom.toml").display().to_string(),
    );

    let config = load().expect("configuration load should read LECTERN_CONFIG");
    assert_eq!(config.database.url, "sqlite://custom.db");
}

#[test]
#[serial]
fn load_clamps_session_ttl_to_i64_maximum() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    let oversized = (i64::MAX as u128 + 42).to_string();
    ctx.set_var("LECTERN__AUTH__SESSION_TTL_SECONDS", &oversized);

    let config = load().expect("configuration load should succeed with oversized TTL");
    assert_eq!(
        config.auth.session_ttl_seconds,
        i64::MAX as u64,
        "session TTL should be clamped to i64::MAX"
    );
}

#[test]
#[serial]
fn load_rejects_pass_score_above_one_hundred() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "lectern.toml",
        r#"
        [engine.progression]
        pass_score = 101
        "#,
    );

    let error = load().expect_err("pass score above 100 should be rejected");
    assert!(error.to_string().contains("invalid engine configuration"));
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "lectern.toml",
        r#"
        [http]
        port = "not-a-number
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration") || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
fn auth_config_defaults_match_expected_values() {
    let defaults = AuthConfig::default();
    assert_eq!(defaults.session_ttl_seconds, 86_400);
    assert_eq!(defaults.min_password_length, 6);
}

#[test]
fn engine_config_rejects_zero_attempts() {
    let mut engine = EngineConfig::default();
    engine.lockout.max_failed_attempts = 0;
    assert!(engine.validate().is_err());
}

#[test]
fn http_config_defaults_match_expected_host_and_port() {
    let defaults = HttpConfig::default();
    assert_eq!(defaults.address, "127.0.0.1");
    assert_eq!(defaults.port, 7070);
}
