//! Unit tests for configuration loading and validation
//!
//! These tests verify config parsing, validation, environment overrides and
//! job resolution. Every test touching `load_config` is serialized because
//! the loader reads `BACKUP_*` variables from the process environment.

use cron_backup::config::{
    find_job, load_config, load_config_from_str, resolve_jobs, ConfigError, LEGACY_JOB_NAME,
};
use cron_backup::managers::builder::JobBuilder;
use rstest::rstest;
use serial_test::serial;
use std::env;
use test_utils::{legacy_env, minimal_config_toml, render_template, ConfigBuilder, TestContext};

/// Sets environment variables for the lifetime of the guard
struct EnvGuard {
    names: Vec<String>,
}

impl EnvGuard {
    fn set(vars: &[(&str, &str)]) -> Self {
        for (name, value) in vars {
            env::set_var(name, value);
        }
        Self {
            names: vars.iter().map(|(name, _)| name.to_string()).collect(),
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for name in &self.names {
            env::remove_var(name);
        }
    }
}

#[test]
#[serial]
fn test_config_loading_valid() {
    let (config_path, _, _temp_dir) = ConfigBuilder::minimal().write();

    let loaded = load_config(&config_path);
    assert!(loaded.is_ok(), "Config should load successfully: {:?}", loaded.err());

    let config = loaded.unwrap();
    assert!(config.jobs.contains_key("svc1"));
    assert_eq!(config.global.poll_interval_seconds, 1);
}

#[test]
#[serial]
fn test_config_loading_from_template() {
    let ctx = TestContext::new();
    let source = ctx.create_file("data/a.txt", "hello");
    let backups = ctx.create_subdir("backups");
    let logs = ctx.create_subdir("logs");

    // Convert Windows backslashes to forward slashes for TOML compatibility
    let log_dir = logs.to_string_lossy().replace('\\', "/");
    let source_file = source.to_string_lossy().replace('\\', "/");
    let backup_path = backups.to_string_lossy().replace('\\', "/");

    let contents = render_template(
        minimal_config_toml(),
        &[
            ("log_dir", log_dir.as_str()),
            ("source_file", source_file.as_str()),
            ("backup_path", backup_path.as_str()),
        ],
    );
    let config_path = ctx.create_file("config.toml", &contents);

    let config = load_config(&config_path).unwrap();
    let jobs = resolve_jobs(&config).unwrap();

    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].name, "svc1");
    assert_eq!(jobs[0].namespace.as_deref(), Some("svc1"));
    assert_eq!(jobs[0].schedule, "0 3 * * *");
}

#[test]
#[serial]
fn test_config_missing_file() {
    let result = load_config("/nonexistent/cron-backup.toml");
    assert!(matches!(result, Err(ConfigError::ReadError(_))));
}

#[test]
#[serial]
fn test_config_invalid_toml() {
    let result = load_config_from_str("invalid { toml content");
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
#[serial]
fn test_config_missing_app_name() {
    let result = load_config_from_str(
        r#"
[global]
schedule = "0 3 * * *"
"#,
    );
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

#[rstest]
#[case("invalid-cron")]
#[case("* * * *")]
#[case("61 * * * *")]
#[case("0 0 0 * * * * *")]
#[serial]
fn test_config_with_invalid_cron(#[case] schedule: &str) {
    let (config_path, _, _temp_dir) = ConfigBuilder::minimal()
        .with_job_schedule("svc1", schedule)
        .write();

    let result = load_config(&config_path);
    assert!(
        matches!(result, Err(ConfigError::ValidationError(_))),
        "'{}' should be rejected",
        schedule
    );
}

#[rstest]
#[case("*/15 * * * *")]
#[case("0 */5 * * * *")]
#[case("0 0 12 1 1 * 2099")]
#[serial]
fn test_config_accepts_cron_field_counts(#[case] schedule: &str) {
    let (config_path, _, _temp_dir) = ConfigBuilder::minimal()
        .with_job_schedule("svc1", schedule)
        .write();

    let config = load_config(&config_path).unwrap();
    assert_eq!(resolve_jobs(&config).unwrap()[0].schedule, schedule);
}

#[rstest]
#[case("target", r#"target = { type = "mysql" }"#)]
#[case("storage", r#"target = { type = "file", params = { path = "/a" } }
storages = [ { type = "ftp" } ]"#)]
#[case("notifier", r#"target = { type = "file", params = { path = "/a" } }
notifiers = [ { type = "discord" } ]"#)]
#[serial]
fn test_config_unknown_type(#[case] kind: &str, #[case] job: &str) {
    let contents = format!(
        r#"
[global]
app_name = "myapp"
schedule = "0 3 * * *"

[jobs.svc1]
{}
"#,
        job
    );

    match load_config_from_str(&contents) {
        Err(ConfigError::UnknownType { kind: actual, .. }) => assert_eq!(actual, kind),
        other => panic!("expected UnknownType, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_env_overrides_global_values() {
    let _env = EnvGuard::set(&[
        ("BACKUP_APP_NAME", "shop"),
        ("BACKUP_CRON_EXPRESSION", "*/10 * * * *"),
    ]);
    let (config_path, _, _temp_dir) = ConfigBuilder::minimal().write();

    let config = load_config(&config_path).unwrap();

    assert_eq!(config.global.app_name, "shop");
    assert_eq!(resolve_jobs(&config).unwrap()[0].schedule, "*/10 * * * *");
}

#[test]
#[serial]
fn test_legacy_environment_builds_single_job() {
    let _env = EnvGuard::set(&legacy_env());

    let config = load_config_from_str("").unwrap();
    let jobs = resolve_jobs(&config).unwrap();

    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].name, LEGACY_JOB_NAME);
    assert_eq!(jobs[0].namespace, None);
    assert_eq!(jobs[0].schedule, "0 3 * * *");

    let job = JobBuilder::new(&config).build(&jobs[0]).unwrap();
    assert_eq!(job.app_name(), "legacy");
    assert_eq!(job.namespace(), None);
    assert_eq!(job.naming().prefix(), "legacy");
    assert_eq!(job.storage_descriptions(), vec!["(Local directory path: /backups)"]);
    assert!(job.notifier_names().is_empty());
}

#[test]
#[serial]
fn test_legacy_environment_missing_variable() {
    let _env = EnvGuard::set(&[
        ("BACKUP_APP_NAME", "legacy"),
        ("BACKUP_CRON_EXPRESSION", "0 3 * * *"),
    ]);

    let config = load_config_from_str("").unwrap();
    let result = resolve_jobs(&config);

    assert!(matches!(result, Err(ConfigError::MissingVariable(_))));
}

#[test]
#[serial]
fn test_find_job() {
    let (config_path, _, _temp_dir) = ConfigBuilder::minimal().add_file_job("svc2", "x").write();
    let config = load_config(&config_path).unwrap();

    assert_eq!(find_job(&config, "svc2").unwrap().name, "svc2");
    assert!(matches!(
        find_job(&config, "missing"),
        Err(ConfigError::JobNotFound(name)) if name == "missing"
    ));
}

#[test]
#[serial]
fn test_retry_sections() {
    let config = load_config_from_str(
        r#"
[global]
app_name = "myapp"
schedule = "0 3 * * *"

[retry.job]
attempts = 3
sleep_seconds = 1

[jobs.svc1]
target = { type = "file", params = { path = "/a" } }
"#,
    )
    .unwrap();

    let layers = config.retry.layers();
    assert_eq!(layers.job.attempts(), 3);
    assert_eq!(layers.storage.attempts(), 2);
    assert_eq!(layers.notifier.attempts(), 3);
}
