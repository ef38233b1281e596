//! Test fixtures and sample data
//!
//! Provides pre-built component configurations and templates for testing.

use cron_backup::config::ComponentConfig;
use std::path::Path;

fn component(kind: &str, params: toml::Table) -> ComponentConfig {
    ComponentConfig::new(kind, params)
}

fn path_value(path: &Path) -> toml::Value {
    // TOML strings need forward slashes on Windows
    toml::Value::String(path.to_string_lossy().replace('\\', "/"))
}

/// Single-file target
pub fn file_target(path: &Path) -> ComponentConfig {
    let mut params = toml::Table::new();
    params.insert("path".into(), path_value(path));
    component("file", params)
}

/// Directory archive target
pub fn directory_target(path: &Path) -> ComponentConfig {
    let mut params = toml::Table::new();
    params.insert("path".into(), path_value(path));
    component("directory", params)
}

/// PostgreSQL target pointing at a local test database
pub fn postgres_target() -> ComponentConfig {
    let mut params = toml::Table::new();
    params.insert("postgres_host".into(), "localhost".into());
    params.insert("postgres_db".into(), "testdb".into());
    params.insert("postgres_user".into(), "postgres".into());
    params.insert("postgres_password".into(), "testpass".into());
    component("postgresql", params)
}

/// Local directory storage
pub fn local_storage(path: &Path) -> ComponentConfig {
    let mut params = toml::Table::new();
    params.insert("backup_path".into(), path_value(path));
    component("local", params)
}

/// Telegram notifier with one plain chat and one reply target
pub fn telegram_notifier() -> ComponentConfig {
    let mut params = toml::Table::new();
    params.insert("bot_token".into(), "123:abc".into());
    params.insert(
        "chat_ids".into(),
        toml::Value::Array(vec![
            "1001".into(),
            toml::Value::Array(vec!["1002".into(), "17".into()]),
        ]),
    );
    component("telegram", params)
}

/// Environment of a flat single-job deployment
pub fn legacy_env() -> Vec<(&'static str, &'static str)> {
    vec![
        ("BACKUP_APP_NAME", "legacy"),
        ("BACKUP_CRON_EXPRESSION", "0 3 * * *"),
        ("BACKUP_POSTGRES_HOST", "db"),
        ("BACKUP_POSTGRES_PORT", "5432"),
        ("BACKUP_POSTGRES_DB", "app"),
        ("BACKUP_POSTGRES_USER", "postgres"),
        ("BACKUP_POSTGRES_PASSWORD", "secret"),
        ("BACKUP_PATH", "/backups"),
    ]
}

/// Minimal valid config TOML template
pub fn minimal_config_toml() -> &'static str {
    r#"
[global]
app_name = "myapp"
schedule = "0 3 * * *"
log_directory = "{log_dir}"

[jobs.svc1]
target = { type = "file", params = { path = "{source_file}" } }
storages = [ { type = "local", params = { backup_path = "{backup_path}" } } ]
"#
}

/// Render a template by replacing `{key}` placeholders
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{}}}", key), value);
    }
    result
}
