use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use atelier_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILE};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for reported in effective_values(&config) {
        let source = field_source(
            reported.key_path,
            reported.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(reported.key_path, &reported.value, source));
    }

    lines.join("\n")
}

struct ReportedValue {
    key_path: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

/// Every reported key with its effective value and the env keys that can set it, in
/// lookup order.
fn effective_values(config: &AppConfig) -> Vec<ReportedValue> {
    vec![
        ReportedValue {
            key_path: "database.url",
            value: config.database.url.clone(),
            env_keys: &["ATELIER_DATABASE_URL"],
        },
        ReportedValue {
            key_path: "database.max_connections",
            value: config.database.max_connections.to_string(),
            env_keys: &["ATELIER_DATABASE_MAX_CONNECTIONS"],
        },
        ReportedValue {
            key_path: "database.timeout_secs",
            value: config.database.timeout_secs.to_string(),
            env_keys: &["ATELIER_DATABASE_TIMEOUT_SECS"],
        },
        ReportedValue {
            key_path: "server.bind_address",
            value: config.server.bind_address.clone(),
            env_keys: &["ATELIER_SERVER_BIND_ADDRESS"],
        },
        ReportedValue {
            key_path: "server.health_check_port",
            value: config.server.health_check_port.to_string(),
            env_keys: &["ATELIER_SERVER_HEALTH_CHECK_PORT"],
        },
        ReportedValue {
            key_path: "server.graceful_shutdown_secs",
            value: config.server.graceful_shutdown_secs.to_string(),
            env_keys: &["ATELIER_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        },
        ReportedValue {
            key_path: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["ATELIER_LOGGING_LEVEL", "ATELIER_LOG_LEVEL"],
        },
        ReportedValue {
            key_path: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["ATELIER_LOGGING_FORMAT", "ATELIER_LOG_FORMAT"],
        },
        ReportedValue {
            key_path: "proposals.default_expiry_days",
            value: config.proposals.default_expiry_days.to_string(),
            env_keys: &["ATELIER_PROPOSALS_DEFAULT_EXPIRY_DAYS"],
        },
        ReportedValue {
            key_path: "proposals.default_currency",
            value: config.proposals.default_currency.clone(),
            env_keys: &["ATELIER_PROPOSALS_DEFAULT_CURRENCY"],
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{contains_path, field_source, render_line};

    #[test]
    fn nested_keys_resolve_through_tables() {
        let doc: toml::Value = "[proposals]\ndefault_currency = \"EUR\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "proposals.default_currency"));
        assert!(!contains_path(&doc, "proposals.default_expiry_days"));
        assert!(!contains_path(&doc, "database.url"));
    }

    #[test]
    fn file_source_names_the_config_path() {
        let doc: toml::Value = "[database]\nurl = \"sqlite://x.db\"\n".parse().expect("toml");
        let source = field_source(
            "database.url",
            &["ATELIER_TEST_UNSET_KEY"],
            Some(&doc),
            Some(Path::new("config/atelier.toml")),
        );
        assert_eq!(source, "file (config/atelier.toml)");
        assert_eq!(
            field_source("database.timeout_secs", &[], Some(&doc), None),
            "default".to_string()
        );
    }

    #[test]
    fn lines_render_key_value_and_source() {
        assert_eq!(
            render_line("logging.level", "debug", "env (ATELIER_LOG_LEVEL)".to_string()),
            "- logging.level = debug (source: env (ATELIER_LOG_LEVEL))"
        );
    }
}
