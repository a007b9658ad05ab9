pub mod config;
pub mod doctor;
pub mod inquiry;
pub mod migrate;
pub mod proposal;
pub mod seed;

use std::fs;
use std::future::Future;
use std::path::Path;

use anyhow::Context;
use atelier_core::config::{AppConfig, LoadOptions};
use atelier_core::errors::{ApplicationError, DomainError};
use atelier_core::{InquiryService, ProposalService};
use atelier_db::{connect_with_settings, migrations, SqlStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::with_data(command, message, None)
    }

    pub fn with_data(command: &str, message: impl Into<String>, data: Option<Value>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\
             \"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Error class, message and process exit code of a failed command.
pub(crate) type Failure = (&'static str, String, u8);

/// Services bound to the configured database.
pub(crate) struct Services {
    pub inquiries: InquiryService<SqlStore>,
    pub proposals: ProposalService<SqlStore>,
}

/// Loads config, opens the database (applying pending migrations) and runs `task` against
/// the lifecycle services. The task yields the success message and optional data.
pub(crate) fn with_services<F, Fut>(command: &str, task: F) -> CommandResult
where
    F: FnOnce(Services) -> Fut,
    Fut: Future<Output = Result<(String, Option<Value>), Failure>>,
{
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let store = SqlStore::new(pool.clone());
        let services = Services {
            inquiries: InquiryService::new(store.clone()),
            proposals: ProposalService::new(store, config.proposals.clone()),
        };
        let outcome = task(services).await;

        pool.close().await;
        outcome
    });

    match result {
        Ok((message, data)) => CommandResult::with_data(command, message, data),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure(command, error_class, message, exit_code)
        }
    }
}

pub(crate) fn application_failure(error: ApplicationError) -> Failure {
    match &error {
        ApplicationError::Domain(DomainError::Transition(_)) => {
            ("invalid_transition", error.to_string(), 8)
        }
        ApplicationError::Domain(_) => ("invalid_input", error.to_string(), 8),
        ApplicationError::Storage(_) => ("storage", error.to_string(), 9),
        ApplicationError::Configuration(_) => ("config_validation", error.to_string(), 2),
    }
}

pub(crate) fn not_found(kind: &str, id: &str) -> Failure {
    ("not_found", format!("{kind} `{id}` was not found"), 7)
}

pub(crate) fn invalid_argument(message: impl Into<String>) -> Failure {
    ("invalid_input", message.into(), 8)
}

pub(crate) fn to_data<T: Serialize>(value: &T) -> Result<Option<Value>, Failure> {
    serde_json::to_value(value)
        .map(Some)
        .map_err(|error| ("serialization", error.to_string(), 10))
}

pub(crate) fn read_json_file<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read `{}`", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("could not parse `{}` as JSON", path.display()))
}
