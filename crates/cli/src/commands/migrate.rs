use crate::commands::CommandResult;
use atelier_core::config::{AppConfig, LoadOptions};
use atelier_db::{connect_with_settings, migrations, DbPool};
use serde_json::json;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
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
                "migrate",
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
        let before = applied_versions(&pool).await;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        let after = applied_versions(&pool).await;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>((before.len(), after))
    });

    match result {
        Ok((previously_applied, applied)) => {
            let newly_applied = applied.len().saturating_sub(previously_applied);
            let message = format!(
                "applied {newly_applied} pending migrations ({} total)",
                applied.len()
            );
            CommandResult::with_data("migrate", message, Some(json!({ "applied": applied })))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}

/// Versions recorded by the migrator; empty before the first run.
async fn applied_versions(pool: &DbPool) -> Vec<i64> {
    sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .unwrap_or_default()
}
