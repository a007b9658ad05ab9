use atelier_core::config::{AppConfig, ConfigError};
use atelier_core::{InquiryService, ProposalService};
use atelier_db::{connect_with_settings, migrations, DbPool, SqlStore};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub inquiries: InquiryService<SqlStore>,
    pub proposals: ProposalService<SqlStore>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

#[cfg(test)]
pub async fn bootstrap(
    options: atelier_core::config::LoadOptions,
) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Connects, migrates and wires the lifecycle services for an already loaded config.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        database_url = %config.database.url,
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let store = SqlStore::new(db_pool.clone());
    Ok(Application {
        inquiries: InquiryService::new(store.clone()),
        proposals: ProposalService::new(store, config.proposals.clone()),
        config,
        db_pool,
    })
}

#[cfg(test)]
mod tests {
    use atelier_core::config::{ConfigOverrides, LoadOptions};
    use atelier_core::domain::inquiry::{InquiryInput, InquiryStatus};
    use atelier_core::domain::proposal::{LineItemInput, PackageInput, ProposalDraft};
    use atelier_core::StatusChange;

    use crate::bootstrap::bootstrap;

    #[tokio::test]
    async fn bootstrap_fails_fast_on_invalid_proposal_currency() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                default_currency: Some("dollars".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("proposals.default_currency"));
    }

    #[tokio::test]
    async fn bootstrapped_services_share_the_migrated_database() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                default_expiry_days: Some(10),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
             ('inquiry', 'proposal', 'proposal_package', 'proposal_line_item', 'activity_log')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected pipeline tables to be available after bootstrap");
        assert_eq!(table_count, 5);

        let inquiry = app
            .inquiries
            .create_inquiry(
                InquiryInput {
                    contact_name: "Priya Natarajan".to_string(),
                    contact_email: "Priya@Example.com".to_string(),
                    event_type: "Engagement Party".to_string(),
                    ..InquiryInput::default()
                },
                None,
            )
            .await
            .expect("inquiry should be created");
        let moved = app
            .inquiries
            .change_status(&inquiry.id, InquiryStatus::InReview, StatusChange::default())
            .await
            .expect("NEW -> IN_REVIEW is allowed")
            .expect("inquiry exists");
        assert_eq!(moved.status, InquiryStatus::InReview);

        let proposal = app
            .proposals
            .create_proposal(
                &inquiry.id,
                ProposalDraft {
                    packages: vec![PackageInput {
                        name: "Classic".to_string(),
                        description: None,
                        currency: None,
                        items: vec![LineItemInput {
                            title: "Table florals".to_string(),
                            description: None,
                            quantity: 12,
                            unit_cents: 8_500,
                        }],
                    }],
                    expires_in_days: None,
                },
                None,
            )
            .await
            .expect("proposal should be created")
            .expect("inquiry exists");
        assert_eq!(proposal.version, 1);
        assert_eq!(proposal.amount_due(), Some(102_000));
        assert_eq!(proposal.packages[0].currency, "USD");
        let expires_at = proposal.expires_at.expect("default expiry applies");
        assert_eq!((expires_at - proposal.created_at).num_days(), 10);

        app.db_pool.close().await;
    }
}
