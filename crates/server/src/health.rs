use atelier_core::{InquiryService, InquiryStatus};
use atelier_db::{DbPool, SqlStore};
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    inquiries: InquiryService<SqlStore>,
}

impl HealthState {
    pub fn new(db_pool: DbPool, inquiries: InquiryService<SqlStore>) -> Self {
        Self { db_pool, inquiries }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub database: HealthCheck,
    pub pipeline: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn spawn(bind_address: &str, port: u16, state: HealthState) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(state)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let pipeline = pipeline_check(&state.inquiries).await;
    let ready = database.status == "ready" && pipeline.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "atelier-server runtime initialized".to_string(),
        },
        database,
        pipeline,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

/// Reads the pipeline through the inquiry service so a broken schema shows up here.
async fn pipeline_check(inquiries: &InquiryService<SqlStore>) -> HealthCheck {
    match inquiries.list_inquiries().await {
        Ok(all) => {
            let open = all.iter().filter(|inquiry| !inquiry.status.is_terminal()).count();
            let new = all.iter().filter(|inquiry| inquiry.status == InquiryStatus::New).count();
            HealthCheck {
                status: "ready",
                detail: format!("{} inquiries tracked, {open} open, {new} new", all.len()),
            }
        }
        Err(error) => {
            let interface = error.into_interface("health");
            HealthCheck { status: "degraded", detail: interface.user_message().to_string() }
        }
    }
}

#[cfg(test)]
mod tests {
    use atelier_core::domain::inquiry::InquiryInput;
    use atelier_core::InquiryService;
    use atelier_db::{connect_with_settings, migrations, DbPool, SqlStore};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use axum::{extract::State, http::StatusCode, Json};
    use tower::ServiceExt;

    use crate::health::{health, router, HealthState};

    async fn migrated_pool() -> DbPool {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        migrations::run_pending(&pool).await.expect("migrations should apply");
        pool
    }

    fn state(pool: &DbPool) -> HealthState {
        HealthState::new(pool.clone(), InquiryService::new(SqlStore::new(pool.clone())))
    }

    #[tokio::test]
    async fn health_returns_ready_when_database_is_reachable() {
        let pool = migrated_pool().await;
        let service = InquiryService::new(SqlStore::new(pool.clone()));
        service
            .create_inquiry(
                InquiryInput {
                    contact_name: "Lena Hoffmann".to_string(),
                    contact_email: "lena@example.com".to_string(),
                    event_type: "Anniversary".to_string(),
                    ..InquiryInput::default()
                },
                None,
            )
            .await
            .expect("inquiry should be created");

        let (status, Json(payload)) = health(State(state(&pool))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.database.status, "ready");
        assert_eq!(payload.pipeline.detail, "1 inquiries tracked, 1 open, 1 new");
        assert_eq!(payload.service.status, "ready");

        pool.close().await;
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_database_is_unavailable() {
        let pool = migrated_pool().await;
        let state = state(&pool);
        pool.close().await;

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.database.status, "degraded");
        assert_eq!(payload.pipeline.status, "degraded");
        assert_eq!(
            payload.pipeline.detail,
            "The service is temporarily unavailable. Please retry shortly."
        );
        assert_eq!(payload.service.status, "ready");
    }

    #[tokio::test]
    async fn health_route_serves_json() {
        let pool = migrated_pool().await;

        let response = router(state(&pool))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("router should respond");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(payload["status"], "ready");
        assert_eq!(payload["pipeline"]["detail"], "0 inquiries tracked, 0 open, 0 new");

        pool.close().await;
    }
}
