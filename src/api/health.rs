/// Readiness probe
///
/// `/health` only says the process is up; `/health/ready` also checks that
/// the database and media storage answer.
use crate::{context::AppContext, db};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// "healthy" or "unhealthy"
    pub status: String,
    pub version: String,
    pub checks: Vec<ComponentHealth>,
}

/// Health status of individual component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    fn from_result<E: std::fmt::Display>(name: &str, started: Instant, result: Result<(), E>) -> Self {
        let response_time_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(()) => Self {
                name: name.to_string(),
                status: "healthy".to_string(),
                response_time_ms,
                error: None,
            },
            Err(e) => {
                tracing::warn!("Readiness check {} failed: {}", name, e);
                Self {
                    name: name.to_string(),
                    status: "unhealthy".to_string(),
                    response_time_ms,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/health/ready", get(readiness))
}

async fn readiness(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthStatus>) {
    let started = Instant::now();
    let database = ComponentHealth::from_result("database", started, db::test_connection(&ctx.db).await);

    let started = Instant::now();
    let media = ComponentHealth::from_result("media", started, ctx.media.health_check().await);

    let checks = vec![database, media];
    let healthy = checks.iter().all(ComponentHealth::is_healthy);

    let status = HealthStatus {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        version: ctx.config.service.version.clone(),
        checks,
    };

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(status))
}
