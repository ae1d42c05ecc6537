//! Health check endpoint.

use actix_web::{HttpResponse, web};
use serde::Serialize;

use postflow_core::ports::QueueStats;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    /// Absent when the queue backend cannot be reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<QueueStats>,
}

/// Health check endpoint - returns server status and job queue counters.
///
/// GET /health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let jobs = match state.jobs.stats().await {
        Ok(stats) => Some(stats),
        Err(e) => {
            tracing::warn!("Job queue stats unavailable: {}", e);
            None
        }
    };

    let response = HealthResponse {
        status: if jobs.is_some() { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        jobs,
    };

    HttpResponse::Ok().json(response)
}
