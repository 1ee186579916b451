use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;

use wg_core::services::admission::{AdmissionStats, CircuitSnapshot, CircuitState};
use wg_shared::ApiResponse;

use crate::app::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
    pub admission: AdmissionStats,
    pub circuits: Vec<CircuitSnapshot>,
    pub tracked_login_sources: usize,
}

/// Handler for GET /health
///
/// Reports `degraded` while any protected dependency has an open circuit.
/// Sits outside admission control so it answers under load.
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let circuits = state.breakers.snapshots();
    let degraded = circuits
        .iter()
        .any(|circuit| circuit.state == CircuitState::Open);

    HttpResponse::Ok().json(ApiResponse::success(HealthResponse {
        status: if degraded { "degraded" } else { "healthy" },
        service: "wardgate",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
        admission: state.admission.stats(),
        circuits,
        tracked_login_sources: state.tracker.tracked_sources(),
    }))
}
