//! Health check handler

use axum::{extract::State, Json};

use crate::models::HealthResponse;
use crate::AppState;

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_reachable = match state.ctx.store().ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Feature store ping failed: {}", e);
            false
        }
    };

    Json(HealthResponse {
        status: if store_reachable { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        store_reachable,
        context: state.ctx.info(),
    })
}
