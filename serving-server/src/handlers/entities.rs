//! Entity handlers

use axum::{
    extract::{Path, State},
    Json,
};

use crate::models::{EntityResponse, PredictResponse};
use crate::{AppResult, AppState};

/// Stored features of one passenger
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<EntityResponse>> {
    let features = state.ctx.entity_features(&id).await?;
    Ok(Json(EntityResponse {
        entity_id: id,
        features,
    }))
}

/// Predict from the stored features of one passenger
pub async fn predict(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PredictResponse>> {
    let prediction = state.ctx.predict_entity(&id).await?;
    Ok(Json(PredictResponse::new(Some(id), &prediction)))
}
