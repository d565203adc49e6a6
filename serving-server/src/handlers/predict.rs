//! Prediction handlers

use std::collections::BTreeMap;

use axum::{extract::State, Form, Json};
use serde_json::Value;

use crate::models::PredictResponse;
use crate::{AppResult, AppState};

/// Predict from a JSON body of raw passenger fields
pub async fn predict(
    State(state): State<AppState>,
    Json(fields): Json<BTreeMap<String, Value>>,
) -> AppResult<Json<PredictResponse>> {
    let prediction = state.ctx.predict_fields(&fields)?;
    Ok(Json(PredictResponse::new(None, &prediction)))
}

/// Same as `predict`, for HTML form posts; every value arrives as text
pub async fn predict_form(
    State(state): State<AppState>,
    Form(form): Form<BTreeMap<String, String>>,
) -> AppResult<Json<PredictResponse>> {
    let fields: BTreeMap<String, Value> = form
        .into_iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(k, v)| (k, Value::String(v)))
        .collect();

    let prediction = state.ctx.predict_fields(&fields)?;
    Ok(Json(PredictResponse::new(None, &prediction)))
}
