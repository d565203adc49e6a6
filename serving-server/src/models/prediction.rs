//! Prediction API payloads

use std::collections::BTreeMap;

use feature_core::logic::serving::ContextInfo;
use feature_core::{FeatureMap, Prediction};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PredictResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    pub prediction: u8,
    pub survived: bool,
    pub probability: f64,
    pub is_drift: bool,
    /// Per-feature KS p-values; absent when the drift check was skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift_p_values: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift_threshold: Option<f64>,
}

impl PredictResponse {
    pub fn new(entity_id: Option<String>, prediction: &Prediction) -> Self {
        Self {
            entity_id,
            prediction: prediction.label,
            survived: prediction.label == 1,
            probability: prediction.probability,
            is_drift: prediction.is_drift,
            drift_p_values: prediction.drift.as_ref().map(|v| v.p_values()),
            drift_threshold: prediction.drift.as_ref().map(|v| v.threshold),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityResponse {
    pub entity_id: String,
    pub features: FeatureMap,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: i64,
    pub store_reachable: bool,
    pub context: ContextInfo,
}
