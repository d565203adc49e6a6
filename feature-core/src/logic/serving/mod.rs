//! Serving Module - Immutable per-process serving context
//!
//! Built once at startup from the store and the model artifact:
//!
//! ```text
//! store snapshot ──► ReferenceDistribution ──► KsDriftDetector
//!        │ fingerprint must equal the artifact's
//! artifact ──► RandomForest
//! ```
//!
//! Requests only read this state. The only mutation after startup is the
//! atomic counters in `ServingStats`.


use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::logic::drift::{DriftConfig, DriftError, DriftVerdict, KsDriftDetector};
use crate::logic::features::{
    engineer_input, FeatureError, FeatureMap, FeatureVector, LayoutInfo, LayoutMismatchError,
    PassengerInput, FEATURE_COUNT,
};
use crate::logic::model::{Classifier, ModelArtifact, ModelError, RandomForest};
use crate::logic::reference::{ReferenceDistribution, ReferenceError};
use crate::logic::store::{FeatureStore, Snapshot, StoreError};

// ============================================================================
// ERRORS
// ============================================================================

/// Failures that keep the service from becoming ready
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("feature store not available: {0}")]
    Store(#[from] StoreError),

    #[error("cannot fit reference distribution: {0}")]
    Reference(#[from] ReferenceError),

    #[error("cannot build drift detector: {0}")]
    Drift(#[from] DriftError),

    #[error(transparent)]
    Layout(#[from] LayoutMismatchError),

    #[error(
        "store snapshot {actual} does not match the snapshot the model was trained on ({expected}); \
         retrain before serving"
    )]
    SnapshotMismatch { expected: String, actual: String },

    #[error("model expects {actual} features, layout has {expected}")]
    ModelShape { expected: usize, actual: usize },
}

/// Per-request failures; none of them touch shared state
#[derive(Debug, Error)]
pub enum ServingError {
    #[error("invalid request: {0}")]
    Input(#[from] FeatureError),

    #[error("entity {0} not found")]
    NotFound(String),

    #[error("stored features for entity {entity} are unusable: {source}")]
    StoredFeatures {
        entity: String,
        #[source]
        source: FeatureError,
    },

    #[error("feature store error: {0}")]
    Store(#[from] StoreError),

    #[error("cannot scale request: {0}")]
    Scaling(#[from] ReferenceError),

    #[error("classifier error: {0}")]
    Model(#[from] ModelError),
}

// ============================================================================
// STATS
// ============================================================================

#[derive(Debug, Default)]
pub struct ServingStats {
    predictions: AtomicU64,
    drift_detected: AtomicU64,
    drift_check_failures: AtomicU64,
    rejected_requests: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub predictions: u64,
    pub drift_detected: u64,
    pub drift_check_failures: u64,
    pub rejected_requests: u64,
}

impl ServingStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            predictions: self.predictions.load(Ordering::Relaxed),
            drift_detected: self.drift_detected.load(Ordering::Relaxed),
            drift_check_failures: self.drift_check_failures.load(Ordering::Relaxed),
            rejected_requests: self.rejected_requests.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// PREDICTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: u8,
    pub probability: f64,
    /// `false` also when the drift check could not run
    pub is_drift: bool,
    /// `None` when the drift check failed (see logs)
    pub drift: Option<DriftVerdict>,
}

/// Static facts about the loaded context (health output)
#[derive(Debug, Clone, Serialize)]
pub struct ContextInfo {
    pub store_backend: &'static str,
    pub reference_rows: usize,
    pub snapshot_fingerprint: String,
    pub model_trained_at: DateTime<Utc>,
    pub layout: LayoutInfo,
    pub drift: DriftConfig,
    pub stats: StatsSnapshot,
}

// ============================================================================
// CONTEXT
// ============================================================================

pub struct ServingContext {
    store: Arc<dyn FeatureStore>,
    reference: ReferenceDistribution,
    detector: KsDriftDetector,
    classifier: RandomForest,
    layout: LayoutInfo,
    trained_at: DateTime<Utc>,
    stats: ServingStats,
}

impl ServingContext {
    /// Fit the reference from the current store and pair it with the model
    ///
    /// Every error here is fatal for the process.
    pub async fn bootstrap(
        store: Arc<dyn FeatureStore>,
        artifact: ModelArtifact,
        drift: DriftConfig,
    ) -> Result<Self, StartupError> {
        store.ping().await?;
        artifact.layout.validate()?;

        let actual = artifact.classifier.n_features();
        if actual != FEATURE_COUNT {
            return Err(StartupError::ModelShape {
                expected: FEATURE_COUNT,
                actual,
            });
        }

        let snapshot = Snapshot::load(store.as_ref()).await?;
        let reference = ReferenceDistribution::fit(&snapshot)?;

        if reference.fingerprint() != artifact.snapshot_fingerprint {
            return Err(StartupError::SnapshotMismatch {
                expected: artifact.snapshot_fingerprint,
                actual: reference.fingerprint().to_string(),
            });
        }

        let detector = KsDriftDetector::from_reference(&reference, drift)?;

        log::info!(
            "[Serving] Context ready: {} reference rows, model trained {}",
            reference.n_rows(),
            artifact.trained_at.to_rfc3339()
        );

        Ok(Self {
            store,
            reference,
            detector,
            classifier: artifact.classifier,
            layout: artifact.layout,
            trained_at: artifact.trained_at,
            stats: ServingStats::default(),
        })
    }

    pub fn store(&self) -> &Arc<dyn FeatureStore> {
        &self.store
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn info(&self) -> ContextInfo {
        ContextInfo {
            store_backend: self.store.backend(),
            reference_rows: self.reference.n_rows(),
            snapshot_fingerprint: self.reference.fingerprint().to_string(),
            model_trained_at: self.trained_at,
            layout: self.layout.clone(),
            drift: *self.detector.config(),
            stats: self.stats.snapshot(),
        }
    }

    /// Predict from a flat request body
    pub fn predict_fields(&self, fields: &BTreeMap<String, Value>) -> Result<Prediction, ServingError> {
        let vector = PassengerInput::from_fields(fields)
            .and_then(|input| engineer_input(&input))
            .map_err(|e| {
                self.stats.rejected_requests.fetch_add(1, Ordering::Relaxed);
                log::info!("[Serving] Rejected request: {}", e);
                ServingError::Input(e)
            })?;

        self.predict_vector(&vector)
    }

    /// Predict from an unscaled vector in layout order
    pub fn predict_vector(&self, vector: &FeatureVector) -> Result<Prediction, ServingError> {
        vector.validate().map_err(FeatureError::from)?;
        if let Some(field) = vector.first_non_finite() {
            return Err(ServingError::Input(FeatureError::NonFinite {
                field: field.to_string(),
            }));
        }

        let scaled = self.reference.scale(vector)?;

        // Drift is a side channel: a failed check never fails the request
        let drift = match self.detector.check_one(&scaled) {
            Ok(verdict) => {
                if verdict.is_drift {
                    self.stats.drift_detected.fetch_add(1, Ordering::Relaxed);
                    log::warn!(
                        "[Serving] Drift detected in {:?}",
                        verdict.drifted_features()
                    );
                    log::debug!("[Serving] Drifting input: {}", vector.to_log_entry());
                }
                Some(verdict)
            }
            Err(e) => {
                self.stats.drift_check_failures.fetch_add(1, Ordering::Relaxed);
                log::error!("[Serving] Drift check skipped: {}", e);
                None
            }
        };

        let probability = self.classifier.predict_proba(scaled.as_slice())?;
        let label = u8::from(probability > 0.5);
        self.stats.predictions.fetch_add(1, Ordering::Relaxed);

        Ok(Prediction {
            label,
            probability,
            is_drift: drift.as_ref().is_some_and(|v| v.is_drift),
            drift,
        })
    }

    /// Stored features of one entity
    pub async fn entity_features(&self, entity_id: &str) -> Result<FeatureMap, ServingError> {
        self.store
            .get(entity_id)
            .await?
            .ok_or_else(|| ServingError::NotFound(entity_id.to_string()))
    }

    /// Predict from an entity's stored features
    pub async fn predict_entity(&self, entity_id: &str) -> Result<Prediction, ServingError> {
        let features = self.entity_features(entity_id).await?;
        let vector = FeatureVector::from_feature_map(&features).map_err(|source| {
            ServingError::StoredFeatures {
                entity: entity_id.to_string(),
                source,
            }
        })?;
        self.predict_vector(&vector)
    }
}
