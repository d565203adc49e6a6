//! Model Module - Classifier and persisted artifact
//!
//! The classifier consumes *scaled* feature rows in layout order. The
//! artifact ties it to the layout and to the store snapshot its scaler
//! was fitted on.

pub mod artifact;
pub mod forest;

use ndarray::ArrayView2;
use thiserror::Error;

use crate::logic::features::LayoutMismatchError;

pub use artifact::{ModelArtifact, TrainingMetrics};
pub use forest::{ForestParams, RandomForest};

/// Binary classifier over one feature row
pub trait Classifier: Send + Sync {
    fn n_features(&self) -> usize;

    /// Probability of the positive class
    fn predict_proba(&self, features: &[f64]) -> Result<f64, ModelError>;

    fn predict(&self, features: &[f64]) -> Result<u8, ModelError> {
        Ok(u8::from(self.predict_proba(features)? > 0.5))
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("model has no trees")]
    EmptyModel,

    #[error("{rows} feature rows but {labels} labels")]
    LabelMismatch { rows: usize, labels: usize },

    #[error("label {0} is not 0 or 1")]
    InvalidLabel(f64),

    #[error("training data contains a non-finite value")]
    NonFinite,

    #[error("invalid forest parameters: {0}")]
    InvalidParams(String),

    #[error("expected {expected} features, got {actual}")]
    Shape { expected: usize, actual: usize },

    #[error("artifact I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("artifact checksum missing: {0}")]
    ChecksumMissing(String),

    #[error("artifact checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Layout(#[from] LayoutMismatchError),
}

/// Share of rows whose predicted label equals the true one
pub fn accuracy(model: &dyn Classifier, x: ArrayView2<'_, f64>, y: &[u8]) -> Result<f64, ModelError> {
    if x.nrows() != y.len() {
        return Err(ModelError::LabelMismatch {
            rows: x.nrows(),
            labels: y.len(),
        });
    }
    if y.is_empty() {
        return Err(ModelError::EmptyTrainingSet);
    }

    let mut correct = 0usize;
    for (row, &label) in x.rows().into_iter().zip(y) {
        let row = row.to_vec();
        if model.predict(&row)? == label {
            correct += 1;
        }
    }
    Ok(correct as f64 / y.len() as f64)
}
