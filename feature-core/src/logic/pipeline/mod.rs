//! Pipeline Module - batch runs around the store
//!
//! ```text
//! raw split ──► processing ──► store ──► training ──► artifact
//! ```

pub mod processing;
pub mod training;


use thiserror::Error;

use crate::logic::dataset::DatasetError;
use crate::logic::features::FeatureError;
use crate::logic::model::ModelError;
use crate::logic::reference::ReferenceError;
use crate::logic::store::StoreError;

pub use processing::{process_file, process_records, ProcessingReport};
pub use training::{run_training, train_on_snapshot, TrainingConfig};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("entity {0} has no label")]
    MissingLabel(String),

    #[error("entity {entity} has label {value}, expected 0 or 1")]
    InvalidLabel { entity: String, value: f64 },

    #[error("no record could be processed ({skipped} skipped)")]
    NothingProcessed { skipped: usize },
}
