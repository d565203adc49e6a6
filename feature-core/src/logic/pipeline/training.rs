//! Training - store snapshot → scaled features → forest → artifact

use std::path::PathBuf;

use ndarray::Axis;

use crate::constants::{DEFAULT_MODEL_PATH, DEFAULT_RANDOM_STATE, DEFAULT_TEST_FRACTION};
use crate::logic::dataset::split_shuffled;
use crate::logic::features::LABEL_FIELD;
use crate::logic::model::{accuracy, ForestParams, ModelArtifact, RandomForest, TrainingMetrics};
use crate::logic::reference::ReferenceDistribution;
use crate::logic::store::{FeatureStore, Snapshot};

use super::PipelineError;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub params: ForestParams,
    pub test_fraction: f64,
    pub seed: u64,
    pub model_path: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            params: ForestParams::default(),
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_RANDOM_STATE,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
        }
    }
}

/// Labels aligned with `ids`
fn labels(snapshot: &Snapshot, ids: &[String]) -> Result<Vec<u8>, PipelineError> {
    ids.iter()
        .map(|id| {
            let value = snapshot
                .get(id)
                .and_then(|features| features.get(LABEL_FIELD))
                .copied()
                .ok_or_else(|| PipelineError::MissingLabel(id.clone()))?;

            if value == 0.0 {
                Ok(0)
            } else if value == 1.0 {
                Ok(1)
            } else {
                Err(PipelineError::InvalidLabel {
                    entity: id.clone(),
                    value,
                })
            }
        })
        .collect()
}

/// Fit reference + forest on an in-memory snapshot (no I/O)
pub fn train_on_snapshot(snapshot: &Snapshot, config: &TrainingConfig) -> Result<ModelArtifact, PipelineError> {
    let reference = ReferenceDistribution::fit(snapshot)?;
    let y = labels(snapshot, reference.entity_ids())?;

    let rows: Vec<usize> = (0..reference.n_rows()).collect();
    let (train_rows, test_rows) = split_shuffled(rows, config.test_fraction, config.seed);

    let x = reference.matrix();
    let x_train = x.select(Axis(0), &train_rows);
    let y_train: Vec<u8> = train_rows.iter().map(|&i| y[i]).collect();

    let forest = RandomForest::fit(x_train.view(), &y_train, config.params)?;
    let train_accuracy = accuracy(&forest, x_train.view(), &y_train)?;

    let test_accuracy = if test_rows.is_empty() {
        None
    } else {
        let x_test = x.select(Axis(0), &test_rows);
        let y_test: Vec<u8> = test_rows.iter().map(|&i| y[i]).collect();
        Some(accuracy(&forest, x_test.view(), &y_test)?)
    };

    log::info!(
        "[Training] train accuracy {:.4}, test accuracy {}",
        train_accuracy,
        test_accuracy.map_or_else(|| "n/a".to_string(), |a| format!("{a:.4}"))
    );

    let metrics = TrainingMetrics {
        population: reference.n_rows(),
        train_rows: train_rows.len(),
        test_rows: test_rows.len(),
        train_accuracy,
        test_accuracy,
    };

    Ok(ModelArtifact::new(forest, reference.fingerprint().to_string(), metrics))
}

/// Load the store snapshot, train, save the artifact
pub async fn run_training(store: &dyn FeatureStore, config: &TrainingConfig) -> Result<ModelArtifact, PipelineError> {
    let snapshot = Snapshot::load(store).await?;
    let artifact = train_on_snapshot(&snapshot, config)?;
    artifact.save(&config.model_path)?;
    Ok(artifact)
}
