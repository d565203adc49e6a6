//! Model Artifact - classifier + the context it is only valid in
//!
//! Saved as pretty JSON next to a `<file>.sha256` sidecar
//! (`sha256sum` format). Loading verifies the checksum first, then the
//! feature layout.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::APP_VERSION;
use crate::logic::features::LayoutInfo;

use super::forest::RandomForest;
use super::ModelError;

/// Current artifact format
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub population: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub train_accuracy: f64,
    /// `None` when nothing was held out
    pub test_accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub app_version: String,
    pub trained_at: DateTime<Utc>,
    pub layout: LayoutInfo,
    /// Fingerprint of the store snapshot the scaler was fitted on
    pub snapshot_fingerprint: String,
    pub metrics: TrainingMetrics,
    pub classifier: RandomForest,
}

impl ModelArtifact {
    pub fn new(classifier: RandomForest, snapshot_fingerprint: String, metrics: TrainingMetrics) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            app_version: APP_VERSION.to_string(),
            trained_at: Utc::now(),
            layout: LayoutInfo::current(),
            snapshot_fingerprint,
            metrics,
            classifier,
        }
    }

    /// Sidecar path: `<path>.sha256`
    pub fn checksum_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".sha256");
        PathBuf::from(name)
    }

    /// Write artifact + checksum; returns the hex digest
    pub fn save(&self, path: &Path) -> Result<String, ModelError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let bytes = serde_json::to_vec_pretty(self)?;
        let digest = hex::encode(Sha256::digest(&bytes));

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        fs::write(Self::checksum_path(path), format!("{digest}  {file_name}\n"))?;

        log::info!(
            "[Artifact] Saved model to {} ({} bytes, sha256 {})",
            path.display(),
            bytes.len(),
            &digest[..12]
        );
        Ok(digest)
    }

    /// Read, verify checksum, verify layout
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let bytes = fs::read(path)?;

        let sidecar = Self::checksum_path(path);
        let recorded = fs::read_to_string(&sidecar)
            .map_err(|_| ModelError::ChecksumMissing(sidecar.display().to_string()))?;
        let expected = recorded.split_whitespace().next().unwrap_or_default().to_ascii_lowercase();
        let actual = hex::encode(Sha256::digest(&bytes));

        if expected != actual {
            return Err(ModelError::ChecksumMismatch {
                path: path.display().to_string(),
                expected,
                actual,
            });
        }

        let artifact: Self = serde_json::from_slice(&bytes)?;
        artifact.layout.validate()?;

        log::info!(
            "[Artifact] Loaded model from {} (trained {}, layout {:08x})",
            path.display(),
            artifact.trained_at.to_rfc3339(),
            artifact.layout.hash
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::FEATURE_COUNT;
    use crate::logic::model::{Classifier, ForestParams};
    use ndarray::Array2;

    fn artifact() -> ModelArtifact {
        let x = Array2::from_shape_fn((10, FEATURE_COUNT), |(i, c)| (i * (c + 1)) as f64);
        let y: Vec<u8> = (0..10).map(|i| u8::from(i >= 5)).collect();
        let params = ForestParams {
            n_trees: 3,
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(x.view(), &y, params).unwrap();

        let metrics = TrainingMetrics {
            population: 10,
            train_rows: 10,
            test_rows: 0,
            train_accuracy: 1.0,
            test_accuracy: None,
        };
        ModelArtifact::new(forest, "abc123".to_string(), metrics)
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("model.json");

        let original = artifact();
        let digest = original.save(&path).unwrap();
        assert_eq!(digest.len(), 64);

        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded, original);
        assert_eq!(loaded.classifier.n_features(), FEATURE_COUNT);
    }

    #[test]
    fn test_tampered_artifact_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        artifact().save(&path).unwrap();

        let mut text = fs::read_to_string(&path).unwrap();
        text = text.replace("abc123", "abc124");
        fs::write(&path, text).unwrap();

        assert!(matches!(
            ModelArtifact::load(&path),
            Err(ModelError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_sidecar_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        artifact().save(&path).unwrap();
        fs::remove_file(ModelArtifact::checksum_path(&path)).unwrap();

        assert!(matches!(
            ModelArtifact::load(&path),
            Err(ModelError::ChecksumMissing(_))
        ));
    }

    #[test]
    fn test_foreign_layout_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let mut stale = artifact();
        stale.layout.hash ^= 1;
        stale.save(&path).unwrap();

        assert!(matches!(ModelArtifact::load(&path), Err(ModelError::Layout(_))));
    }

    #[test]
    fn test_checksum_path() {
        assert_eq!(
            ModelArtifact::checksum_path(Path::new("a/model.json")),
            PathBuf::from("a/model.json.sha256")
        );
    }
}
