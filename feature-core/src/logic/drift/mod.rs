//! Drift Module - Per-feature KS comparison against the reference
//!
//! ## Aggregation policy
//! Each feature yields one KS p-value. The call is flagged as drift when
//! the corrected test rejects for any feature:
//! - `Bonferroni` (default): p < significance / n_features
//! - `Fdr`: Benjamini-Hochberg, p_(k) < significance * k / n_features
//! - `Uncorrected`: p < significance
//!
//! A verdict is observational only: callers log and count it, they never
//! change a prediction because of it.

pub mod ks;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::DEFAULT_SIGNIFICANCE;
use crate::logic::features::{FeatureVector, FEATURE_COUNT, FEATURE_LAYOUT};
use crate::logic::reference::ReferenceDistribution;

pub use ks::{ks_two_sample, KsResult};

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Correction {
    #[default]
    Bonferroni,
    Fdr,
    Uncorrected,
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Correction::Bonferroni => "bonferroni",
            Correction::Fdr => "fdr",
            Correction::Uncorrected => "none",
        };
        f.write_str(name)
    }
}

impl FromStr for Correction {
    type Err = DriftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bonferroni" => Ok(Correction::Bonferroni),
            "fdr" | "bh" => Ok(Correction::Fdr),
            "none" | "uncorrected" => Ok(Correction::Uncorrected),
            other => Err(DriftError::UnknownCorrection(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftConfig {
    pub significance: f64,
    pub correction: Correction,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            significance: DEFAULT_SIGNIFICANCE,
            correction: Correction::default(),
        }
    }
}

impl DriftConfig {
    pub fn validate(&self) -> Result<(), DriftError> {
        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(DriftError::InvalidSignificance(self.significance));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriftError {
    #[error("drift reference is empty")]
    EmptyReference,

    #[error("drift check called with an empty batch")]
    EmptyBatch,

    #[error("drift input has {actual} columns, expected {expected}")]
    Shape { expected: usize, actual: usize },

    #[error("drift input has a non-finite value in `{feature}`")]
    NonFinite { feature: String },

    #[error("significance must be in (0, 1), got {0}")]
    InvalidSignificance(f64),

    #[error("unknown drift correction `{0}` (expected bonferroni, fdr or none)")]
    UnknownCorrection(String),
}

// ============================================================================
// VERDICT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDrift {
    pub feature: String,
    pub statistic: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftVerdict {
    pub is_drift: bool,
    pub correction: Correction,
    pub significance: f64,
    /// Per-feature cutoff after correction (Bonferroni / uncorrected)
    /// or the largest rejected BH cutoff (FDR, 0 when nothing rejected)
    pub threshold: f64,
    pub features: Vec<FeatureDrift>,
    pub n_reference: usize,
    pub n_batch: usize,
}

impl DriftVerdict {
    pub fn p_values(&self) -> BTreeMap<String, f64> {
        self.features
            .iter()
            .map(|f| (f.feature.clone(), f.p_value))
            .collect()
    }

    /// Features whose p-value falls under the corrected cutoff
    pub fn drifted_features(&self) -> Vec<&str> {
        self.features
            .iter()
            .filter(|f| self.is_drift && f.p_value < self.threshold)
            .map(|f| f.feature.as_str())
            .collect()
    }
}

/// Apply the configured correction to a set of p-values
///
/// Returns `(is_drift, threshold)`.
pub fn aggregate(p_values: &[f64], config: &DriftConfig) -> (bool, f64) {
    let m = p_values.len();
    if m == 0 {
        return (false, config.significance);
    }

    match config.correction {
        Correction::Uncorrected => {
            let threshold = config.significance;
            (p_values.iter().any(|&p| p < threshold), threshold)
        }
        Correction::Bonferroni => {
            let threshold = config.significance / m as f64;
            (p_values.iter().any(|&p| p < threshold), threshold)
        }
        Correction::Fdr => {
            let mut sorted = p_values.to_vec();
            sorted.sort_by(f64::total_cmp);

            let bh_cutoff = |rank: usize| config.significance * rank as f64 / m as f64;
            let cutoff = sorted
                .iter()
                .zip(1..=m)
                .filter(|&(&p, rank)| p < bh_cutoff(rank))
                .map(|(_, rank)| bh_cutoff(rank))
                .last();

            match cutoff {
                Some(threshold) => (true, threshold),
                None => (false, 0.0),
            }
        }
    }
}

// ============================================================================
// DETECTOR
// ============================================================================

/// KS drift detector over a fixed scaled reference
///
/// Reference columns are sorted once at construction; `check` only sorts
/// the incoming batch.
#[derive(Debug, Clone)]
pub struct KsDriftDetector {
    sorted_reference: Vec<Vec<f64>>,
    n_reference: usize,
    config: DriftConfig,
}

impl KsDriftDetector {
    pub fn new(reference: ArrayView2<'_, f64>, config: DriftConfig) -> Result<Self, DriftError> {
        config.validate()?;
        if reference.nrows() == 0 {
            return Err(DriftError::EmptyReference);
        }
        if reference.ncols() != FEATURE_COUNT {
            return Err(DriftError::Shape {
                expected: FEATURE_COUNT,
                actual: reference.ncols(),
            });
        }

        let mut sorted_reference = Vec::with_capacity(FEATURE_COUNT);
        for (column, name) in reference.columns().into_iter().zip(FEATURE_LAYOUT) {
            let mut values = column.to_vec();
            if values.iter().any(|v| !v.is_finite()) {
                return Err(DriftError::NonFinite {
                    feature: name.to_string(),
                });
            }
            values.sort_by(f64::total_cmp);
            sorted_reference.push(values);
        }

        log::info!(
            "[Drift] KS detector ready: {} reference rows, correction={}, significance={}",
            reference.nrows(),
            config.correction,
            config.significance
        );

        Ok(Self {
            sorted_reference,
            n_reference: reference.nrows(),
            config,
        })
    }

    /// Detector over the reference's scaled matrix
    pub fn from_reference(reference: &ReferenceDistribution, config: DriftConfig) -> Result<Self, DriftError> {
        Self::new(reference.matrix().view(), config)
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    pub fn n_reference(&self) -> usize {
        self.n_reference
    }

    /// Compare a scaled batch (rows = samples, columns in layout order)
    pub fn check(&self, batch: ArrayView2<'_, f64>) -> Result<DriftVerdict, DriftError> {
        if batch.nrows() == 0 {
            return Err(DriftError::EmptyBatch);
        }
        if batch.ncols() != FEATURE_COUNT {
            return Err(DriftError::Shape {
                expected: FEATURE_COUNT,
                actual: batch.ncols(),
            });
        }

        let mut features = Vec::with_capacity(FEATURE_COUNT);
        for ((column, reference), name) in batch
            .columns()
            .into_iter()
            .zip(&self.sorted_reference)
            .zip(FEATURE_LAYOUT)
        {
            let mut values = column.to_vec();
            if values.iter().any(|v| !v.is_finite()) {
                return Err(DriftError::NonFinite {
                    feature: name.to_string(),
                });
            }
            values.sort_by(f64::total_cmp);

            let result = ks::ks_two_sample_sorted(reference, &values).ok_or(DriftError::EmptyBatch)?;
            features.push(FeatureDrift {
                feature: name.to_string(),
                statistic: result.statistic,
                p_value: result.p_value,
            });
        }

        let p_values: Vec<f64> = features.iter().map(|f| f.p_value).collect();
        let (is_drift, threshold) = aggregate(&p_values, &self.config);

        Ok(DriftVerdict {
            is_drift,
            correction: self.config.correction,
            significance: self.config.significance,
            threshold,
            features,
            n_reference: self.n_reference,
            n_batch: batch.nrows(),
        })
    }

    /// Compare a single scaled vector
    pub fn check_one(&self, scaled: &FeatureVector) -> Result<DriftVerdict, DriftError> {
        let batch = Array2::from_shape_vec((1, FEATURE_COUNT), scaled.values.to_vec()).map_err(|_| {
            DriftError::Shape {
                expected: FEATURE_COUNT,
                actual: scaled.values.len(),
            }
        })?;
        self.check(batch.view())
    }
}
