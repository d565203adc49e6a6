//! Reference Module - Scaler + scaled reference matrix
//!
//! Fitted once from the whole stored population. The same scaler is used
//! for the reference matrix, for training inputs and for every live
//! request, so drift comparison and classification share one scaling.

pub mod scaler;

use ndarray::Array2;
use thiserror::Error;

use crate::logic::features::{FeatureVector, FEATURE_COUNT, FEATURE_LAYOUT};
use crate::logic::store::{EntityId, Snapshot};

pub use scaler::StandardScaler;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReferenceError {
    #[error("cannot fit reference: population is empty")]
    EmptyPopulation,

    #[error("entity {entity} has no value for feature `{feature}`")]
    MissingFeature { entity: String, feature: String },

    #[error("entity {entity} has a non-finite value for feature `{feature}`")]
    NonFinite { entity: String, feature: String },

    #[error("expected {expected} features, got {actual}")]
    Shape { expected: usize, actual: usize },
}

/// Population matrix: rows in entity-id order, columns in layout order
///
/// Any stored label or extra key is ignored.
pub fn population_matrix(snapshot: &Snapshot) -> Result<(Vec<EntityId>, Array2<f64>), ReferenceError> {
    if snapshot.is_empty() {
        return Err(ReferenceError::EmptyPopulation);
    }

    let mut ids = Vec::with_capacity(snapshot.len());
    let mut values = Vec::with_capacity(snapshot.len() * FEATURE_COUNT);

    for (id, features) in snapshot.iter() {
        for name in FEATURE_LAYOUT {
            let value = *features.get(*name).ok_or_else(|| ReferenceError::MissingFeature {
                entity: id.clone(),
                feature: name.to_string(),
            })?;
            if !value.is_finite() {
                return Err(ReferenceError::NonFinite {
                    entity: id.clone(),
                    feature: name.to_string(),
                });
            }
            values.push(value);
        }
        ids.push(id.clone());
    }

    let matrix = Array2::from_shape_vec((ids.len(), FEATURE_COUNT), values).map_err(|_| {
        ReferenceError::Shape {
            expected: FEATURE_COUNT,
            actual: ids.len(),
        }
    })?;

    Ok((ids, matrix))
}

/// Fitted scaler, scaled population and the snapshot it came from
#[derive(Debug, Clone)]
pub struct ReferenceDistribution {
    scaler: StandardScaler,
    reference: Array2<f64>,
    entity_ids: Vec<EntityId>,
    fingerprint: String,
}

impl ReferenceDistribution {
    pub fn fit(snapshot: &Snapshot) -> Result<Self, ReferenceError> {
        let (entity_ids, population) = population_matrix(snapshot)?;
        let scaler = StandardScaler::fit(&population)?;
        let reference = scaler.transform(&population)?;

        log::info!(
            "[Reference] Fitted on {} entities x {} features",
            reference.nrows(),
            reference.ncols()
        );

        Ok(Self {
            scaler,
            reference,
            entity_ids,
            fingerprint: snapshot.fingerprint(),
        })
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Scaled population (rows aligned with `entity_ids`)
    pub fn matrix(&self) -> &Array2<f64> {
        &self.reference
    }

    pub fn entity_ids(&self) -> &[EntityId] {
        &self.entity_ids
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn n_rows(&self) -> usize {
        self.reference.nrows()
    }

    /// Scale one vector with the fitted scaler
    pub fn scale(&self, vector: &FeatureVector) -> Result<FeatureVector, ReferenceError> {
        let scaled = self.scaler.transform_row(vector.as_slice())?;
        let values: [f64; FEATURE_COUNT] = scaled.try_into().map_err(|row: Vec<f64>| ReferenceError::Shape {
            expected: FEATURE_COUNT,
            actual: row.len(),
        })?;
        Ok(FeatureVector::from_values(values))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::logic::features::{FeatureMap, LABEL_FIELD};

    fn entity(base: f64, label: f64) -> FeatureMap {
        let mut values = [0.0; FEATURE_COUNT];
        for (i, v) in values.iter_mut().enumerate() {
            *v = base * (i as f64 + 1.0);
        }
        let mut map = FeatureVector::from_values(values).to_feature_map();
        map.insert(LABEL_FIELD.to_string(), label);
        map
    }

    fn snapshot(entries: &[(&str, FeatureMap)]) -> Snapshot {
        Snapshot::from_entries(
            entries
                .iter()
                .map(|(id, map)| (id.to_string(), map.clone()))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    #[test]
    fn test_population_matrix_orders_rows_and_columns() {
        let snap = snapshot(&[("2", entity(2.0, 0.0)), ("1", entity(1.0, 1.0))]);
        let (ids, matrix) = population_matrix(&snap).unwrap();

        assert_eq!(ids, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(matrix.shape(), &[2, FEATURE_COUNT]);
        assert_eq!(matrix[[0, 0]], 1.0);
        assert_eq!(matrix[[1, 10]], 22.0);
    }

    #[test]
    fn test_population_matrix_missing_feature() {
        let mut broken = entity(1.0, 1.0);
        broken.remove("HasCabin");
        let snap = snapshot(&[("1", broken)]);

        assert_eq!(
            population_matrix(&snap).unwrap_err(),
            ReferenceError::MissingFeature {
                entity: "1".to_string(),
                feature: "HasCabin".to_string()
            }
        );
    }

    #[test]
    fn test_empty_population_is_error() {
        assert!(matches!(
            ReferenceDistribution::fit(&Snapshot::default()),
            Err(ReferenceError::EmptyPopulation)
        ));
    }

    #[test]
    fn test_reference_is_standardized() {
        let entries: Vec<(String, FeatureMap)> = (1..=20)
            .map(|i| (i.to_string(), entity(i as f64 * 0.7, (i % 2) as f64)))
            .collect();
        let snap = Snapshot::from_entries(entries.into_iter().collect());
        let reference = ReferenceDistribution::fit(&snap).unwrap();

        assert_eq!(reference.n_rows(), 20);
        assert_eq!(reference.fingerprint(), snap.fingerprint());
        for column in reference.matrix().columns() {
            assert!(column.mean().unwrap().abs() < 1e-9);
            assert!((column.std(0.0) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_scale_matches_reference_rows() {
        let snap = snapshot(&[("1", entity(1.0, 1.0)), ("2", entity(3.0, 0.0))]);
        let reference = ReferenceDistribution::fit(&snap).unwrap();

        let raw = FeatureVector::from_feature_map(&entity(1.0, 1.0)).unwrap();
        let scaled = reference.scale(&raw).unwrap();
        let row = reference.matrix().row(0);
        assert_eq!(scaled.as_slice(), row.as_slice().unwrap());
        assert_eq!(
            scaled.as_slice(),
            reference.scaler().transform_row(raw.as_slice()).unwrap().as_slice()
        );
    }
}
