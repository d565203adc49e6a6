//! Imputation Statistics - population-level fill values
//!
//! Fitted once over the *training* population. Serving never imputes: a
//! request with a missing field is rejected instead.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::encoding::normalize_embarked;
use super::error::FeatureError;
use crate::logic::dataset::RawRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationStats {
    pub age_median: f64,
    pub fare_median: f64,
    pub embarked_mode: String,
}

impl ImputationStats {
    pub fn fit(records: &[RawRecord]) -> Result<Self, FeatureError> {
        if records.is_empty() {
            return Err(FeatureError::EmptyPopulation("no training records".to_string()));
        }

        let ages: Vec<f64> = records.iter().filter_map(|r| r.age).filter(|v| v.is_finite()).collect();
        let fares: Vec<f64> = records.iter().filter_map(|r| r.fare).filter(|v| v.is_finite()).collect();
        let ports = records
            .iter()
            .filter_map(|r| r.embarked.as_deref())
            .map(normalize_embarked)
            .filter(|p| !p.is_empty());

        let stats = Self {
            age_median: median(ages)
                .ok_or_else(|| FeatureError::EmptyPopulation("no observed Age".to_string()))?,
            fare_median: median(fares)
                .ok_or_else(|| FeatureError::EmptyPopulation("no observed Fare".to_string()))?,
            embarked_mode: mode(ports)
                .ok_or_else(|| FeatureError::EmptyPopulation("no observed Embarked".to_string()))?,
        };

        log::info!(
            "Imputation fitted on {} records: Age median={:.2}, Fare median={:.4}, Embarked mode={}",
            records.len(),
            stats.age_median,
            stats.fare_median,
            stats.embarked_mode
        );
        Ok(stats)
    }
}

/// Median with midpoint averaging for even counts
fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Most frequent value; ties go to the lexicographically smallest
fn mode(values: impl Iterator<Item = String>) -> Option<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }

    let mut best: Option<(String, usize)> = None;
    for (value, count) in counts {
        if best.as_ref().map_or(true, |(_, c)| count > *c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(age: Option<f64>, fare: Option<f64>, embarked: Option<&str>) -> RawRecord {
        RawRecord {
            passenger_id: 1,
            survived: Some(0),
            pclass: 3,
            name: None,
            sex: Some("male".to_string()),
            age,
            sib_sp: 0,
            parch: 0,
            ticket: None,
            fare,
            cabin: None,
            embarked: embarked.map(str::to_string),
        }
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(vec![3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(vec![4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(vec![]), None);
    }

    #[test]
    fn test_mode_tie_breaks_to_smallest() {
        let values = ["S", "C", "C", "S"].into_iter().map(String::from);
        assert_eq!(mode(values), Some("C".to_string()));
    }

    #[test]
    fn test_fit_ignores_missing_values() {
        let records = vec![
            record(Some(20.0), Some(10.0), Some("S")),
            record(None, Some(30.0), Some("s")),
            record(Some(40.0), None, None),
            record(Some(60.0), Some(50.0), Some("C")),
        ];

        let stats = ImputationStats::fit(&records).unwrap();
        assert_eq!(stats.age_median, 40.0);
        assert_eq!(stats.fare_median, 30.0);
        assert_eq!(stats.embarked_mode, "S");
    }

    #[test]
    fn test_fit_requires_observations() {
        assert!(ImputationStats::fit(&[]).is_err());

        let records = vec![record(None, Some(1.0), Some("S"))];
        assert!(matches!(
            ImputationStats::fit(&records),
            Err(FeatureError::EmptyPopulation(_))
        ));
    }
}
