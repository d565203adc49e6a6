//! Feature Engineering - raw passenger → `FeatureVector`
//!
//! Policy order, identical for both entry points:
//! 1. Imputation (training records only, population statistics)
//! 2. Categorical encoding (fixed tables in `encoding.rs`)
//! 3. Derived fields (family size, alone flag, cabin flag, title, interactions)
//! 4. Output in FEATURE_LAYOUT order
//!
//! Pure functions: no I/O, no hidden state.

use super::encoding::{encode_embarked, encode_sex, encode_title, has_cabin};
use super::error::FeatureError;
use super::imputation::ImputationStats;
use super::request::PassengerInput;
use super::vector::FeatureVector;
use crate::logic::dataset::RawRecord;

/// Encoded base fields, the common input of step 3
#[derive(Debug, Clone, Copy, PartialEq)]
struct BaseFields {
    pclass: f64,
    sex: f64,
    age: f64,
    fare: f64,
    embarked: f64,
    sib_sp: f64,
    parch: f64,
    has_cabin: bool,
    title: f64,
}

/// Training-time engineering with population imputation
pub fn engineer_record(record: &RawRecord, stats: &ImputationStats) -> Result<FeatureVector, FeatureError> {
    let unprocessable = |reason: String| FeatureError::Unprocessable {
        entity: record.entity_id(),
        reason,
    };

    let sex = record
        .sex
        .as_deref()
        .ok_or_else(|| unprocessable("missing Sex".to_string()))?;

    let embarked = record
        .embarked
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or(&stats.embarked_mode);

    let base = BaseFields {
        pclass: record.pclass as f64,
        sex: encode_sex(sex).map_err(|e| unprocessable(e.to_string()))?,
        age: record.age.filter(|a| a.is_finite()).unwrap_or(stats.age_median),
        fare: record.fare.filter(|f| f.is_finite()).unwrap_or(stats.fare_median),
        embarked: encode_embarked(embarked).map_err(|e| unprocessable(e.to_string()))?,
        sib_sp: record.sib_sp as f64,
        parch: record.parch as f64,
        has_cabin: has_cabin(record.cabin.as_deref()),
        title: encode_title(record.name.as_deref().unwrap_or_default()),
    };

    assemble(base).map_err(|e| unprocessable(e.to_string()))
}

/// Serving-time engineering; the input is already complete and validated
pub fn engineer_input(input: &PassengerInput) -> Result<FeatureVector, FeatureError> {
    let base = BaseFields {
        pclass: input.pclass as f64,
        sex: encode_sex(&input.sex)?,
        age: input.age,
        fare: input.fare,
        embarked: encode_embarked(&input.embarked)?,
        sib_sp: input.sib_sp as f64,
        parch: input.parch as f64,
        has_cabin: has_cabin(input.cabin.as_deref()),
        title: encode_title(&input.name),
    };

    assemble(base)
}

/// Steps 3 and 4
fn assemble(base: BaseFields) -> Result<FeatureVector, FeatureError> {
    let family_size = base.sib_sp + base.parch + 1.0;

    let mut vector = FeatureVector::new();
    for (name, value) in [
        ("Age", base.age),
        ("Fare", base.fare),
        ("Pclass", base.pclass),
        ("Sex", base.sex),
        ("Embarked", base.embarked),
        ("Familysize", family_size),
        ("Isalone", f64::from(u8::from(family_size == 1.0))),
        ("HasCabin", f64::from(u8::from(base.has_cabin))),
        ("Title", base.title),
        ("Pclass_Fare", base.pclass * base.fare),
        ("Age_Fare", base.age * base.fare),
    ] {
        if !vector.set_by_name(name, value) {
            return Err(FeatureError::Invalid(format!("`{name}` is not in the feature layout")));
        }
    }

    match vector.first_non_finite() {
        Some(field) => Err(FeatureError::NonFinite { field: field.to_string() }),
        None => Ok(vector),
    }
}
