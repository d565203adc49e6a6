use thiserror::Error;

use super::layout::LayoutMismatchError;

/// Schema / encoding failures for a single record or request
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("field `{field}` is not coercible to a number: {value}")]
    NotCoercible { field: String, value: String },

    #[error("unrecognized value `{value}` for categorical field `{field}`")]
    UnknownCategory { field: String, value: String },

    #[error("feature `{field}` is not a finite number")]
    NonFinite { field: String },

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("unprocessable record {entity}: {reason}")]
    Unprocessable { entity: String, reason: String },

    #[error("cannot fit imputation statistics: {0}")]
    EmptyPopulation(String),

    #[error(transparent)]
    Layout(#[from] LayoutMismatchError),
}

impl FeatureError {
    /// True when the caller sent bad input (as opposed to a data or layout problem)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FeatureError::MissingField(_)
                | FeatureError::NotCoercible { .. }
                | FeatureError::UnknownCategory { .. }
                | FeatureError::NonFinite { .. }
                | FeatureError::Invalid(_)
        )
    }
}
