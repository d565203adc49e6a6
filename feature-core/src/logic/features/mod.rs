//! Features Module - Feature Engineering Engine
//!
//! One layout, one set of encoding tables, one assembly routine. Training
//! records and serving requests go through the same `assemble` step, so a
//! passenger produces the same vector on both paths.

pub mod encoding;
pub mod engineer;
pub mod error;
pub mod imputation;
pub mod layout;
pub mod request;
pub mod vector;


// Re-export common types
pub use engineer::{engineer_input, engineer_record};
pub use error::FeatureError;
pub use imputation::ImputationStats;
pub use layout::{
    layout_hash, LayoutInfo, LayoutMismatchError, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION,
    LABEL_FIELD,
};
pub use request::PassengerInput;
pub use vector::{FeatureMap, FeatureVector};
