//! Titanic Feature Core
//!
//! Training/serving consistency core for the survival classifier:
//!
//! ```text
//! raw records ──► features::engineer ──► store (entity:<id>:features)
//!                                            │
//!                        bulk read at startup▼
//!                            reference::ReferenceDistribution
//!                               │ scaler        │ reference matrix
//! request ──► engineer ──► scale ─┬─► drift::KsDriftDetector (side channel)
//!                                 └─► model::RandomForest ──► label
//! ```
//!
//! The feature layout in [`logic::features::layout`] is the only place the
//! schema is defined.

pub mod constants;
pub mod logic;

pub use logic::dataset::RawRecord;
pub use logic::drift::{Correction, DriftConfig, DriftVerdict, KsDriftDetector};
pub use logic::features::{
    FeatureError, FeatureMap, FeatureVector, PassengerInput, FEATURE_COUNT, FEATURE_LAYOUT,
    LABEL_FIELD,
};
pub use logic::model::{Classifier, ForestParams, ModelArtifact, RandomForest};
pub use logic::reference::{ReferenceDistribution, StandardScaler};
pub use logic::serving::{Prediction, ServingContext, ServingError, StartupError};
pub use logic::store::{
    open_store, EntityId, FeatureStore, InMemoryFeatureStore, RedisFeatureStore, Snapshot,
    StoreConfig, StoreError,
};
