//! Logic Module - Pipeline & Serving Engines
//!
//! - `features/` - Feature layout, encoding tables, engineering
//! - `dataset/` - Raw records and JSONL splits
//! - `store/` - Entity-keyed feature store (Redis, in-memory)
//! - `reference/` - Scaler + reference matrix
//! - `drift/` - Kolmogorov-Smirnov drift detection
//! - `model/` - Random forest classifier and artifact
//! - `pipeline/` - Processing and training runs
//! - `serving` - Immutable serving context

pub mod dataset;
pub mod drift;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod reference;
pub mod serving;
pub mod store;
