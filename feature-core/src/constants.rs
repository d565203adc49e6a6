//! Central Configuration Constants
//!
//! Single source of truth for defaults shared by the pipeline and the server.

/// Namespace prefix of every feature store key
pub const ENTITY_KEY_PREFIX: &str = "entity";

/// Fixed suffix of every feature store key
pub const ENTITY_KEY_SUFFIX: &str = "features";

/// Delimiter joining prefix, entity id and suffix
pub const KEY_DELIMITER: &str = ":";

/// Default feature store location
pub const DEFAULT_STORE_URL: &str = "redis://127.0.0.1:6379/0";

/// Store URL scheme selecting the in-process backend
pub const MEMORY_STORE_URL: &str = "memory://";

/// Connect + initial PING budget (milliseconds)
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;

/// Per-command budget (milliseconds)
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 1_000;

/// Attempts per store command, first try included
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// First backoff between attempts (milliseconds), doubled each retry
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 50;

/// Backoff ceiling (milliseconds)
pub const DEFAULT_RETRY_MAX_BACKOFF_MS: u64 = 1_000;

/// Keys per SCAN page / MGET / pipeline chunk
pub const STORE_BATCH_SIZE: usize = 500;

/// Drift significance level before multiple-testing correction
pub const DEFAULT_SIGNIFICANCE: f64 = 0.05;

/// Seed for splits, bootstrap sampling and feature subsampling
pub const DEFAULT_RANDOM_STATE: u64 = 42;

/// Held-out share for train/test splits
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Default model artifact location
pub const DEFAULT_MODEL_PATH: &str = "artifacts/models/random_forest_model.json";

/// Default directory for ingested raw splits
pub const DEFAULT_RAW_DIR: &str = "artifacts/raw";

/// Raw split file names inside the raw directory
pub const TRAIN_FILE: &str = "train.jsonl";
pub const TEST_FILE: &str = "test.jsonl";

/// Crate version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
