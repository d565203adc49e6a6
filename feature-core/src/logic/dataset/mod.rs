//! Dataset Module - Raw passenger records and train/test splits
//!
//! Splits are stored as JSONL files (one `RawRecord` per line) between the
//! ingestion and processing stages.

pub mod record;
pub mod writer;


use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;

pub use record::RawRecord;
pub use writer::{read_records, write_records};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("no records found in {0}")]
    Empty(String),
}

/// Number of held-out items for a split of `len` items
///
/// Rounds up like the usual `test_size` convention, but always leaves at
/// least one item for training.
pub fn test_count(len: usize, test_fraction: f64) -> usize {
    if len < 2 {
        return 0;
    }
    let count = (len as f64 * test_fraction.clamp(0.0, 1.0)).ceil() as usize;
    count.min(len - 1)
}

/// Seeded shuffle followed by a (train, test) split
pub fn split_shuffled<T>(mut items: Vec<T>, test_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);

    let n_test = test_count(items.len(), test_fraction);
    let test = items.split_off(items.len() - n_test);
    (items, test)
}

/// Train/test split of raw records
pub fn split_records(
    records: Vec<RawRecord>,
    test_fraction: f64,
    seed: u64,
) -> (Vec<RawRecord>, Vec<RawRecord>) {
    split_shuffled(records, test_fraction, seed)
}
