//! Processing - raw training split → engineered features in the store

use std::collections::BTreeMap;
use std::path::Path;

use crate::logic::dataset::{read_records, RawRecord};
use crate::logic::features::{engineer_record, FeatureMap, ImputationStats, LABEL_FIELD};
use crate::logic::store::{EntityId, FeatureStore};

use super::PipelineError;

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingReport {
    pub read: usize,
    pub stored: usize,
    pub skipped: usize,
    pub imputation: ImputationStats,
}

/// Engineer every labelled record and write the batch
///
/// Unprocessable or unlabelled rows are logged and skipped.
pub async fn process_records(
    records: &[RawRecord],
    store: &dyn FeatureStore,
) -> Result<ProcessingReport, PipelineError> {
    let imputation = ImputationStats::fit(records)?;

    let mut batch: BTreeMap<EntityId, FeatureMap> = BTreeMap::new();
    let mut skipped = 0usize;

    for record in records {
        let Some(label) = record.survived else {
            log::warn!("[Processing] Skipping passenger {}: no Survived label", record.passenger_id);
            skipped += 1;
            continue;
        };

        match engineer_record(record, &imputation) {
            Ok(vector) => {
                let mut features = vector.to_feature_map();
                features.insert(LABEL_FIELD.to_string(), label as f64);
                batch.insert(record.entity_id(), features);
            }
            Err(e) => {
                log::warn!("[Processing] Skipping record: {}", e);
                skipped += 1;
            }
        }
    }

    if batch.is_empty() {
        return Err(PipelineError::NothingProcessed { skipped });
    }

    store.set_batch(&batch).await?;

    log::info!(
        "[Processing] Stored {} entities in {} store ({} skipped)",
        batch.len(),
        store.backend(),
        skipped
    );

    Ok(ProcessingReport {
        read: records.len(),
        stored: batch.len(),
        skipped,
        imputation,
    })
}

/// Read a JSONL split, then `process_records`
pub async fn process_file(path: &Path, store: &dyn FeatureStore) -> Result<ProcessingReport, PipelineError> {
    let records = read_records(path)?;
    process_records(&records, store).await
}
