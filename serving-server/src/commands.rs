//! Pipeline stages behind the CLI subcommands

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use feature_core::logic::dataset::{split_records, write_records};
use feature_core::logic::pipeline::{process_file, run_training, TrainingConfig};
use feature_core::{open_store, FeatureStore, ModelArtifact, RawRecord, ServingContext};

use crate::config::Config;
use crate::db;

/// PostgreSQL → train/test JSONL splits
pub async fn ingest(config: &Config) -> anyhow::Result<()> {
    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to the source database")?;

    let rows = db::fetch_passengers(&pool, &config.source_table).await?;
    if rows.is_empty() {
        bail!("source table {} returned no rows", config.source_table);
    }

    let records: Vec<RawRecord> = rows.into_iter().map(RawRecord::from).collect();
    let (train, test) = split_records(records, config.test_fraction, config.random_state);

    write_records(&config.train_path(), &train)?;
    write_records(&config.test_path(), &test)?;

    tracing::info!(train = train.len(), test = test.len(), "Ingestion complete");
    Ok(())
}

/// Train split → engineered features in the store
pub async fn process(config: &Config, input: &Path) -> anyhow::Result<()> {
    let store = open(config).await?;
    process_into(store.as_ref(), input).await
}

async fn process_into(store: &dyn FeatureStore, input: &Path) -> anyhow::Result<()> {
    let report = process_file(input, store)
        .await
        .with_context(|| format!("Failed to process {}", input.display()))?;

    tracing::info!(
        read = report.read,
        stored = report.stored,
        skipped = report.skipped,
        "Processing complete"
    );
    Ok(())
}

/// Store snapshot → model artifact
pub async fn train(config: &Config) -> anyhow::Result<()> {
    let store = open(config).await?;
    train_from(store.as_ref(), config).await.map(|_| ())
}

async fn train_from(store: &dyn FeatureStore, config: &Config) -> anyhow::Result<ModelArtifact> {
    let training = TrainingConfig {
        params: config.forest_params(),
        test_fraction: config.test_fraction,
        seed: config.random_state,
        model_path: config.model_path.clone(),
    };

    let artifact = run_training(store, &training).await?;
    tracing::info!(
        path = %config.model_path.display(),
        population = artifact.metrics.population,
        train_accuracy = artifact.metrics.train_accuracy,
        test_accuracy = ?artifact.metrics.test_accuracy,
        "Training complete"
    );
    Ok(artifact)
}

/// ingest → process → train on one store handle
///
/// Returns the store and the fresh artifact so a `memory://` run can be
/// served from the same process.
pub async fn pipeline(config: &Config) -> anyhow::Result<(Arc<dyn FeatureStore>, ModelArtifact)> {
    ingest(config).await?;
    let store = open(config).await?;
    process_into(store.as_ref(), &config.train_path()).await?;
    let artifact = train_from(store.as_ref(), config).await?;
    Ok((store, artifact))
}

/// Store + saved artifact → ready serving context; any failure aborts startup
pub async fn load_context(config: &Config) -> anyhow::Result<Arc<ServingContext>> {
    let store = open(config).await?;

    let artifact = ModelArtifact::load(&config.model_path)
        .with_context(|| format!("Failed to load model artifact {}", config.model_path.display()))?;

    build_context(config, store, artifact).await
}

pub async fn build_context(
    config: &Config,
    store: Arc<dyn FeatureStore>,
    artifact: ModelArtifact,
) -> anyhow::Result<Arc<ServingContext>> {
    let ctx = ServingContext::bootstrap(store, artifact, config.drift_config())
        .await
        .context("Failed to build serving context")?;

    Ok(Arc::new(ctx))
}

async fn open(config: &Config) -> anyhow::Result<Arc<dyn FeatureStore>> {
    open_store(&config.store_config())
        .await
        .context("Failed to open feature store")
}
