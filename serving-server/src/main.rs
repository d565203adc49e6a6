//! Titanic Serving
//!
//! Command-line entry points of the survival pipeline and its prediction
//! server.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  ingest   ┌─────────────┐  process  ┌───────────────┐
//! │  PostgreSQL  │ ────────► │ JSONL split │ ────────► │ Feature store │
//! └──────────────┘           └─────────────┘           └───────┬───────┘
//!                                                   train      │ serve
//!                                             ┌────────────────┤
//!                                             ▼                ▼
//!                                      ┌────────────┐   ┌──────────────┐
//!                                      │  Artifact  │──►│ Axum server  │
//!                                      └────────────┘   └──────────────┘
//! ```

mod commands;
mod config;
mod db;
mod error;
mod handlers;
mod models;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use clap::Parser;
use feature_core::ServingContext;
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

pub use error::{AppError, AppResult};

/// Titanic survival pipeline
#[derive(Parser, Debug)]
#[command(name = "titanic-serving", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Pull passengers from PostgreSQL and write the train/test splits
    Ingest,
    /// Engineer the training split into the feature store
    Process {
        /// JSONL split to process (defaults to the ingested train split)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Train the classifier on the feature store and save the artifact
    Train,
    /// Serve predictions over HTTP
    Serve {
        /// Listen port (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run ingest, process and train in sequence
    Pipeline {
        /// Keep running and serve the freshly trained model
        #[arg(long)]
        serve: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let mut config = config::Config::from_env()?;

    // Initialize logging; `log` records from feature-core are bridged in
    let fmt_layer = if config.is_production() {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "titanic_serving=info,feature_core=info,tower_http=info".into()))
        .with(fmt_layer)
        .init();

    tracing::info!(
        store = %feature_core::logic::store::redact_url(&config.store_url),
        environment = %config.environment,
        "Titanic serving starting"
    );

    match cli.command {
        Commands::Ingest => commands::ingest(&config).await,
        Commands::Process { input } => {
            let input = input.unwrap_or_else(|| config.train_path());
            commands::process(&config, &input).await
        }
        Commands::Train => commands::train(&config).await,
        Commands::Pipeline { serve: false } => commands::pipeline(&config).await.map(|_| ()),
        Commands::Pipeline { serve: true } => {
            let (store, artifact) = commands::pipeline(&config).await?;
            let ctx = commands::build_context(&config, store, artifact).await?;
            serve(config, ctx).await
        }
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            let ctx = commands::load_context(&config).await?;
            serve(config, ctx).await
        }
    }
}

async fn serve(config: config::Config, ctx: Arc<ServingContext>) -> anyhow::Result<()> {
    // Build application state
    let state = AppState {
        ctx,
        config: Arc::new(config),
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));

    // Build router
    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<ServingContext>,
    pub config: Arc<config::Config>,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/v1/predict", post(handlers::predict::predict))
        .route("/api/v1/entities/:id", get(handlers::entities::get))
        .route("/api/v1/entities/:id/predict", get(handlers::entities::predict));

    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict_form))
        .merge(api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
