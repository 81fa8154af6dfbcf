//! Health orchestrator - routes health questions to specialist responders
//!
//! A supervisor state machine classifies each request and dispatches it to
//! one of six responders, or runs the personal health summary flow.

mod api;
mod archive;
mod classifier;
mod config;
mod conversation;
mod fetch;
mod jobs;
mod llm;
mod responders;
mod runtime;
mod supervisor;

use api::{create_router, AppState};
use archive::{SqliteArchive, TurnArchive};
use classifier::LlmClassifier;
use config::Config;
use fetch::DataSources;
use jobs::JobStore;
use llm::{DisabledService, LlmService};
use responders::{Generator, ResponderRegistry};
use runtime::TurnRuntime;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "health_orchestrator=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env()?;

    let llm: Arc<dyn LlmService> = if let Some(llm) = llm::from_config(&config.llm) {
        tracing::info!(model = %llm.model_id(), "LLM initialized");
        llm
    } else {
        tracing::warn!("No LLM API key configured. Set OPENAI_API_KEY.");
        Arc::new(DisabledService)
    };

    let sources = DataSources::from_config(&config.sources)?;
    let generator = Generator::new(llm.clone(), config.llm.timeout, config.sources.timeout);
    let responders = ResponderRegistry::standard(&generator, &sources);
    let classifier = Arc::new(LlmClassifier::new(llm, config.llm.timeout));
    let runtime = TurnRuntime::new(classifier, responders, config.max_hops);

    let shutdown = CancellationToken::new();
    let jobs = JobStore::new(config.jobs.ttl);
    let sweeper = jobs.spawn_sweeper(config.jobs.sweep_interval, shutdown.clone());

    let archive: Option<Arc<dyn TurnArchive>> = match &config.archive_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            tracing::info!(path = %path.display(), "Opening turn archive");
            Some(Arc::new(SqliteArchive::open(path)?))
        }
        None => None,
    };

    let state = AppState::new(runtime, jobs, archive);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new().gzip(true).br(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(max_hops = config.max_hops, "Health orchestrator listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    sweeper.await?;
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        }
        () = shutdown.cancelled() => {}
    }
    tracing::info!("Shutting down");
}
