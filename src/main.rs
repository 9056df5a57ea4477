//! Resume gateway server
//!
//! Serves the interrupt/resume protocol over HTTP in front of the built-in
//! document drafting workflow.

use resume_gateway::api::{create_router, AppState};
use resume_gateway::config::ServerConfig;
use resume_gateway::workflow::{DocumentWorkflow, PolicyRules, Workflow};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resume_gateway=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = ServerConfig::from_env();

    std::fs::create_dir_all(&config.output_dir)?;
    tracing::info!(
        output_dir = %config.output_dir.display(),
        blocked_terms = ?config.blocked_terms,
        checkpoint_ttl_secs = config.checkpoint_ttl.as_secs(),
        "Document workflow configured"
    );

    let workflow = Arc::new(DocumentWorkflow::new(
        config.output_dir.clone(),
        PolicyRules::new(&config.blocked_terms),
    ));

    let shared: Arc<dyn Workflow> = workflow.clone();
    let state = AppState::new(shared);

    // Suspended executions and sessions nobody came back for
    let checkpoints = Arc::clone(&workflow);
    let sessions = state.dispatcher.store().clone();
    let ttl = config.checkpoint_ttl;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let expired = checkpoints.expire_older_than(ttl);
            let evicted = sessions.expire_older_than(ttl);
            if expired > 0 || evicted > 0 {
                tracing::info!(expired, evicted, "Expired stale checkpoints");
            }
        }
    });

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new().gzip(true).br(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Resume gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
