use crate::{config::Config, routes, state::AppState};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use inference::{
    DecisionRule, Evaluator, Normalizer, Pipeline, backend::ort::OrtClassifier,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(routes::health))
        .route("/evaluate", post(routes::evaluate))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Loads the model and assembles the request pipeline.
pub fn load_pipeline(config: &Config) -> anyhow::Result<Pipeline> {
    let classifier = OrtClassifier::load(&config.model_path, config.ort_options())?;

    Ok(Pipeline::new(
        Normalizer::new(config.normalizer_config()),
        Evaluator::new(DecisionRule::new(config.positive_threshold)),
        Arc::new(classifier),
    ))
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    tracing::info!(model_path = %config.model_path, "Loading inference model");

    let load_config = config.clone();
    let pipeline = match tokio::task::spawn_blocking(move || load_pipeline(&load_config)).await? {
        Ok(pipeline) => {
            tracing::info!("Successfully loaded model");
            Some(Arc::new(pipeline))
        }
        Err(e) => {
            // Unavailable until restart: every /evaluate answers 500
            tracing::error!(
                error = %e,
                model_path = %config.model_path,
                "Failed to load model; /evaluate will report it unavailable"
            );
            None
        }
    };

    let state = AppState::new(pipeline, &config.upload_field);
    let app = build_router(state, config.max_upload_bytes);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server is running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
