use std::sync::Arc;

use anyhow::Result;
use axum::{http::HeaderValue, response::Json, routing::get, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};

use review_collector::api::api_router;
use review_collector::config::Config;
use review_collector::dialogue::{eviction_loop, DialogueStore};
use review_collector::store::SqliteReviewStore;
use review_collector::webhook::webhook_router;
use review_collector::AppState;

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "review-collector"
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting review collector");

    let config = Config::from_env()?;

    info!("Using review database: {}", config.database_path.display());
    let review_store = SqliteReviewStore::new(&config.database_path)?;

    let app_state = Arc::new(AppState {
        review_store: Arc::new(review_store),
        dialogues: Arc::new(DialogueStore::new()),
    });

    // Opt-in sweep for abandoned dialogues; without it they live until the
    // process restarts, like the original system.
    if let Some(ttl) = config.dialogue_ttl {
        info!("Evicting dialogues idle longer than {:?}", ttl);
        let dialogues = app_state.dialogues.clone();
        tokio::spawn(async move {
            eviction_loop(dialogues, ttl).await;
        });
    }

    let mut app = Router::new()
        .route("/health", get(health_check))
        .merge(webhook_router())
        .merge(api_router())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    if let Some(origin) = &config.cors_allowed_origin {
        info!("Allowing CORS from {}", origin);
        let origin = origin
            .parse::<HeaderValue>()
            .map_err(|_| anyhow::anyhow!("CORS_ALLOWED_ORIGIN is not a valid origin"))?;
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    let app = app.with_state(app_state);

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Server listening on port {}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
