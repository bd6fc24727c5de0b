use std::sync::Arc;

use axum::{
  http::{Request, StatusCode},
  middleware::{self, Next},
  response::{IntoResponse, Response},
  routing::{get, post},
  Json, Router,
};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod availability;
mod config;
mod error;
mod transcript;
mod util;
mod video_id;
mod youtube;

pub use error::{Error, Result};

use availability::AvailabilityChecker;
use config::Config;
use transcript::TranscriptExtractor;
use youtube::AppState;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "youtube_transcript_service=info".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = Config::from_env();
  let client = config.http_client()?;

  if config.youtube_api_key.is_none() {
    info!("YOUTUBE_API_KEY not set, the official API strategy will be skipped");
  }

  let state = Arc::new(AppState {
    extractor: TranscriptExtractor::from_config(&config, client.clone()),
    availability: AvailabilityChecker::new(client),
  });

  let app = Router::new()
    .route("/health", get(health))
    .route("/api/youtube/transcript", post(youtube::get_transcript))
    .route("/api/youtube/check", get(youtube::check_video))
    .route("/api/youtube/check/:video_id", get(youtube::check_video_by_id))
    .route("/api/youtube/validate", post(youtube::validate_url))
    .fallback(not_found)
    .layer(middleware::from_fn(log_request))
    .with_state(state);

  info!("Listening on {}", config.bind_addr);

  axum::Server::bind(&config.bind_addr)
    .serve(app.into_make_service())
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| Error::Server(e.to_string()))?;

  info!("server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!("failed to listen for ctrl-c: {e}");
    std::future::pending::<()>().await;
  }
  info!("shutting down");
}

async fn log_request<B>(req: Request<B>, next: Next<B>) -> Response {
  info!("{} {}", req.method(), req.uri().path());
  next.run(req).await
}

async fn health() -> impl IntoResponse {
  Json(json!({
    "status": "ok",
    "timestamp": chrono::Utc::now().to_rfc3339(),
  }))
}

async fn not_found() -> impl IntoResponse {
  (StatusCode::NOT_FOUND, Json(json!({ "error": "Route not found" })))
}
