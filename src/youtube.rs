use std::sync::Arc;

use axum::{
  extract::{rejection::JsonRejection, Path, Query, State},
  Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
  availability::{Availability, AvailabilityChecker},
  transcript::{
    ErrorKind, ExtractionError, StrategyKind, TranscriptExtractor,
    TranscriptResult,
  },
  video_id::VideoId,
  Result,
};

pub struct AppState {
  pub extractor: TranscriptExtractor,
  pub availability: AvailabilityChecker,
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, Deserialize)]
pub struct TranscriptRequest {
  url: Option<String>,
  #[serde(default)]
  strategy: Option<StrategyKind>,
}

#[derive(Debug, Deserialize)]
pub struct UrlRequest {
  url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
  url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckResponse<'a> {
  success: bool,
  #[serde(flatten)]
  availability: &'a Availability,
  status_message: &'static str,
}

fn missing_url(message: impl Into<String>) -> ExtractionError {
  ExtractionError::with_message(ErrorKind::InvalidUrl, message)
    .with_user_message("Please provide a YouTube URL.")
}

fn bad_body(rejection: JsonRejection) -> ExtractionError {
  ExtractionError::with_message(
    ErrorKind::InvalidUrl,
    format!("Invalid request body: {}", rejection.body_text()),
  )
  .with_user_message(
    "The request could not be read. Please check the URL and options and try again.",
  )
}

fn required_url(url: Option<String>) -> Result<String, ExtractionError> {
  url
    .filter(|u| !u.trim().is_empty())
    .ok_or_else(|| missing_url("YouTube URL is required in the request body."))
}

fn transcript_body(url: &str, result: TranscriptResult) -> Value {
  json!({
    "success": true,
    "url": url,
    "transcript": result.text,
    "metadata": {
      "title": result.title,
      "duration": result.duration,
      "videoId": result.video_id,
    },
  })
}

/// POST /api/youtube/transcript
pub async fn get_transcript(
  State(state): State<SharedState>,
  body: std::result::Result<Json<TranscriptRequest>, JsonRejection>,
) -> Result<Json<Value>> {
  let Json(req) = body.map_err(bad_body)?;
  let url = required_url(req.url)?;

  let result = state
    .extractor
    .extract_transcript_with(&url, req.strategy.into())
    .await?;

  Ok(Json(transcript_body(&url, result)))
}

/// GET /api/youtube/check/:video_id
pub async fn check_video_by_id(
  State(state): State<SharedState>,
  Path(video_id): Path<String>,
) -> Result<Json<Value>> {
  check(&state, &video_id).await
}

/// GET /api/youtube/check?url=
pub async fn check_video(
  State(state): State<SharedState>,
  Query(query): Query<CheckQuery>,
) -> Result<Json<Value>> {
  let url = query.url.filter(|u| !u.trim().is_empty()).ok_or_else(|| {
    ExtractionError::with_message(ErrorKind::InvalidUrl, "Video ID or URL is required")
      .with_user_message("Please provide a valid YouTube URL or video ID.")
  })?;

  check(&state, &url).await
}

async fn check(state: &AppState, input: &str) -> Result<Json<Value>> {
  let video_id = VideoId::parse(input)?;
  let availability = state.availability.check_availability(&video_id).await;

  Ok(Json(json!(CheckResponse {
    success: true,
    availability: &availability,
    status_message: availability.status_message(),
  })))
}

/// POST /api/youtube/validate
pub async fn validate_url(
  body: std::result::Result<Json<UrlRequest>, JsonRejection>,
) -> Result<Json<Value>> {
  let Json(req) = body.map_err(bad_body)?;
  let video_id = VideoId::parse(&required_url(req.url)?)?;

  Ok(Json(json!({
    "success": true,
    "videoId": video_id,
    "url": video_id.watch_url(),
  })))
}
