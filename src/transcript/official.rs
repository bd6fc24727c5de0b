use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use crate::video_id::VideoId;

use super::error::{classify_status, ErrorKind, StrategyError};
use super::timedtext;
use super::{Strategy, StrategyKind, Transcript};

const DATA_API: &str = "https://www.googleapis.com/youtube/v3";
const TIMEDTEXT: &str = "https://www.youtube.com/api/timedtext";

static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$").unwrap()
});

// YouTube Data API v3 for metadata and the caption list; the caption
// body itself comes from the public timed-text endpoint.
pub struct OfficialApi {
  client: Client,
  api_key: Option<String>,
}

#[derive(Deserialize)]
struct Page<T> {
  #[serde(default = "Vec::new")]
  items: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
  snippet: VideoSnippet,
  content_details: ContentDetails,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
  title: String,
  #[serde(default)]
  live_broadcast_content: Option<String>,
}

#[derive(Deserialize)]
struct ContentDetails {
  duration: String,
}

#[derive(Deserialize)]
struct CaptionItem {
  snippet: CaptionSnippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionSnippet {
  language: String,
  #[serde(default)]
  track_kind: Option<String>,
}

#[derive(Deserialize, Default)]
struct ApiErrorBody {
  #[serde(default)]
  error: ApiError,
}

#[derive(Deserialize, Default)]
struct ApiError {
  #[serde(default)]
  message: String,
  #[serde(default)]
  errors: Vec<ApiErrorReason>,
}

#[derive(Deserialize)]
struct ApiErrorReason {
  #[serde(default)]
  reason: String,
}

impl OfficialApi {
  pub fn new(client: Client, api_key: Option<String>) -> Self {
    Self { client, api_key }
  }

  fn api_key(&self) -> Result<&str, StrategyError> {
    self
      .api_key
      .as_deref()
      .filter(|k| !k.is_empty())
      .ok_or_else(|| {
        StrategyError::kind(
          ErrorKind::ExtractionFailed,
          "YOUTUBE_API_KEY is not configured",
        )
      })
  }

  async fn get<T: DeserializeOwned>(
    &self,
    resource: &str,
    query: &[(&str, &str)],
  ) -> Result<T, StrategyError> {
    let key = self.api_key()?;
    let resp = self
      .client
      .get(format!("{DATA_API}/{resource}"))
      .query(query)
      .query(&[("key", key)])
      .send()
      .await?;

    let status = resp.status();
    if status.is_success() {
      return Ok(resp.json().await?);
    }

    let body: ApiErrorBody = resp.json().await.unwrap_or_default();
    Err(api_failure(status, resource, body.error))
  }
}

fn api_failure(status: StatusCode, resource: &str, error: ApiError) -> StrategyError {
  let message = format!(
    "data api {resource} request failed with HTTP {status}: {}",
    error.message
  );

  let quota = error
    .errors
    .iter()
    .any(|e| matches!(e.reason.as_str(), "quotaExceeded" | "rateLimitExceeded"));

  match classify_status(status) {
    Some(kind) => StrategyError::kind(kind, message),
    None if quota => StrategyError::kind(ErrorKind::RateLimited, message),
    None => StrategyError::msg(message),
  }
}

/// Seconds in an ISO 8601 duration such as `PT1H2M3S`. `None` when the
/// text doesn't parse or the total doesn't fit in a `u64`.
pub fn parse_iso_duration(s: &str) -> Option<u64> {
  let caps = ISO_DURATION.captures(s)?;
  let part = |i: usize, unit: u64| -> Option<u64> {
    match caps.get(i) {
      Some(m) => m.as_str().parse::<u64>().ok()?.checked_mul(unit),
      None => Some(0),
    }
  };

  part(1, 86_400)?
    .checked_add(part(2, 3_600)?)?
    .checked_add(part(3, 60)?)?
    .checked_add(part(4, 1)?)
}

fn timedtext_url(video_id: &VideoId, language: &str, track_kind: Option<&str>) -> String {
  let mut url = format!("{TIMEDTEXT}?v={video_id}&lang={language}");
  if track_kind.is_some_and(|k| k.eq_ignore_ascii_case("asr")) {
    url.push_str("&kind=asr");
  }
  url
}

#[async_trait]
impl Strategy for OfficialApi {
  fn kind(&self) -> StrategyKind {
    StrategyKind::Official
  }

  fn in_cascade(&self) -> bool {
    self.api_key().is_ok()
  }

  async fn attempt(
    &self,
    video_id: &VideoId,
  ) -> Result<Transcript, StrategyError> {
    let id = video_id.as_str();

    let videos: Page<VideoItem> = self
      .get("videos", &[("part", "snippet,contentDetails"), ("id", id)])
      .await?;
    let video = videos.items.into_iter().next().ok_or_else(|| {
      StrategyError::kind(
        ErrorKind::VideoNotFound,
        format!("data api returned no video for {video_id}"),
      )
    })?;

    if matches!(
      video.snippet.live_broadcast_content.as_deref(),
      Some("live" | "upcoming")
    ) {
      return Err(StrategyError::kind(
        ErrorKind::LiveStream,
        format!("{video_id} is live or upcoming"),
      ));
    }

    let captions: Page<CaptionItem> = self
      .get("captions", &[("part", "snippet"), ("videoId", id)])
      .await?;
    let track = timedtext::choose_track(&captions.items, |c| {
      c.snippet.language.as_str()
    })
    .ok_or_else(|| {
      StrategyError::kind(
        ErrorKind::NoCaptionsAvailable,
        format!("data api lists no caption tracks for {video_id}"),
      )
    })?;

    debug!("official: using {} track for {video_id}", track.snippet.language);
    let url = timedtext_url(
      video_id,
      &track.snippet.language,
      track.snippet.track_kind.as_deref(),
    );
    let text = timedtext::fetch_text(&self.client, &url).await?;

    Ok(Transcript {
      text,
      title: Some(video.snippet.title).filter(|t| !t.trim().is_empty()),
      duration: parse_iso_duration(&video.content_details.duration)
        .filter(|d| *d > 0),
    })
  }
}
