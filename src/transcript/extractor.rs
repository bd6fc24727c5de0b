use std::{str::FromStr, time::Duration};

use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::config::Config;
use crate::util::with_deadline;
use crate::video_id::VideoId;

use super::error::{error_for, Details, ErrorKind, ExtractionError, StrategyError};
use super::{
  InnerTube, Manifest, OfficialApi, Scraper, Strategy, StrategyKind, Transcript,
  TranscriptResult,
};

/// Longest video we are willing to transcribe, in seconds.
pub const MAX_DURATION_SECS: u64 = 3 * 60 * 60;

/// What happens when a strategy reports a condition no other strategy can
/// get around (the video is gone, private or live).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CascadePolicy {
  /// keep going regardless
  #[default]
  Exhaustive,
  ShortCircuit,
}

impl FromStr for CascadePolicy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "exhaustive" => Ok(CascadePolicy::Exhaustive),
      "short-circuit" | "short_circuit" | "shortcircuit" => {
        Ok(CascadePolicy::ShortCircuit)
      }
      other => Err(format!("unknown cascade policy: {other}")),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
  #[default]
  Cascade,
  Only(StrategyKind),
}

impl Selection {
  fn includes(self, strategy: &dyn Strategy) -> bool {
    match self {
      Selection::Cascade => strategy.in_cascade(),
      Selection::Only(only) => only == strategy.kind(),
    }
  }
}

impl From<Option<StrategyKind>> for Selection {
  fn from(kind: Option<StrategyKind>) -> Self {
    kind.map_or(Selection::Cascade, Selection::Only)
  }
}

#[derive(Debug, Serialize)]
struct Attempt {
  strategy: StrategyKind,
  code: ErrorKind,
  message: String,
}

pub struct TranscriptExtractor {
  strategies: Vec<Box<dyn Strategy>>,
  attempt_timeout: Duration,
  policy: CascadePolicy,
}

impl TranscriptExtractor {
  pub fn new(
    strategies: Vec<Box<dyn Strategy>>,
    attempt_timeout: Duration,
    policy: CascadePolicy,
  ) -> Self {
    Self {
      strategies,
      attempt_timeout,
      policy,
    }
  }

  /// The production cascade, cheapest backend first.
  pub fn from_config(config: &Config, client: Client) -> Self {
    let strategies: Vec<Box<dyn Strategy>> = vec![
      Box::new(Scraper),
      Box::new(InnerTube::new(client.clone())),
      Box::new(Manifest::new(client.clone())),
      Box::new(OfficialApi::new(client, config.youtube_api_key.clone())),
    ];

    Self::new(strategies, config.strategy_timeout, config.cascade_policy)
  }

  pub async fn extract_transcript(
    &self,
    url: &str,
  ) -> Result<TranscriptResult, ExtractionError> {
    self.extract_transcript_with(url, Selection::Cascade).await
  }

  pub async fn extract_transcript_with(
    &self,
    url: &str,
    selection: Selection,
  ) -> Result<TranscriptResult, ExtractionError> {
    let video_id = VideoId::parse(url)?;
    let mut attempts = Vec::new();

    let chosen = self.strategies.iter().filter(|s| selection.includes(&***s));
    for strategy in chosen {
      let kind = strategy.kind();
      info!("{video_id}: trying {kind}");

      let failure = match self.run(&**strategy, &video_id).await {
        Ok(transcript) => {
          if let Some(duration) = transcript.duration.filter(|d| *d > MAX_DURATION_SECS) {
            warn!("{video_id}: {duration}s is over the limit");
            return Err(too_long(&video_id, duration));
          }

          info!("{video_id}: {kind} succeeded ({} chars)", transcript.text.len());
          return Ok(normalize(transcript, video_id));
        }
        Err(e) => e,
      };

      let code = failure.classify();
      warn!("{video_id}: {kind} failed with {code}: {failure}");
      attempts.push(Attempt {
        strategy: kind,
        code,
        message: failure.message,
      });

      if self.policy == CascadePolicy::ShortCircuit && code.is_permanent() {
        info!("{video_id}: {code} is permanent, not trying further strategies");
        break;
      }
    }

    Err(exhausted(&video_id, attempts))
  }

  async fn run(
    &self,
    strategy: &dyn Strategy,
    video_id: &VideoId,
  ) -> Result<Transcript, StrategyError> {
    let transcript = with_deadline(self.attempt_timeout, strategy.attempt(video_id))
      .await
      .unwrap_or_else(|| {
        Err(StrategyError::kind(
          ErrorKind::NetworkError,
          format!("{} timed out after {:?}", strategy.kind(), self.attempt_timeout),
        ))
      })?;

    if transcript.text.trim().is_empty() {
      return Err(StrategyError::kind(
        ErrorKind::NoCaptionsAvailable,
        format!("{} returned an empty transcript", strategy.kind()),
      ));
    }

    Ok(transcript)
  }
}

fn normalize(transcript: Transcript, video_id: VideoId) -> TranscriptResult {
  let title = transcript
    .title
    .filter(|t| !t.trim().is_empty())
    .unwrap_or_else(|| format!("Video {video_id}"));

  TranscriptResult {
    text: transcript.text,
    title,
    duration: transcript.duration,
    video_id,
  }
}

fn too_long(video_id: &VideoId, duration: u64) -> ExtractionError {
  let mut details = Details::new();
  details.insert("videoId".into(), json!(video_id));
  details.insert("duration".into(), json!(duration));

  error_for(
    ErrorKind::TooLong,
    Some(format!("{video_id} runs {duration}s, limit is {MAX_DURATION_SECS}s")),
    Some(details),
  )
}

// The last failure decides the reported kind; every attempt is kept in
// the details for diagnosis.
fn exhausted(video_id: &VideoId, attempts: Vec<Attempt>) -> ExtractionError {
  let (code, message) = match attempts.last() {
    Some(last) => (last.code, last.message.clone()),
    None => (
      ErrorKind::ExtractionFailed,
      "no extraction strategy was available".to_owned(),
    ),
  };

  let mut details = Details::new();
  details.insert("videoId".into(), json!(video_id));
  details.insert("attempts".into(), json!(attempts));

  error_for(code, Some(message), Some(details))
}
