pub mod error;
mod extractor;
mod innertube;
mod manifest;
mod official;
mod player;
mod scraper;
mod timedtext;

use std::{fmt, str::FromStr};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::video_id::VideoId;

pub use self::error::{ErrorKind, ExtractionError, StrategyError};
pub use extractor::{CascadePolicy, TranscriptExtractor, MAX_DURATION_SECS};
pub use innertube::InnerTube;
pub use manifest::Manifest;
pub use official::OfficialApi;
pub use scraper::Scraper;

pub(crate) use manifest::fetch_player_response;
pub(crate) use player::PlayerResponse;

/// What a strategy hands back; the extractor fills in the gaps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
  pub text: String,
  pub title: Option<String>,
  /// seconds
  pub duration: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptResult {
  pub text: String,
  pub title: String,
  pub duration: Option<u64>,
  pub video_id: VideoId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
  Scraper,
  #[serde(alias = "embedded")]
  InnerTube,
  Manifest,
  #[serde(alias = "api")]
  Official,
}

impl StrategyKind {
  pub fn as_str(self) -> &'static str {
    match self {
      StrategyKind::Scraper => "scraper",
      StrategyKind::InnerTube => "innertube",
      StrategyKind::Manifest => "manifest",
      StrategyKind::Official => "official",
    }
  }
}

impl fmt::Display for StrategyKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for StrategyKind {
  type Err = ExtractionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "scraper" => Ok(StrategyKind::Scraper),
      "innertube" | "embedded" => Ok(StrategyKind::InnerTube),
      "manifest" => Ok(StrategyKind::Manifest),
      "official" | "api" => Ok(StrategyKind::Official),
      other => Err(ExtractionError::with_message(
        ErrorKind::ExtractionFailed,
        format!("unknown extraction strategy: {other}"),
      )),
    }
  }
}

/// One way of getting a transcript for a video.
#[async_trait]
pub trait Strategy: Send + Sync {
  fn kind(&self) -> StrategyKind;

  /// Whether the default cascade should try this strategy. One that is
  /// bound to fail as configured sits out, but can still be selected on
  /// its own.
  fn in_cascade(&self) -> bool {
    true
  }

  async fn attempt(&self, video_id: &VideoId)
    -> Result<Transcript, StrategyError>;
}

/// Joins caption segments with single spaces, dropping blank ones.
pub(crate) fn join_segments<I, S>(segments: I) -> String
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  segments
    .into_iter()
    .map(|s| s.as_ref().split_whitespace().collect::<Vec<_>>().join(" "))
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}
