use std::str::FromStr;

use futures::future::join;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::transcript::{
  fetch_player_response, ErrorKind, PlayerResponse, StrategyError,
  MAX_DURATION_SECS,
};
use crate::video_id::VideoId;

/// Pre-flight answer for a single video. Never an error in itself: a
/// failed page check is reported through `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
  pub video_id: VideoId,
  pub reachable: bool,
  pub has_captions: bool,
  pub title: Option<String>,
  pub duration: Option<u64>,
  pub is_live: bool,
  pub error: Option<ErrorKind>,
}

impl Availability {
  pub fn status_message(&self) -> &'static str {
    match self.error {
      Some(kind) => kind.user_message(),
      None if self.has_captions => "Video is ready for transcript extraction",
      None => "Video found but may not have captions available",
    }
  }
}

#[derive(Debug)]
struct Metadata {
  title: String,
  duration: u64,
  is_live: bool,
}

pub struct AvailabilityChecker {
  client: Client,
  ytextract: ytextract::Client,
}

impl AvailabilityChecker {
  pub fn new(client: Client) -> Self {
    Self {
      client,
      ytextract: ytextract::Client::new(),
    }
  }

  pub async fn check_availability(&self, video_id: &VideoId) -> Availability {
    let (metadata, player) = join(
      self.metadata(video_id),
      fetch_player_response(&self.client, video_id),
    )
    .await;

    if let Err(e) = &metadata {
      debug!("{video_id}: metadata lookup failed: {e}");
    }

    let availability = assess(video_id.clone(), metadata, player);
    info!(
      "{video_id}: reachable={} captions={} error={:?}",
      availability.reachable, availability.has_captions, availability.error
    );
    availability
  }

  async fn metadata(&self, video_id: &VideoId) -> Result<Metadata, StrategyError> {
    let id = ytextract::video::Id::from_str(video_id.as_str()).map_err(|_| {
      StrategyError::kind(
        ErrorKind::InvalidUrl,
        format!("invalid video id {video_id}"),
      )
    })?;

    let video = self
      .ytextract
      .video(id)
      .await
      .map_err(|e| StrategyError::msg(e.to_string()))?;

    Ok(Metadata {
      title: video.title().to_string(),
      duration: video.duration().as_secs(),
      is_live: video.live(),
    })
  }
}

// The player response is authoritative for reachability and captions;
// metadata fills in whatever it leaves out.
fn assess(
  video_id: VideoId,
  metadata: Result<Metadata, StrategyError>,
  player: Result<PlayerResponse, StrategyError>,
) -> Availability {
  let metadata = metadata.ok();

  let (reachable, has_captions, page_error, from_player) = match player {
    Ok(player) => match player.check_playable() {
      Ok(()) => (true, !player.caption_tracks().is_empty(), None, Some(player)),
      Err(e) => (false, false, Some(e.classify()), Some(player)),
    },
    Err(e) => (metadata.is_some(), false, Some(e.classify()), None),
  };

  let title = from_player
    .as_ref()
    .and_then(PlayerResponse::title)
    .or_else(|| {
      metadata
        .as_ref()
        .map(|m| m.title.clone())
        .filter(|t| !t.trim().is_empty())
    });
  let duration = from_player
    .as_ref()
    .and_then(PlayerResponse::duration)
    .or_else(|| metadata.as_ref().map(|m| m.duration))
    .filter(|d| *d > 0);
  let is_live = from_player.as_ref().is_some_and(PlayerResponse::is_live)
    || metadata.as_ref().is_some_and(|m| m.is_live);

  let error = page_error
    .or_else(|| is_live.then_some(ErrorKind::LiveStream))
    .or_else(|| {
      duration
        .filter(|d| *d > MAX_DURATION_SECS)
        .map(|_| ErrorKind::TooLong)
    });

  Availability {
    video_id,
    reachable,
    has_captions,
    title,
    duration,
    is_live,
    error,
  }
}
