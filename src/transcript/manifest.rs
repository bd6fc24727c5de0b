use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::video_id::VideoId;

use super::error::{ErrorKind, StrategyError};
use super::player::PlayerResponse;
use super::timedtext;
use super::{Strategy, StrategyKind, Transcript};

// reads the caption manifest embedded in the watch page and downloads the
// chosen track's timed text directly.
pub struct Manifest {
  client: Client,
}

impl Manifest {
  pub fn new(client: Client) -> Self {
    Self { client }
  }
}

/// Fetches the watch page and returns its embedded player response.
pub async fn fetch_player_response(
  client: &Client,
  video_id: &VideoId,
) -> Result<PlayerResponse, StrategyError> {
  let url = format!("{}&hl=en", video_id.watch_url());
  let html = timedtext::get_with_retry(client, &url, "watch page").await?;

  PlayerResponse::from_watch_page(&html)
}

#[async_trait]
impl Strategy for Manifest {
  fn kind(&self) -> StrategyKind {
    StrategyKind::Manifest
  }

  async fn attempt(
    &self,
    video_id: &VideoId,
  ) -> Result<Transcript, StrategyError> {
    let player = fetch_player_response(&self.client, video_id).await?;
    player.check_playable()?;

    let track = timedtext::choose_track(player.caption_tracks(), |t| {
      t.language_code.as_str()
    })
    .ok_or_else(|| {
      StrategyError::kind(
        ErrorKind::NoCaptionsAvailable,
        format!("no caption tracks listed for {video_id}"),
      )
    })?;

    debug!("manifest: using {} track for {video_id}", track.language_code);
    let text = timedtext::fetch_text(&self.client, &track.base_url).await?;

    Ok(Transcript {
      text,
      title: player.title(),
      duration: player.duration(),
    })
  }
}
