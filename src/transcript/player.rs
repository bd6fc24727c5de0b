use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::error::{ErrorKind, StrategyError};

static INITIAL_PLAYER_RESPONSE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?s)ytInitialPlayerResponse\s*=\s*(\{.+?\})\s*;\s*(?:var\s+(?:meta|head)\b|</script>)",
  )
  .unwrap()
});

/// The subset of YouTube's player response this service reads. The same
/// shape comes back from the watch page and from the internal player API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
  #[serde(default)]
  pub playability_status: Option<PlayabilityStatus>,
  #[serde(default)]
  pub video_details: Option<VideoDetails>,
  #[serde(default)]
  pub captions: Option<Captions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayabilityStatus {
  pub status: String,
  #[serde(default)]
  pub reason: Option<String>,
  #[serde(default)]
  pub desktop_legacy_age_gate_reason: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
  #[serde(default)]
  pub title: Option<String>,
  #[serde(default)]
  pub length_seconds: Option<String>,
  #[serde(default)]
  pub is_live: bool,
  #[serde(default)]
  pub is_upcoming: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Captions {
  #[serde(default)]
  pub player_captions_tracklist_renderer: Option<Tracklist>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tracklist {
  #[serde(default)]
  pub caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
  pub base_url: String,
  pub language_code: String,
  #[serde(default)]
  pub kind: Option<String>,
}

impl PlayerResponse {
  /// Pulls the embedded `ytInitialPlayerResponse` out of a watch page.
  pub fn from_watch_page(html: &str) -> Result<Self, StrategyError> {
    let Some(caps) = INITIAL_PLAYER_RESPONSE.captures(html) else {
      if html.contains("g-recaptcha") {
        return Err(StrategyError::kind(
          ErrorKind::RateLimited,
          "watch page served a captcha challenge",
        ));
      }
      return Err(StrategyError::msg("watch page carries no player response"));
    };

    Ok(serde_json::from_str(&caps[1])?)
  }

  /// Maps a non-OK playability status to a failure. Statuses with a
  /// definite meaning carry a kind; the rest are left to the classifier.
  pub fn check_playable(&self) -> Result<(), StrategyError> {
    let Some(status) = &self.playability_status else {
      return Ok(());
    };

    let reason = status
      .reason
      .clone()
      .unwrap_or_else(|| format!("playability status {}", status.status));

    match status.status.as_str() {
      "OK" => Ok(()),
      _ if status.desktop_legacy_age_gate_reason.is_some() => {
        Err(StrategyError::kind(ErrorKind::AgeRestricted, reason))
      }
      "ERROR" => Err(StrategyError::kind(ErrorKind::VideoNotFound, reason)),
      "LIVE_STREAM_OFFLINE" => {
        Err(StrategyError::kind(ErrorKind::LiveStream, reason))
      }
      _ => Err(StrategyError::msg(reason)),
    }
  }

  pub fn title(&self) -> Option<String> {
    self
      .video_details
      .as_ref()
      .and_then(|d| d.title.clone())
      .filter(|t| !t.trim().is_empty())
  }

  pub fn duration(&self) -> Option<u64> {
    self
      .video_details
      .as_ref()
      .and_then(|d| d.length_seconds.as_deref())
      .and_then(|s| s.parse().ok())
  }

  pub fn is_live(&self) -> bool {
    self
      .video_details
      .as_ref()
      .map(|d| d.is_live || d.is_upcoming)
      .unwrap_or(false)
  }

  pub fn caption_tracks(&self) -> &[CaptionTrack] {
    self
      .captions
      .as_ref()
      .and_then(|c| c.player_captions_tracklist_renderer.as_ref())
      .map(|r| r.caption_tracks.as_slice())
      .unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const WATCH_PAGE: &str = r#"<html><script nonce="x">var ytInitialPlayerResponse = {"playabilityStatus":{"status":"OK"},"videoDetails":{"videoId":"dQw4w9WgXcQ","title":"Never Gonna Give You Up","lengthSeconds":"212","isLiveContent":false},"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ&lang=de","languageCode":"de"},{"baseUrl":"https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ&lang=en","languageCode":"en","kind":"asr"}]}}};var meta = document.createElement('meta');</script></html>"#;

  #[test]
  fn parses_watch_page() {
    let player = PlayerResponse::from_watch_page(WATCH_PAGE).unwrap();

    assert!(player.check_playable().is_ok());
    assert_eq!(player.title().as_deref(), Some("Never Gonna Give You Up"));
    assert_eq!(player.duration(), Some(212));
    assert!(!player.is_live());
    assert_eq!(player.caption_tracks().len(), 2);
    assert_eq!(player.caption_tracks()[1].kind.as_deref(), Some("asr"));
  }

  #[test]
  fn missing_player_response() {
    let err = PlayerResponse::from_watch_page("<html></html>").unwrap_err();
    assert_eq!(err.classify(), ErrorKind::ExtractionFailed);

    let err = PlayerResponse::from_watch_page(r#"<div class="g-recaptcha">"#)
      .unwrap_err();
    assert_eq!(err.classify(), ErrorKind::RateLimited);
  }

  fn with_status(json: &str) -> PlayerResponse {
    serde_json::from_str(json).unwrap()
  }

  #[test]
  fn playability_mapping() {
    let cases = [
      (
        r#"{"playabilityStatus":{"status":"ERROR","reason":"Video unavailable"}}"#,
        ErrorKind::VideoNotFound,
      ),
      (
        r#"{"playabilityStatus":{"status":"LOGIN_REQUIRED","reason":"Sign in to confirm your age","desktopLegacyAgeGateReason":1}}"#,
        ErrorKind::AgeRestricted,
      ),
      (
        r#"{"playabilityStatus":{"status":"LOGIN_REQUIRED","reason":"This video is private"}}"#,
        ErrorKind::VideoPrivate,
      ),
      (
        r#"{"playabilityStatus":{"status":"LIVE_STREAM_OFFLINE","reason":"Premieres in 3 hours"}}"#,
        ErrorKind::LiveStream,
      ),
      (
        r#"{"playabilityStatus":{"status":"UNPLAYABLE","reason":"The uploader has not made this video available in your country"}}"#,
        ErrorKind::RegionBlocked,
      ),
    ];

    for (json, kind) in cases {
      let err = with_status(json).check_playable().unwrap_err();
      assert_eq!(err.classify(), kind, "{json}");
    }
  }

  #[test]
  fn no_captions_block_means_no_tracks() {
    let player = with_status(r#"{"videoDetails":{"title":"  ","isLive":true}}"#);
    assert!(player.caption_tracks().is_empty());
    assert_eq!(player.title(), None);
    assert!(player.is_live());
  }
}
