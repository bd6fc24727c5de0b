use async_trait::async_trait;
use yt_transcript_rs::{
  api::YouTubeTranscriptApi,
  errors::{CouldNotRetrieveTranscript, CouldNotRetrieveTranscriptReason as Reason},
};

use crate::video_id::VideoId;

use super::error::{ErrorKind, StrategyError};
use super::{join_segments, Strategy, StrategyKind, Transcript};

const LANGUAGES: &[&str] = &["en", "en-US", "en-GB"];

// Reasons the library already tells apart keep their kind; the rest go
// through the message classifier.
fn scraper_failure(err: CouldNotRetrieveTranscript) -> StrategyError {
  let kind = match &err.reason {
    Some(Reason::TranscriptsDisabled | Reason::NoTranscriptFound { .. }) => {
      ErrorKind::NoCaptionsAvailable
    }
    Some(Reason::VideoUnavailable) => ErrorKind::VideoNotFound,
    Some(Reason::AgeRestricted) => ErrorKind::AgeRestricted,
    Some(Reason::IpBlocked(_) | Reason::RequestBlocked(_)) => {
      ErrorKind::RateLimited
    }
    Some(Reason::InvalidVideoId) => ErrorKind::InvalidUrl,
    _ => return StrategyError::msg(err.to_string()),
  };

  StrategyError::kind(kind, err.to_string())
}

// scrapes the timed-text data straight from the watch page. Fastest of
// the bunch, and the first to break when YouTube changes its markup.
pub struct Scraper;

#[async_trait]
impl Strategy for Scraper {
  fn kind(&self) -> StrategyKind {
    StrategyKind::Scraper
  }

  async fn attempt(
    &self,
    video_id: &VideoId,
  ) -> Result<Transcript, StrategyError> {
    let api = YouTubeTranscriptApi::new(None, None, None)
      .map_err(|e| StrategyError::msg(format!("scraper setup failed: {e}")))?;

    let fetched = api
      .fetch_transcript(video_id.as_str(), LANGUAGES, false)
      .await
      .map_err(scraper_failure)?;

    let text = join_segments(fetched.snippets.iter().map(|s| s.text.as_str()));
    if text.is_empty() {
      return Err(StrategyError::kind(
        ErrorKind::NoCaptionsAvailable,
        format!("scraper returned no transcript segments for {video_id}"),
      ));
    }

    Ok(Transcript {
      text,
      ..Default::default()
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn failure(reason: Option<Reason>) -> CouldNotRetrieveTranscript {
    CouldNotRetrieveTranscript {
      video_id: "dQw4w9WgXcQ".into(),
      reason,
    }
  }

  #[test]
  fn library_reasons_keep_their_kind() {
    let cases = [
      (Reason::VideoUnavailable, ErrorKind::VideoNotFound),
      (Reason::TranscriptsDisabled, ErrorKind::NoCaptionsAvailable),
      (Reason::AgeRestricted, ErrorKind::AgeRestricted),
      (Reason::IpBlocked(None), ErrorKind::RateLimited),
      (Reason::RequestBlocked(None), ErrorKind::RateLimited),
      (Reason::InvalidVideoId, ErrorKind::InvalidUrl),
    ];

    for (reason, kind) in cases {
      assert_eq!(scraper_failure(failure(Some(reason))).classify(), kind);
    }
  }

  #[test]
  fn other_reasons_fall_back_to_the_message() {
    let err = scraper_failure(failure(Some(Reason::YouTubeRequestFailed(
      "connection reset by peer".into(),
    ))));
    assert_eq!(err.classify(), ErrorKind::NetworkError);

    let err = scraper_failure(failure(Some(Reason::YouTubeDataUnparsable(
      "unexpected markup".into(),
    ))));
    assert_eq!(err.classify(), ErrorKind::ExtractionFailed);
  }
}
