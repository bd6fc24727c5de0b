use std::fmt;

use reqwest::StatusCode;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::util::Transient;

pub type Details = Map<String, Value>;

/// Every way a transcript request can fail, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
  #[serde(rename = "INVALID_URL")]
  InvalidUrl,
  #[serde(rename = "VIDEO_NOT_FOUND")]
  VideoNotFound,
  #[serde(rename = "VIDEO_PRIVATE")]
  VideoPrivate,
  #[serde(rename = "VIDEO_AGE_RESTRICTED")]
  AgeRestricted,
  #[serde(rename = "VIDEO_LIVE_STREAM")]
  LiveStream,
  #[serde(rename = "VIDEO_TOO_LONG")]
  TooLong,
  #[serde(rename = "NO_CAPTIONS_AVAILABLE")]
  NoCaptionsAvailable,
  #[serde(rename = "REGION_BLOCKED")]
  RegionBlocked,
  #[serde(rename = "EXTRACTION_FAILED")]
  ExtractionFailed,
  #[serde(rename = "RATE_LIMITED")]
  RateLimited,
  #[serde(rename = "NETWORK_ERROR")]
  NetworkError,
}

struct Entry {
  status: u16,
  retry: bool,
  fallback: bool,
  message: &'static str,
}

impl ErrorKind {
  pub const ALL: [ErrorKind; 11] = [
    ErrorKind::InvalidUrl,
    ErrorKind::VideoNotFound,
    ErrorKind::VideoPrivate,
    ErrorKind::AgeRestricted,
    ErrorKind::LiveStream,
    ErrorKind::TooLong,
    ErrorKind::NoCaptionsAvailable,
    ErrorKind::RegionBlocked,
    ErrorKind::ExtractionFailed,
    ErrorKind::RateLimited,
    ErrorKind::NetworkError,
  ];

  fn entry(self) -> Entry {
    use ErrorKind::*;

    let (status, retry, fallback, message) = match self {
      InvalidUrl => (
        400,
        false,
        false,
        "Invalid YouTube URL format. Please check the link and try again.",
      ),
      VideoNotFound => (
        404,
        false,
        false,
        "This video does not exist or has been deleted.",
      ),
      VideoPrivate => (
        403,
        false,
        false,
        "This video is private. Only public videos can be transcribed.",
      ),
      AgeRestricted => (
        403,
        false,
        false,
        "Age-restricted videos cannot be transcribed automatically.",
      ),
      LiveStream => (
        400,
        false,
        false,
        "Live streams cannot be transcribed. Please wait until the stream ends.",
      ),
      TooLong => (
        400,
        false,
        false,
        "Videos longer than 3 hours cannot be transcribed.",
      ),
      NoCaptionsAvailable => (
        404,
        false,
        true,
        "No captions available for this video. The creator may not have added subtitles.",
      ),
      RegionBlocked => (
        403,
        false,
        false,
        "This video is not available in your region.",
      ),
      ExtractionFailed => (
        500,
        true,
        false,
        "Failed to extract transcript. Please try again later.",
      ),
      RateLimited => (
        429,
        true,
        false,
        "Too many requests. Please wait a moment and try again.",
      ),
      NetworkError => (
        503,
        true,
        false,
        "Network error. Please check your connection and try again.",
      ),
    };

    Entry {
      status,
      retry,
      fallback,
      message,
    }
  }

  pub fn as_str(self) -> &'static str {
    use ErrorKind::*;

    match self {
      InvalidUrl => "INVALID_URL",
      VideoNotFound => "VIDEO_NOT_FOUND",
      VideoPrivate => "VIDEO_PRIVATE",
      AgeRestricted => "VIDEO_AGE_RESTRICTED",
      LiveStream => "VIDEO_LIVE_STREAM",
      TooLong => "VIDEO_TOO_LONG",
      NoCaptionsAvailable => "NO_CAPTIONS_AVAILABLE",
      RegionBlocked => "REGION_BLOCKED",
      ExtractionFailed => "EXTRACTION_FAILED",
      RateLimited => "RATE_LIMITED",
      NetworkError => "NETWORK_ERROR",
    }
  }

  pub fn status_code(self) -> StatusCode {
    StatusCode::from_u16(self.entry().status)
      .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
  }

  pub fn can_retry(self) -> bool {
    self.entry().retry
  }

  /// Only a missing caption track is worth retrying as audio transcription.
  pub fn suggest_fallback(self) -> bool {
    self.entry().fallback
  }

  pub fn user_message(self) -> &'static str {
    self.entry().message
  }

  /// Conditions no other backend can get around for the same video.
  pub fn is_permanent(self) -> bool {
    matches!(
      self,
      ErrorKind::VideoNotFound | ErrorKind::VideoPrivate | ErrorKind::LiveStream
    )
  }
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

enum Pattern {
  Any(&'static [&'static str]),
  Both(&'static str, &'static [&'static str]),
}

impl Pattern {
  fn matches(&self, msg: &str) -> bool {
    match self {
      Pattern::Any(needles) => needles.iter().any(|n| msg.contains(n)),
      Pattern::Both(first, rest) => {
        msg.contains(first) && rest.iter().any(|n| msg.contains(n))
      }
    }
  }
}

// Evaluated top to bottom; specific conditions sit above generic ones.
const PRECEDENCE: &[(Pattern, ErrorKind)] = &[
  (Pattern::Any(&["private", "sign in"]), ErrorKind::VideoPrivate),
  (
    Pattern::Any(&[
      "age restrict",
      "age-restrict",
      "confirm your age",
      "inappropriate for some users",
      "restricted",
    ]),
    ErrorKind::AgeRestricted,
  ),
  (
    Pattern::Any(&["not found", "does not exist", "unavailable"]),
    ErrorKind::VideoNotFound,
  ),
  (
    Pattern::Any(&[
      "live stream",
      "livestream",
      "live event",
      "is live",
      "premiere",
    ]),
    ErrorKind::LiveStream,
  ),
  (
    Pattern::Any(&[
      "no caption",
      "no transcript",
      "transcript is disabled",
      "transcripts are disabled",
      "subtitles",
    ]),
    ErrorKind::NoCaptionsAvailable,
  ),
  (
    Pattern::Any(&["blocked", "country", "region"]),
    ErrorKind::RegionBlocked,
  ),
  (
    Pattern::Any(&["rate limit", "rate-limit", "too many", "429"]),
    ErrorKind::RateLimited,
  ),
  (
    Pattern::Any(&[
      "network",
      "timeout",
      "timed out",
      "econnrefused",
      "connection refused",
      "connection reset",
    ]),
    ErrorKind::NetworkError,
  ),
  (
    Pattern::Both("invalid", &["url", " id", "videoid", "video_id"]),
    ErrorKind::InvalidUrl,
  ),
];

/// Best-effort guess at an [`ErrorKind`] from a free-form failure message.
pub fn classify(message: &str) -> ErrorKind {
  let msg = message.to_lowercase();

  PRECEDENCE
    .iter()
    .find(|(pattern, _)| pattern.matches(&msg))
    .map(|(_, kind)| *kind)
    .unwrap_or(ErrorKind::ExtractionFailed)
}

/// HTTP statuses that carry a meaning of their own regardless of body.
pub fn classify_status(status: StatusCode) -> Option<ErrorKind> {
  if status == StatusCode::TOO_MANY_REQUESTS {
    Some(ErrorKind::RateLimited)
  } else if status.is_server_error() {
    Some(ErrorKind::NetworkError)
  } else {
    None
  }
}

/// A classified failure, ready to be handed to a client.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ExtractionError {
  code: ErrorKind,
  message: String,
  user_message: &'static str,
  details: Details,
}

pub fn error_for(
  code: ErrorKind,
  custom_message: Option<String>,
  details: Option<Details>,
) -> ExtractionError {
  ExtractionError {
    code,
    message: custom_message
      .unwrap_or_else(|| code.user_message().to_owned()),
    user_message: code.user_message(),
    details: details.unwrap_or_default(),
  }
}

impl ExtractionError {
  pub fn new(code: ErrorKind) -> Self {
    error_for(code, None, None)
  }

  pub fn with_message(code: ErrorKind, message: impl Into<String>) -> Self {
    error_for(code, Some(message.into()), None)
  }

  /// Runs an unexpected error through the classifier, keeping its text.
  pub fn from_unexpected(err: &dyn std::error::Error) -> Self {
    let message = err.to_string();
    let mut details = Details::new();
    details.insert("originalError".into(), Value::String(message.clone()));
    error_for(classify(&message), Some(message), Some(details))
  }

  /// Replaces the table text for the rare caller-side failure that has
  /// a better hint of its own.
  pub fn with_user_message(mut self, user_message: &'static str) -> Self {
    self.user_message = user_message;
    self
  }

  pub fn code(&self) -> ErrorKind {
    self.code
  }

  pub fn message(&self) -> &str {
    &self.message
  }

  pub fn user_message(&self) -> &str {
    self.user_message
  }

  pub fn status_code(&self) -> StatusCode {
    self.code.status_code()
  }

  pub fn can_retry(&self) -> bool {
    self.code.can_retry()
  }

  pub fn suggest_fallback(&self) -> bool {
    self.code.suggest_fallback()
  }

  pub fn details(&self) -> &Details {
    &self.details
  }
}

impl Serialize for ExtractionError {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Wire<'a> {
      code: ErrorKind,
      message: &'a str,
      user_message: &'a str,
      can_retry: bool,
      suggest_audio_transcription: bool,
      details: &'a Details,
    }

    Wire {
      code: self.code,
      message: &self.message,
      user_message: self.user_message,
      can_retry: self.can_retry(),
      suggest_audio_transcription: self.suggest_fallback(),
      details: &self.details,
    }
    .serialize(serializer)
  }
}

/// Raw failure reported by a single strategy. Carries a kind only when
/// the backend gave a structured signal; otherwise the message is
/// classified by the extractor.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct StrategyError {
  pub message: String,
  pub kind: Option<ErrorKind>,
}

impl StrategyError {
  pub fn msg(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      kind: None,
    }
  }

  pub fn kind(kind: ErrorKind, message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      kind: Some(kind),
    }
  }

  pub fn classify(&self) -> ErrorKind {
    self.kind.unwrap_or_else(|| classify(&self.message))
  }
}

impl Transient for StrategyError {
  fn is_transient(&self) -> bool {
    matches!(
      self.kind,
      Some(ErrorKind::NetworkError | ErrorKind::RateLimited)
    )
  }
}

impl From<reqwest::Error> for StrategyError {
  fn from(err: reqwest::Error) -> Self {
    let kind = if err.is_timeout() || err.is_connect() {
      Some(ErrorKind::NetworkError)
    } else {
      err.status().and_then(classify_status)
    };

    Self {
      message: err.to_string(),
      kind,
    }
  }
}

impl From<serde_json::Error> for StrategyError {
  fn from(err: serde_json::Error) -> Self {
    Self::msg(format!("malformed response: {err}"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn table_is_deterministic() {
    for code in ErrorKind::ALL {
      let a = error_for(code, None, None);
      let b = error_for(code, Some("custom".into()), Some(Details::new()));

      assert_eq!(a.status_code(), b.status_code());
      assert_eq!(a.can_retry(), b.can_retry());
      assert_eq!(a.suggest_fallback(), b.suggest_fallback());
      assert_eq!(a.user_message(), b.user_message());
      assert_eq!(a, error_for(code, None, None));
    }
  }

  #[test]
  fn status_codes_match_table() {
    use ErrorKind::*;

    let expected = [
      (InvalidUrl, 400),
      (VideoNotFound, 404),
      (VideoPrivate, 403),
      (AgeRestricted, 403),
      (LiveStream, 400),
      (TooLong, 400),
      (NoCaptionsAvailable, 404),
      (RegionBlocked, 403),
      (ExtractionFailed, 500),
      (RateLimited, 429),
      (NetworkError, 503),
    ];

    for (code, status) in expected {
      assert_eq!(code.status_code().as_u16(), status, "{code}");
    }
  }

  #[test]
  fn only_transient_kinds_are_retriable() {
    let retriable: Vec<_> =
      ErrorKind::ALL.into_iter().filter(|k| k.can_retry()).collect();
    assert_eq!(
      retriable,
      vec![
        ErrorKind::ExtractionFailed,
        ErrorKind::RateLimited,
        ErrorKind::NetworkError
      ]
    );

    let fallback: Vec<_> = ErrorKind::ALL
      .into_iter()
      .filter(|k| k.suggest_fallback())
      .collect();
    assert_eq!(fallback, vec![ErrorKind::NoCaptionsAvailable]);
  }

  #[test]
  fn custom_message_keeps_user_message() {
    let err = error_for(
      ErrorKind::RateLimited,
      Some("upstream said 429".into()),
      None,
    );
    assert_eq!(err.message(), "upstream said 429");
    assert_eq!(
      err.user_message(),
      "Too many requests. Please wait a moment and try again."
    );

    let err = ExtractionError::new(ErrorKind::InvalidUrl)
      .with_user_message("Please provide a YouTube URL.");
    assert_eq!(err.user_message(), "Please provide a YouTube URL.");
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
  }

  #[test]
  fn classify_each_branch() {
    use ErrorKind::*;

    let samples = [
      ("This video is private", VideoPrivate),
      ("Sign in to confirm you're not a bot", VideoPrivate),
      ("Video is age-restricted", AgeRestricted),
      ("Please confirm your age", AgeRestricted),
      ("Video not found", VideoNotFound),
      ("This video does not exist", VideoNotFound),
      ("Video unavailable", VideoNotFound),
      ("This live event will begin in a few moments", LiveStream),
      ("Premiere starts in 2 hours", LiveStream),
      ("No captions found for this video", NoCaptionsAvailable),
      ("Transcript is disabled on this video", NoCaptionsAvailable),
      ("The uploader has not made this video available in your country", RegionBlocked),
      ("Request blocked", RegionBlocked),
      ("Too Many Requests", RateLimited),
      ("HTTP 429", RateLimited),
      ("network unreachable", NetworkError),
      ("operation timed out", NetworkError),
      ("connect ECONNREFUSED 127.0.0.1:443", NetworkError),
      ("Invalid video id", InvalidUrl),
      ("Invalid YouTube URL", InvalidUrl),
      ("Invalid videoId", InvalidUrl),
      ("invalid video_id parameter", InvalidUrl),
      ("invalid json in response", ExtractionFailed),
      ("something odd happened", ExtractionFailed),
      ("", ExtractionFailed),
    ];

    for (message, kind) in samples {
      assert_eq!(classify(message), kind, "{message:?}");
    }
  }

  #[test]
  fn age_is_checked_before_not_found() {
    assert_eq!(
      classify("Age-restricted video: player response not found"),
      ErrorKind::AgeRestricted
    );
  }

  #[test]
  fn private_is_checked_before_unavailable() {
    assert_eq!(
      classify("Private video. This video is unavailable"),
      ErrorKind::VideoPrivate
    );
  }

  #[test]
  fn status_hints() {
    assert_eq!(
      classify_status(StatusCode::TOO_MANY_REQUESTS),
      Some(ErrorKind::RateLimited)
    );
    assert_eq!(
      classify_status(StatusCode::BAD_GATEWAY),
      Some(ErrorKind::NetworkError)
    );
    assert_eq!(classify_status(StatusCode::NOT_FOUND), None);
  }

  #[test]
  fn native_kind_wins_over_message() {
    let err = StrategyError::kind(ErrorKind::RateLimited, "video not found");
    assert_eq!(err.classify(), ErrorKind::RateLimited);
    assert_eq!(StrategyError::msg("video not found").classify(), ErrorKind::VideoNotFound);
  }

  #[test]
  fn serializes_to_wire_shape() {
    let mut details = Details::new();
    details.insert("videoId".into(), Value::String("dQw4w9WgXcQ".into()));
    let err = error_for(ErrorKind::NoCaptionsAvailable, None, Some(details));

    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(
      json,
      serde_json::json!({
        "code": "NO_CAPTIONS_AVAILABLE",
        "message": "No captions available for this video. The creator may not have added subtitles.",
        "userMessage": "No captions available for this video. The creator may not have added subtitles.",
        "canRetry": false,
        "suggestAudioTranscription": true,
        "details": { "videoId": "dQw4w9WgXcQ" }
      })
    );
  }
}
