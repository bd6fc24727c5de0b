use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::transcript::error::{ErrorKind, ExtractionError};

// tried in order, first match wins
static URL_PATTERNS: Lazy<[Regex; 4]> = Lazy::new(|| {
  [
    // youtube.com/watch?...&v=ID
    Regex::new(r"youtube\.com/watch\?(?:[^#]*&)?v=([^&\n?#]+)").unwrap(),
    // youtu.be/ID
    Regex::new(r"youtu\.be/([^&\n?#/]+)").unwrap(),
    // youtube.com/embed/ID
    Regex::new(r"youtube\.com/embed/([^&\n?#/]+)").unwrap(),
    // youtube.com/shorts/ID
    Regex::new(r"youtube\.com/shorts/([^&\n?#/]+)").unwrap(),
  ]
});

static ID_SHAPE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());

/// Canonical 11-character YouTube video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
  /// Accepts watch, short-link, embed and shorts URLs, or a bare id.
  pub fn parse(input: &str) -> Result<Self, ExtractionError> {
    let input = input.trim();

    let candidate = URL_PATTERNS
      .iter()
      .find_map(|re| re.captures(input))
      .and_then(|caps| caps.get(1))
      .map(|m| m.as_str())
      .or_else(|| ID_SHAPE.is_match(input).then_some(input));

    match candidate {
      Some(id) if ID_SHAPE.is_match(id) => Ok(Self(id.to_owned())),
      _ => Err(ExtractionError::with_message(
        ErrorKind::InvalidUrl,
        format!("Invalid YouTube URL: {input}"),
      )),
    }
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn watch_url(&self) -> String {
    format!("https://www.youtube.com/watch?v={}", self.0)
  }
}

impl fmt::Display for VideoId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}
