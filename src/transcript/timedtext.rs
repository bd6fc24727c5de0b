use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{header, Client};
use tracing::debug;

use super::error::{classify_status, ErrorKind, StrategyError};
use super::join_segments;
use crate::util::{retry_linear, RETRY_ATTEMPTS, RETRY_STEP};

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
  AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

static TEXT_ELEMENT: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?s)<text\b[^>]*>(.*?)</text>").unwrap());

static FORMAT_PARAM: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"&fmt=[^&]*").unwrap());

/// English if there is one, otherwise whatever comes first.
pub fn choose_track<T>(tracks: &[T], language: impl Fn(&T) -> &str) -> Option<&T> {
  tracks
    .iter()
    .find(|t| {
      let lang = language(t);
      lang == "en" || lang.starts_with("en-")
    })
    .or_else(|| tracks.first())
}

/// Drops any explicit format so the endpoint answers with plain XML.
pub fn xml_url(base_url: &str) -> String {
  FORMAT_PARAM.replace_all(base_url, "").into_owned()
}

pub fn unescape(s: &str) -> String {
  // `&amp;` last so `&amp;lt;` decodes to `&lt;`, not `<`
  s.replace("&lt;", "<")
    .replace("&gt;", ">")
    .replace("&quot;", "\"")
    .replace("&#39;", "'")
    .replace("&amp;", "&")
}

/// Text of every `<text>` element, unescaped, in document order.
pub fn parse_segments(xml: &str) -> Vec<String> {
  TEXT_ELEMENT
    .captures_iter(xml)
    .map(|caps| unescape(&caps[1]))
    .collect()
}

/// GETs `url` as a browser would, retrying transient failures with a
/// linear backoff. `what` names the document in logs and errors.
pub async fn get_with_retry(
  client: &Client,
  url: &str,
  what: &str,
) -> Result<String, StrategyError> {
  retry_linear(RETRY_ATTEMPTS, RETRY_STEP, move |attempt| async move {
    debug!("fetching {what} (attempt {attempt}): {url}");

    let resp = client
      .get(url)
      .header(header::USER_AGENT, BROWSER_USER_AGENT)
      .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      let message = format!("{what} request failed with HTTP {status}");
      return Err(match classify_status(status) {
        Some(kind) => StrategyError::kind(kind, message),
        None => StrategyError::msg(message),
      });
    }

    Ok(resp.text().await?)
  })
  .await
}

/// Fetches and flattens one caption track into a single line of text.
pub async fn fetch_text(client: &Client, base_url: &str) -> Result<String, StrategyError> {
  let xml = get_with_retry(client, &xml_url(base_url), "timed-text").await?;
  let text = join_segments(parse_segments(&xml));

  if text.is_empty() {
    return Err(StrategyError::kind(
      ErrorKind::NoCaptionsAvailable,
      "caption track is empty",
    ));
  }

  Ok(text)
}
