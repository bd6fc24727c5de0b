use std::{net::SocketAddr, str::FromStr, time::Duration};

use reqwest::Client;
use tracing::warn;

use crate::transcript::CascadePolicy;

#[derive(Debug, Clone)]
pub struct Config {
  pub bind_addr: SocketAddr,
  pub youtube_api_key: Option<String>,
  /// bounds one strategy attempt, retries included
  pub strategy_timeout: Duration,
  /// bounds a single HTTP request
  pub http_timeout: Duration,
  pub cascade_policy: CascadePolicy,
}

impl Config {
  pub fn from_env() -> Self {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  // Unparseable values fall back to the default with a warning rather
  // than refusing to start.
  fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
    let parsed = |key: &str| -> Option<String> {
      lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
    };

    let mut bind_addr = parse_or(
      "BIND_ADDR",
      parsed("BIND_ADDR"),
      SocketAddr::from(([0, 0, 0, 0], 3000)),
    );
    if let Some(port) = parsed("PORT") {
      bind_addr.set_port(parse_or("PORT", Some(port), bind_addr.port()));
    }

    let secs = |key: &str, default: u64| {
      Duration::from_secs(parse_or(key, parsed(key), default))
    };

    Self {
      bind_addr,
      youtube_api_key: parsed("YOUTUBE_API_KEY"),
      strategy_timeout: secs("STRATEGY_TIMEOUT_SECS", 45),
      http_timeout: secs("HTTP_TIMEOUT_SECS", 20),
      cascade_policy: parse_or(
        "CASCADE_POLICY",
        parsed("CASCADE_POLICY"),
        CascadePolicy::default(),
      ),
    }
  }

  /// The client every strategy shares.
  pub fn http_client(&self) -> reqwest::Result<Client> {
    Client::builder().timeout(self.http_timeout).build()
  }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> T {
  let Some(value) = value else {
    return default;
  };

  value.parse().unwrap_or_else(|_| {
    warn!("ignoring {key}={value:?}, using the default");
    default
  })
}

impl Default for Config {
  fn default() -> Self {
    Self::from_lookup(|_| None)
  }
}
