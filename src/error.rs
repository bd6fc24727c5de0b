use axum::{
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use tracing::error;

use crate::transcript::ExtractionError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error(transparent)]
  Extraction(#[from] ExtractionError),
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
  #[error("http client error: {0}")]
  Http(#[from] reqwest::Error),
  #[error("server error: {0}")]
  Server(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  /// The client-facing form: domain errors as they are, anything else
  /// run through the same classifier.
  pub fn into_extraction(self) -> ExtractionError {
    match self {
      Error::Extraction(err) => err,
      other => {
        error!("unexpected error: {other}");
        ExtractionError::from_unexpected(&other)
      }
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let err = self.into_extraction();
    let status = err.status_code();
    (status, Json(json!({ "success": false, "error": err }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use axum::http::StatusCode;

  use super::*;
  use crate::transcript::ErrorKind;

  #[test]
  fn extraction_errors_keep_their_status() {
    let res = Error::from(ExtractionError::new(ErrorKind::VideoPrivate))
      .into_response();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
  }

  #[test]
  fn unexpected_errors_are_classified() {
    let io = std::io::Error::new(
      std::io::ErrorKind::ConnectionRefused,
      "connection refused",
    );
    let err = Error::from(io).into_extraction();

    assert_eq!(err.code(), ErrorKind::NetworkError);
    assert_eq!(err.details()["originalError"], "io error: connection refused");
  }
}
