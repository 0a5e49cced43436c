use serde_json::Value;
use thiserror::Error;

/// A non-2xx response from the remote service.
///
/// `body` is the parsed JSON body, or the raw text as a JSON string when the
/// body was not JSON.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct RemoteStatusError {
  pub status: u16,
  pub body: Value,
  pub message: String,
}

impl RemoteStatusError {
  /// Build the error, preferring a server-provided `message` field.
  pub fn new(status: u16, body: Value) -> Self {
    let message = body
      .get("message")
      .and_then(Value::as_str)
      .filter(|m| !m.is_empty())
      .map(String::from)
      .unwrap_or_else(|| format!("HTTP {}", status));

    Self {
      status,
      body,
      message,
    }
  }
}

/// Any failure of a remote call.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
  #[error(transparent)]
  Status(#[from] RemoteStatusError),

  /// The request never produced a response (connection refused, DNS, TLS).
  #[error("request failed: {0}")]
  Transport(String),

  /// A 2xx response body did not match the expected shape.
  #[error("unexpected body: {0}")]
  Codec(String),

  /// The configured base URL cannot be joined with a request path.
  #[error("invalid url: {0}")]
  InvalidUrl(String),
}

impl RemoteError {
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Status(e) => Some(e.status),
      _ => None,
    }
  }

  /// The service answered 2xx, so whatever was sent has been applied.
  pub fn was_delivered(&self) -> bool {
    matches!(self, Self::Codec(_))
  }
}
