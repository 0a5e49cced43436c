//! Remote gateway: a minimal JSON-over-HTTP seam to the hiring service.
//!
//! Every call either resolves to a parsed JSON body or fails with a
//! [`RemoteError`]. Nothing here decides what happens on failure; that is
//! the job of [`crate::cache::FallbackLayer`].

mod api_types;
mod client;
mod error;

pub use api_types::{decode, ItemsResponse, OkResponse, ReorderBody, SubmitBody};
pub use client::HttpGateway;
pub use error::{RemoteError, RemoteStatusError};

use reqwest::Method;
use serde_json::Value;
use std::future::Future;

/// A request addressed to the remote service, relative to its base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
  pub method: Method,
  /// Path plus encoded query string, e.g. `/jobs?page=1`
  pub path: String,
  pub headers: Vec<(String, String)>,
  pub body: Option<Value>,
}

impl RemoteRequest {
  pub fn new(method: Method, path: impl Into<String>) -> Self {
    Self {
      method,
      path: path.into(),
      headers: Vec::new(),
      body: None,
    }
  }

  pub fn get(path: impl Into<String>) -> Self {
    Self::new(Method::GET, path)
  }

  pub fn post(path: impl Into<String>, body: Value) -> Self {
    Self::new(Method::POST, path).with_body(body)
  }

  pub fn patch(path: impl Into<String>, body: Value) -> Self {
    Self::new(Method::PATCH, path).with_body(body)
  }

  pub fn put(path: impl Into<String>, body: Value) -> Self {
    Self::new(Method::PUT, path).with_body(body)
  }

  pub fn with_body(mut self, body: Value) -> Self {
    self.body = Some(body);
    self
  }

  pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.push((name.into(), value.into()));
    self
  }

  /// Append url-encoded query parameters to the path.
  pub fn with_query<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
  where
    K: AsRef<str>,
    V: AsRef<str>,
  {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
      serializer.append_pair(key.as_ref(), value.as_ref());
    }
    let query = serializer.finish();
    if !query.is_empty() {
      let sep = if self.path.contains('?') { '&' } else { '?' };
      self.path = format!("{}{}{}", self.path, sep, query);
    }
    self
  }

  /// Path without the query string.
  pub fn route(&self) -> &str {
    self.path.split('?').next().unwrap_or(&self.path)
  }

  /// Decoded query parameters.
  pub fn query_pairs(&self) -> Vec<(String, String)> {
    match self.path.split_once('?') {
      Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect(),
      None => Vec::new(),
    }
  }
}

/// Transport to the remote hiring service.
pub trait Gateway: Send + Sync {
  /// Send a request and return the parsed response body.
  fn send(&self, request: RemoteRequest) -> impl Future<Output = Result<Value, RemoteError>> + Send;
}
