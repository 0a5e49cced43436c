use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::RemoteConfig;

use super::{Gateway, RemoteError, RemoteRequest, RemoteStatusError};

/// reqwest-backed gateway to the hiring service
#[derive(Clone)]
pub struct HttpGateway {
  client: reqwest::Client,
  base_url: Url,
  token: Option<String>,
}

impl HttpGateway {
  pub fn new(config: &RemoteConfig, token: Option<String>) -> Result<Self, RemoteError> {
    let base_url =
      Url::parse(&config.base_url).map_err(|e| RemoteError::InvalidUrl(e.to_string()))?;

    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| RemoteError::Transport(format!("failed to build http client: {}", e)))?;

    Ok(Self {
      client,
      base_url,
      token,
    })
  }

  /// Join a request path onto the base URL, keeping any base path prefix.
  fn url_for(&self, path: &str) -> Result<Url, RemoteError> {
    let base = self.base_url.as_str().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    Url::parse(&format!("{}/{}", base, path)).map_err(|e| RemoteError::InvalidUrl(e.to_string()))
  }
}

impl Gateway for HttpGateway {
  async fn send(&self, request: RemoteRequest) -> Result<Value, RemoteError> {
    let url = self.url_for(&request.path)?;
    debug!(method = %request.method, %url, "remote request");

    let mut builder = self
      .client
      .request(request.method.clone(), url)
      .header(CONTENT_TYPE, "application/json");

    if let Some(token) = &self.token {
      builder = builder.bearer_auth(token);
    }
    for (name, value) in &request.headers {
      builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(body) = &request.body {
      builder = builder.body(body.to_string());
    }

    let response = builder
      .send()
      .await
      .map_err(|e| RemoteError::Transport(e.to_string()))?;

    let status = response.status();
    let text = response.text().await.map_err(|e| {
      if status.is_success() {
        RemoteError::Codec(format!("unreadable body: {}", e))
      } else {
        RemoteError::Transport(e.to_string())
      }
    })?;
    let body = parse_body(&text);

    if !status.is_success() {
      return Err(RemoteStatusError::new(status.as_u16(), body).into());
    }

    Ok(body)
  }
}

/// Parse a response body as JSON, keeping the raw text when it is not JSON.
fn parse_body(text: &str) -> Value {
  if text.trim().is_empty() {
    return Value::Null;
  }
  serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
