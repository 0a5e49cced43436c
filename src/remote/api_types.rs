//! Serde types for the remote service's envelopes.
//!
//! Entity records share their shape with the domain types in
//! [`crate::hiring::types`]; only the wrappers live here.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::RemoteError;

/// Decode a parsed response body into a typed value.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, RemoteError> {
  serde_json::from_value(value).map_err(|e| RemoteError::Codec(e.to_string()))
}

/// `{items}` response used by the timeline endpoint.
#[derive(Debug, Deserialize)]
pub struct ItemsResponse<T> {
  #[serde(default = "Vec::new")]
  pub items: Vec<T>,
}

/// `{ok}` acknowledgement.
///
/// Any 2xx body is an acknowledgement: an empty body, a bare value or an
/// object without `ok` all read as `ok: true`. Only an explicit
/// `{"ok": false}` (or a bare `false`) reads as false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OkResponse {
  pub ok: bool,
}

impl<'de> Deserialize<'de> for OkResponse {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let ok = match Value::deserialize(deserializer)? {
      Value::Object(map) => map.get("ok").and_then(Value::as_bool).unwrap_or(true),
      Value::Bool(ok) => ok,
      _ => true,
    };
    Ok(Self { ok })
  }
}

impl OkResponse {
  pub fn ok() -> Self {
    Self { ok: true }
  }
}

/// Body of `PATCH /jobs/:id/reorder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderBody {
  pub from_order: u32,
  pub to_order: u32,
}

/// Body of `POST /assessments/:jobId/submit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBody {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub candidate_id: Option<u64>,
  pub answers: Value,
}
