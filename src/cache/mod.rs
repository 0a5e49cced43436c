//! Generic read/write resolution between the remote service and the local store.
//!
//! This module knows nothing about hiring entities. It provides:
//! - a policy-driven fallback layer (network first, local on failure)
//! - provenance on every result, so callers can tell authoritative data from fallback data
//! - a caller-owned session overlay for edits that are never persisted

mod layer;
mod overlay;
mod traits;

pub use layer::{FallbackLayer, FetchPolicy};
pub use overlay::{Overlays, SessionOverlay, SessionPatch, RANK_FIELD};
pub use traits::{DataSource, Fetched, Record};
