//! Network-first, local-fallback data access for a hiring pipeline.
//!
//! Every read and write goes to the remote hiring service first and is
//! answered from a SQLite mirror when that fails. Job and candidate reads
//! then pass through a caller-owned session overlay of edits that are
//! never persisted.
//!
//! ```ignore
//! let store = Arc::new(LocalStore::open_in_memory()?);
//! let gateway = Arc::new(HttpGateway::new(&config.remote, Config::get_api_token())?);
//! let services = Services::new(gateway, store, Arc::new(Overlays::new()), FetchPolicy::NetworkFirst);
//!
//! let page = services.jobs.list(&JobQuery::new().with_search("engineer")).await?;
//! if !page.is_authoritative() {
//!   // served from the local mirror
//! }
//! ```

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod hiring;
pub mod logging;
pub mod optimistic;
pub mod query;
pub mod remote;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{DataSource, FetchPolicy, Fetched, Overlays};
pub use db::LocalStore;
pub use error::{AccessError, StoreError};
pub use hiring::Services;
pub use optimistic::optimistic_update;
pub use remote::{Gateway, HttpGateway};
