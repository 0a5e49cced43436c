//! Shared test utilities: stub gateways and pre-filled stores.

use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::cache::{FetchPolicy, Overlays};
use crate::db::seed::{bootstrap, SeedOptions};
use crate::db::LocalStore;
use crate::hiring::types::{Candidate, Job};
use crate::hiring::Services;
use crate::query::{CandidateQuery, JobQuery};
use crate::remote::{Gateway, RemoteError, RemoteRequest, RemoteStatusError};

/// Gateway that replays scripted responses and records every request.
///
/// Once the script runs out every call fails as if the host were down.
#[derive(Default)]
pub struct StubGateway {
  responses: Mutex<VecDeque<Result<Value, RemoteError>>>,
  requests: Mutex<Vec<RemoteRequest>>,
}

impl StubGateway {
  pub fn offline() -> Self {
    Self::default()
  }

  pub fn scripted(responses: impl IntoIterator<Item = Result<Value, RemoteError>>) -> Self {
    Self {
      responses: Mutex::new(responses.into_iter().collect()),
      requests: Mutex::new(Vec::new()),
    }
  }

  pub fn requests(&self) -> Vec<RemoteRequest> {
    self.requests.lock().unwrap().clone()
  }
}

impl Gateway for StubGateway {
  async fn send(&self, request: RemoteRequest) -> Result<Value, RemoteError> {
    self.requests.lock().unwrap().push(request);
    self
      .responses
      .lock()
      .unwrap()
      .pop_front()
      .unwrap_or_else(|| Err(RemoteError::Transport("connection refused".to_string())))
  }
}

/// In-memory stand-in for the remote service's list endpoints.
///
/// Serves `GET /jobs` and `GET /candidates` from its own copy of the rows,
/// decoding the query string the way the real service does.
pub struct SimulatedRemote {
  jobs: Vec<Job>,
  candidates: Vec<Candidate>,
  online: AtomicBool,
}

impl SimulatedRemote {
  pub fn new(jobs: Vec<Job>, candidates: Vec<Candidate>) -> Self {
    Self {
      jobs,
      candidates,
      online: AtomicBool::new(true),
    }
  }

  pub fn set_online(&self, online: bool) {
    self.online.store(online, Ordering::SeqCst);
  }
}

impl Gateway for SimulatedRemote {
  async fn send(&self, request: RemoteRequest) -> Result<Value, RemoteError> {
    if !self.online.load(Ordering::SeqCst) {
      return Err(RemoteError::Transport("simulated outage".to_string()));
    }

    let params = request.query_pairs();
    let body = match (request.method.as_str(), request.route()) {
      ("GET", "/jobs") => serde_json::to_value(JobQuery::from_params(params).apply(self.jobs.clone())),
      ("GET", "/candidates") => {
        serde_json::to_value(CandidateQuery::from_params(params).apply(self.candidates.clone()))
      }
      _ => {
        return Err(RemoteStatusError::new(404, json!({ "message": "no such route" })).into());
      }
    };
    body.map_err(|e| RemoteError::Codec(e.to_string()))
  }
}

pub fn memory_store() -> Arc<LocalStore> {
  Arc::new(LocalStore::open_in_memory().unwrap())
}

/// Small deterministic data set.
pub fn seeded_store(seed: u64) -> Arc<LocalStore> {
  let store = memory_store();
  let options = SeedOptions {
    seed: Some(seed),
    jobs: 12,
    candidates: 120,
    assessments: 2,
  };
  bootstrap(&store, &options).unwrap();
  store
}

/// Services with a fresh overlay and the default network-first policy.
pub fn services<G: Gateway>(gateway: G, store: Arc<LocalStore>) -> Services<G> {
  Services::new(
    Arc::new(gateway),
    store,
    Arc::new(Overlays::new()),
    FetchPolicy::NetworkFirst,
  )
}
