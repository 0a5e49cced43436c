//! List queries shared by the network and local read paths.
//!
//! A query is normalized once, encoded to wire parameters for the remote
//! service, and applied to local rows with the exact same filter predicate,
//! sort comparator and page arithmetic. Parsing the wire parameters back
//! yields an equal query, so both ends of the contract agree.
//!
//! # Example
//!
//! ```ignore
//! let query = JobQuery::new().with_search(" qa ").with_status(Some(JobStatus::Active));
//! let request = RemoteRequest::get("/jobs").with_query(query.to_params());
//! let page = query.apply(store.jobs()?);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::hiring::types::{Candidate, Job, JobStatus, Stage};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// List envelope returned by every list operation on both paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
  pub items: Vec<T>,
  /// Number of rows matching the filter, across all pages
  pub total: usize,
  pub page: u32,
  pub page_size: u32,
}

impl<T> Page<T> {
  pub fn page_count(&self) -> u32 {
    if self.page_size == 0 {
      return 0;
    }
    self.total.div_ceil(self.page_size as usize) as u32
  }
}

/// 1-based page number and clamped page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  page: u32,
  page_size: u32,
}

impl Default for PageRequest {
  fn default() -> Self {
    Self::new(1, DEFAULT_PAGE_SIZE)
  }
}

impl PageRequest {
  pub fn new(page: u32, page_size: u32) -> Self {
    Self {
      page: page.max(1),
      page_size: page_size.clamp(1, MAX_PAGE_SIZE),
    }
  }

  pub fn page(&self) -> u32 {
    self.page
  }

  pub fn page_size(&self) -> u32 {
    self.page_size
  }

  /// Slice already filtered and sorted rows into a page.
  pub fn slice<T>(&self, rows: Vec<T>) -> Page<T> {
    let total = rows.len();
    let start = (self.page as usize - 1).saturating_mul(self.page_size as usize);
    let items = rows
      .into_iter()
      .skip(start)
      .take(self.page_size as usize)
      .collect();

    Page {
      items,
      total,
      page: self.page,
      page_size: self.page_size,
    }
  }

  fn params(&self, out: &mut Vec<(&'static str, String)>) {
    out.push(("page", self.page.to_string()));
    out.push(("pageSize", self.page_size.to_string()));
  }

  /// Read `page` / `pageSize`; anything unparsable keeps the default.
  fn absorb(&mut self, key: &str, value: &str) -> bool {
    match key {
      "page" => {
        if let Ok(page) = value.trim().parse() {
          *self = Self::new(page, self.page_size);
        }
        true
      }
      "pageSize" => {
        if let Ok(size) = value.trim().parse() {
          *self = Self::new(self.page, size);
        }
        true
      }
      _ => false,
    }
  }
}

/// Trimmed search text; blank means no filter.
fn normalize_search(raw: &str) -> Option<String> {
  let trimmed = raw.trim();
  (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
  haystack.to_lowercase().contains(needle)
}

// ============================================================================
// Jobs
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JobSort {
  /// Shared rank, ascending
  #[default]
  Order,
  OrderDesc,
  /// Case-insensitive title
  Title,
  TitleDesc,
}

impl JobSort {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Order => "order",
      Self::OrderDesc => "-order",
      Self::Title => "title",
      Self::TitleDesc => "-title",
    }
  }

  /// Unknown values sort by rank.
  pub fn parse(raw: &str) -> Self {
    match raw.trim() {
      "-order" => Self::OrderDesc,
      "title" => Self::Title,
      "-title" => Self::TitleDesc,
      _ => Self::Order,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobQuery {
  search: Option<String>,
  status: Option<JobStatus>,
  sort: JobSort,
  page: PageRequest,
}

impl JobQuery {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_search(mut self, text: &str) -> Self {
    self.search = normalize_search(text);
    self
  }

  pub fn with_status(mut self, status: Option<JobStatus>) -> Self {
    self.status = status;
    self
  }

  pub fn with_sort(mut self, sort: JobSort) -> Self {
    self.sort = sort;
    self
  }

  pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
    self.page = PageRequest::new(page, page_size);
    self
  }

  pub fn search(&self) -> Option<&str> {
    self.search.as_deref()
  }

  pub fn status(&self) -> Option<JobStatus> {
    self.status
  }

  pub fn page(&self) -> PageRequest {
    self.page
  }

  /// Filter predicate: status equality plus case-insensitive search over
  /// title, slug and tags.
  pub fn matches(&self, job: &Job) -> bool {
    if self.status.is_some_and(|s| s != job.status) {
      return false;
    }

    match &self.search {
      None => true,
      Some(search) => {
        let needle = search.to_lowercase();
        contains_folded(&job.title, &needle)
          || contains_folded(&job.slug, &needle)
          || job.tags.iter().any(|t| contains_folded(t, &needle))
      }
    }
  }

  /// Sort comparator; ties always break on id ascending.
  pub fn compare(&self, a: &Job, b: &Job) -> Ordering {
    let primary = match self.sort {
      JobSort::Order => a.order.cmp(&b.order),
      JobSort::OrderDesc => b.order.cmp(&a.order),
      JobSort::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
      JobSort::TitleDesc => b.title.to_lowercase().cmp(&a.title.to_lowercase()),
    };
    primary.then_with(|| a.id.cmp(&b.id))
  }

  /// Filter, sort and slice a full set of rows.
  pub fn apply(&self, rows: Vec<Job>) -> Page<Job> {
    let mut rows: Vec<Job> = rows.into_iter().filter(|j| self.matches(j)).collect();
    rows.sort_by(|a, b| self.compare(a, b));
    self.page.slice(rows)
  }

  /// Wire parameters for `GET /jobs`.
  pub fn to_params(&self) -> Vec<(&'static str, String)> {
    let mut out = Vec::new();
    if let Some(search) = &self.search {
      out.push(("search", search.clone()));
    }
    if let Some(status) = self.status {
      out.push(("status", status.as_str().to_string()));
    }
    self.page.params(&mut out);
    out.push(("sort", self.sort.as_str().to_string()));
    out
  }

  /// Parse wire parameters, normalizing as [`JobQuery::new`] builders do.
  pub fn from_params<I, K, V>(params: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
  {
    let mut query = Self::new();
    for (key, value) in params {
      let (key, value) = (key.as_ref(), value.as_ref());
      if query.page.absorb(key, value) {
        continue;
      }
      match key {
        "search" => query.search = normalize_search(value),
        "status" => query.status = JobStatus::parse(value),
        "sort" => query.sort = JobSort::parse(value),
        _ => {}
      }
    }
    query
  }
}

// ============================================================================
// Candidates
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateQuery {
  search: Option<String>,
  stage: Option<Stage>,
  job_id: Option<u64>,
  page: PageRequest,
}

impl CandidateQuery {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_search(mut self, text: &str) -> Self {
    self.search = normalize_search(text);
    self
  }

  pub fn with_stage(mut self, stage: Option<Stage>) -> Self {
    self.stage = stage;
    self
  }

  pub fn with_job(mut self, job_id: Option<u64>) -> Self {
    self.job_id = job_id;
    self
  }

  pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
    self.page = PageRequest::new(page, page_size);
    self
  }

  pub fn search(&self) -> Option<&str> {
    self.search.as_deref()
  }

  pub fn stage(&self) -> Option<Stage> {
    self.stage
  }

  pub fn job_id(&self) -> Option<u64> {
    self.job_id
  }

  pub fn page(&self) -> PageRequest {
    self.page
  }

  /// Filter predicate: stage and job equality plus case-insensitive search
  /// over name and email.
  pub fn matches(&self, candidate: &Candidate) -> bool {
    if self.stage.is_some_and(|s| s != candidate.stage) {
      return false;
    }
    if self.job_id.is_some_and(|id| id != candidate.job_id) {
      return false;
    }

    match &self.search {
      None => true,
      Some(search) => {
        let needle = search.to_lowercase();
        contains_folded(&candidate.name, &needle) || contains_folded(&candidate.email, &needle)
      }
    }
  }

  /// Candidates list in id order.
  pub fn compare(&self, a: &Candidate, b: &Candidate) -> Ordering {
    a.id.cmp(&b.id)
  }

  pub fn apply(&self, rows: Vec<Candidate>) -> Page<Candidate> {
    let mut rows: Vec<Candidate> = rows.into_iter().filter(|c| self.matches(c)).collect();
    rows.sort_by(|a, b| self.compare(a, b));
    self.page.slice(rows)
  }

  /// Wire parameters for `GET /candidates`.
  pub fn to_params(&self) -> Vec<(&'static str, String)> {
    let mut out = Vec::new();
    if let Some(search) = &self.search {
      out.push(("search", search.clone()));
    }
    if let Some(stage) = self.stage {
      out.push(("stage", stage.as_str().to_string()));
    }
    if let Some(job_id) = self.job_id {
      out.push(("jobId", job_id.to_string()));
    }
    self.page.params(&mut out);
    out
  }

  pub fn from_params<I, K, V>(params: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
  {
    let mut query = Self::new();
    for (key, value) in params {
      let (key, value) = (key.as_ref(), value.as_ref());
      if query.page.absorb(key, value) {
        continue;
      }
      match key {
        "search" => query.search = normalize_search(value),
        "stage" => query.stage = Stage::parse(value),
        "jobId" => query.job_id = value.trim().parse().ok(),
        _ => {}
      }
    }
    query
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{TimeZone, Utc};
  use pretty_assertions::assert_eq;

  fn job(id: u64, title: &str, order: u32, status: JobStatus) -> Job {
    Job {
      id,
      title: title.to_string(),
      slug: title.to_lowercase().replace(' ', "-"),
      status,
      order,
      tags: vec![],
      company: String::new(),
      location: String::new(),
    }
  }

  fn candidate(id: u64, name: &str, stage: Stage, job_id: u64) -> Candidate {
    Candidate {
      id,
      name: name.to_string(),
      email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
      stage,
      job_id,
      phone: None,
      location: None,
      created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    }
  }

  fn jobs() -> Vec<Job> {
    vec![
      job(1, "Frontend Engineer", 2, JobStatus::Active),
      job(2, "QA Analyst", 0, JobStatus::Archived),
      job(3, "Senior QA Engineer", 1, JobStatus::Active),
      job(4, "Backend Engineer", 3, JobStatus::Active),
    ]
  }

  fn ids<T, F: Fn(&T) -> u64>(items: &[T], id: F) -> Vec<u64> {
    items.iter().map(id).collect()
  }

  #[test]
  fn test_page_request_clamps() {
    assert_eq!(PageRequest::new(0, 0), PageRequest::new(1, 1));
    assert_eq!(PageRequest::new(3, 1000).page_size(), MAX_PAGE_SIZE);
  }

  #[test]
  fn test_slice_past_the_end_is_empty_with_total() {
    let page = PageRequest::new(5, 2).slice(vec![1, 2, 3]);
    assert!(page.items.is_empty());
    assert_eq!(page.total, 3);
    assert_eq!(page.page, 5);
    assert_eq!(page.page_count(), 2);
  }

  #[test]
  fn test_job_search_and_status_filter() {
    let query = JobQuery::new()
      .with_search("  qa ")
      .with_status(Some(JobStatus::Active));
    let page = query.apply(jobs());
    assert_eq!(ids(&page.items, |j| j.id), vec![3]);
    assert_eq!(page.total, 1);

    let all_qa = JobQuery::new().with_search("QA").apply(jobs());
    assert_eq!(ids(&all_qa.items, |j| j.id), vec![2, 3]);
  }

  #[test]
  fn test_job_sorts() {
    let by_order = JobQuery::new().apply(jobs());
    assert_eq!(ids(&by_order.items, |j| j.id), vec![2, 3, 1, 4]);

    let by_title = JobQuery::new().with_sort(JobSort::Title).apply(jobs());
    assert_eq!(ids(&by_title.items, |j| j.id), vec![4, 1, 2, 3]);

    let by_title_desc = JobQuery::new().with_sort(JobSort::TitleDesc).apply(jobs());
    assert_eq!(ids(&by_title_desc.items, |j| j.id), vec![3, 2, 1, 4]);

    let by_order_desc = JobQuery::new().with_sort(JobSort::OrderDesc).apply(jobs());
    assert_eq!(ids(&by_order_desc.items, |j| j.id), vec![4, 1, 3, 2]);
  }

  #[test]
  fn test_job_paging() {
    let page = JobQuery::new().with_page(2, 3).apply(jobs());
    assert_eq!(ids(&page.items, |j| j.id), vec![4]);
    assert_eq!(page.total, 4);
    assert_eq!(page.page_size, 3);
  }

  #[test]
  fn test_job_params_round_trip_normalized() {
    let query = JobQuery::new()
      .with_search(" senior ")
      .with_status(Some(JobStatus::Archived))
      .with_sort(JobSort::TitleDesc)
      .with_page(4, 25);

    let params = query.to_params();
    assert_eq!(
      params,
      vec![
        ("search", "senior".to_string()),
        ("status", "archived".to_string()),
        ("page", "4".to_string()),
        ("pageSize", "25".to_string()),
        ("sort", "-title".to_string()),
      ]
    );
    assert_eq!(JobQuery::from_params(params), query);
  }

  #[test]
  fn test_job_params_ignore_junk() {
    let query = JobQuery::from_params([
      ("search", "   "),
      ("status", "deleted"),
      ("page", "abc"),
      ("pageSize", "500"),
      ("sort", "salary"),
      ("extra", "1"),
    ]);
    assert_eq!(query, JobQuery::new().with_page(1, MAX_PAGE_SIZE));
  }

  #[test]
  fn test_candidate_filters() {
    let rows = vec![
      candidate(3, "Ada Lovelace", Stage::Tech, 1),
      candidate(1, "Grace Hopper", Stage::Tech, 2),
      candidate(2, "Alan Turing", Stage::Screen, 1),
    ];

    let tech = CandidateQuery::new().with_stage(Some(Stage::Tech)).apply(rows.clone());
    assert_eq!(ids(&tech.items, |c| c.id), vec![1, 3]);

    let by_job = CandidateQuery::new().with_job(Some(1)).apply(rows.clone());
    assert_eq!(ids(&by_job.items, |c| c.id), vec![2, 3]);

    let by_email = CandidateQuery::new().with_search("GRACE.HOPPER@").apply(rows);
    assert_eq!(ids(&by_email.items, |c| c.id), vec![1]);
  }

  #[test]
  fn test_candidate_params_round_trip() {
    let query = CandidateQuery::new()
      .with_search("ada")
      .with_stage(Some(Stage::Offer))
      .with_job(Some(7))
      .with_page(2, 20);
    assert_eq!(CandidateQuery::from_params(query.to_params()), query);

    let lenient = CandidateQuery::from_params([("stage", "interviewing"), ("jobId", "x")]);
    assert_eq!(lenient, CandidateQuery::new());
  }
}
