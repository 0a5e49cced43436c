//! Synthetic bootstrap data for an empty local store.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use tracing::info;

use super::{LocalStore, Snapshot};
use crate::error::StoreError;
use crate::hiring::slugify;
use crate::hiring::types::{
  AssessmentDocument, Candidate, Job, JobStatus, Question, QuestionKind, Section, Stage,
  TimelineEntry,
};

const TITLES: &[&str] = &[
  "Frontend Engineer",
  "Backend Engineer",
  "Senior QA Engineer",
  "Platform Engineer",
  "Data Analyst",
  "Product Designer",
  "Engineering Manager",
  "Site Reliability Engineer",
  "Mobile Developer",
  "Security Engineer",
  "Technical Writer",
  "Solutions Architect",
];

const TAGS: &[&str] = &[
  "remote", "onsite", "hybrid", "senior", "junior", "rust", "react", "python", "go", "sql",
];

const COMPANIES: &[&str] = &["Acme", "Globex", "Initech", "Umbrella", "Hooli", "Stark"];

const LOCATIONS: &[&str] = &["Berlin", "Lisbon", "London", "Remote", "Toronto", "Austin"];

const FIRST_NAMES: &[&str] = &[
  "Ada", "Grace", "Alan", "Linus", "Barbara", "Ken", "Margaret", "Dennis", "Radia", "Edsger",
  "Frances", "Donald", "Hedy", "Niklaus", "Katherine", "Guido",
];

const LAST_NAMES: &[&str] = &[
  "Lovelace", "Hopper", "Turing", "Torvalds", "Liskov", "Thompson", "Hamilton", "Ritchie",
  "Perlman", "Dijkstra", "Allen", "Knuth", "Lamarr", "Wirth", "Johnson", "Rossum",
];

/// Stages in pipeline order; `Rejected` can branch off any of them.
const PIPELINE: [Stage; 5] = [
  Stage::Applied,
  Stage::Screen,
  Stage::Tech,
  Stage::Offer,
  Stage::Hired,
];

const AUTHOR: &str = "seed";

/// How much data to generate, and from which seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedOptions {
  /// Fixed seed for reproducible data; drawn at random when absent
  pub seed: Option<u64>,
  pub jobs: usize,
  pub candidates: usize,
  pub assessments: usize,
}

impl Default for SeedOptions {
  fn default() -> Self {
    Self {
      seed: None,
      jobs: 25,
      candidates: 1000,
      assessments: 3,
    }
  }
}

/// What a bootstrap wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
  pub seed: u64,
  pub jobs: usize,
  pub candidates: usize,
  pub timeline: usize,
  pub assessments: usize,
}

/// Populate the store when it has no jobs; otherwise do nothing.
pub fn bootstrap(store: &LocalStore, options: &SeedOptions) -> Result<Option<SeedReport>, StoreError> {
  if store.job_count()? > 0 {
    info!("local store already populated, skipping bootstrap");
    return Ok(None);
  }

  let seed = options.seed.unwrap_or_else(rand::random);
  let snapshot = generate(seed, options);
  store.import(&snapshot)?;

  let report = SeedReport {
    seed,
    jobs: snapshot.jobs.len(),
    candidates: snapshot.candidates.len(),
    timeline: snapshot.timeline.len(),
    assessments: snapshot.assessments.len(),
  };
  info!(
    seed,
    jobs = report.jobs,
    candidates = report.candidates,
    timeline = report.timeline,
    "bootstrapped local store"
  );
  Ok(Some(report))
}

/// Build a full data set from `seed`. Same seed and sizes give the same data.
pub fn generate(seed: u64, options: &SeedOptions) -> Snapshot {
  let mut rng = StdRng::seed_from_u64(seed);
  let anchor = anchor();

  let jobs = generate_jobs(&mut rng, options.jobs);
  let (candidates, timeline) = if jobs.is_empty() {
    (Vec::new(), Vec::new())
  } else {
    generate_candidates(&mut rng, &jobs, options.candidates, anchor)
  };
  let assessments = jobs
    .iter()
    .take(options.assessments)
    .map(|job| generate_assessment(&mut rng, job, anchor))
    .collect();

  Snapshot {
    jobs,
    candidates,
    timeline,
    assessments,
  }
}

fn anchor() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
    .single()
    .unwrap_or_default()
}

fn pick<'a>(rng: &mut StdRng, pool: &[&'a str]) -> &'a str {
  pool.choose(rng).copied().unwrap_or_default()
}

fn generate_jobs(rng: &mut StdRng, count: usize) -> Vec<Job> {
  let mut slugs = HashSet::new();

  (0..count)
    .map(|index| {
      let title = pick(rng, TITLES).to_string();
      let base = slugify(&title);
      let mut slug = base.clone();
      let mut suffix = 2;
      while !slugs.insert(slug.clone()) {
        slug = format!("{}-{}", base, suffix);
        suffix += 1;
      }

      let tag_count = rng.gen_range(1..=3);
      let mut tags: Vec<String> = TAGS
        .choose_multiple(rng, tag_count)
        .map(|t| t.to_string())
        .collect();
      tags.sort();

      Job {
        id: index as u64 + 1,
        title,
        slug,
        status: if rng.gen_bool(0.7) {
          JobStatus::Active
        } else {
          JobStatus::Archived
        },
        order: index as u32,
        tags,
        company: pick(rng, COMPANIES).to_string(),
        location: pick(rng, LOCATIONS).to_string(),
      }
    })
    .collect()
}

fn generate_candidates(
  rng: &mut StdRng,
  jobs: &[Job],
  count: usize,
  anchor: DateTime<Utc>,
) -> (Vec<Candidate>, Vec<TimelineEntry>) {
  let mut candidates = Vec::with_capacity(count);
  let mut timeline = Vec::new();

  for index in 0..count {
    let id = index as u64 + 1;
    let first = pick(rng, FIRST_NAMES);
    let last = pick(rng, LAST_NAMES);
    let job_id = jobs[rng.gen_range(0..jobs.len())].id;
    let created_at = anchor + Duration::minutes(rng.gen_range(0..60 * 24 * 90));

    // Walk the pipeline some distance, possibly ending in a rejection.
    let reached = rng.gen_range(0..PIPELINE.len());
    let mut path: Vec<Stage> = PIPELINE[..=reached].to_vec();
    if reached < PIPELINE.len() - 1 && rng.gen_bool(0.2) {
      path.push(Stage::Rejected);
    }

    let mut ts = created_at;
    for stage in &path {
      timeline.push(TimelineEntry {
        id: timeline.len() as u64 + 1,
        candidate_id: id,
        stage: *stage,
        ts,
        by: AUTHOR.to_string(),
        note: None,
      });
      ts += Duration::hours(rng.gen_range(4..24 * 7));
    }

    candidates.push(Candidate {
      id,
      name: format!("{} {}", first, last),
      email: format!("{}.{}{}@example.com", first, last, id).to_lowercase(),
      stage: path.last().copied().unwrap_or_default(),
      job_id,
      phone: rng
        .gen_bool(0.5)
        .then(|| format!("+1-555-{:04}", rng.gen_range(0..10_000))),
      location: Some(pick(rng, LOCATIONS).to_string()),
      created_at,
    });
  }

  (candidates, timeline)
}

fn choice(id: &str, label: &str, options: &[&str], multi: bool) -> Question {
  let options = options.iter().map(|o| o.to_string()).collect();
  Question {
    id: id.to_string(),
    label: label.to_string(),
    required: true,
    kind: if multi {
      QuestionKind::MultiChoice { options }
    } else {
      QuestionKind::SingleChoice { options }
    },
  }
}

fn text(id: &str, label: &str, long: bool, max_length: u32) -> Question {
  Question {
    id: id.to_string(),
    label: label.to_string(),
    required: false,
    kind: if long {
      QuestionKind::LongText {
        max_length: Some(max_length),
      }
    } else {
      QuestionKind::ShortText {
        max_length: Some(max_length),
      }
    },
  }
}

fn generate_assessment(rng: &mut StdRng, job: &Job, anchor: DateTime<Utc>) -> AssessmentDocument {
  let years = Question {
    id: "years".to_string(),
    label: "Years of professional experience".to_string(),
    required: true,
    kind: QuestionKind::Numeric {
      min: Some(0.0),
      max: Some(f64::from(rng.gen_range(30..=50))),
    },
  };

  let background = Section {
    id: "background".to_string(),
    title: "Background".to_string(),
    questions: vec![
      years,
      choice("level", "Current level", &["Junior", "Mid", "Senior", "Staff"], false),
      choice("relocate", "Open to relocation?", &["Yes", "No"], false),
      text("portfolio", "Portfolio link", false, 200),
    ],
  };

  let mut stack: Vec<&str> = TAGS.to_vec();
  stack.shuffle(rng);
  let skills = Section {
    id: "skills".to_string(),
    title: format!("{} skills", job.title),
    questions: vec![
      choice("stack", "Which of these have you shipped with?", &stack[..4], true),
      choice("testing", "Preferred testing approach", &["Unit", "Integration", "End-to-end"], false),
      text("hardest-bug", "Describe the hardest bug you fixed", true, 2000),
      Question {
        id: "confidence".to_string(),
        label: "Confidence with code review (1-5)".to_string(),
        required: true,
        kind: QuestionKind::Numeric {
          min: Some(1.0),
          max: Some(5.0),
        },
      },
    ],
  };

  let logistics = Section {
    id: "logistics".to_string(),
    title: "Logistics".to_string(),
    questions: vec![
      choice("start", "Earliest start", &["Immediately", "1 month", "3 months"], false),
      text("salary", "Salary expectation", false, 50),
      text("anything-else", "Anything else we should know?", true, 1000),
    ],
  };

  AssessmentDocument {
    job_id: job.id,
    title: format!("{} assessment", job.title),
    sections: vec![background, skills, logistics],
    updated_at: Some(anchor),
  }
}
