use clap::{Args as ClapArgs, Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use hireflow::cache::{DataSource, FetchPolicy, Fetched, Overlays};
use hireflow::config::Config;
use hireflow::db::seed::{self, SeedOptions};
use hireflow::db::LocalStore;
use hireflow::hiring::types::{
  AssessmentDocument, CandidatePatch, JobPatch, JobStatus, NewCandidate, NewJob, NewSubmission,
  Stage,
};
use hireflow::hiring::Services;
use hireflow::optimistic_update;
use hireflow::query::{CandidateQuery, JobQuery, JobSort, DEFAULT_PAGE_SIZE};
use hireflow::remote::HttpGateway;

#[derive(Parser, Debug)]
#[command(name = "hireflow")]
#[command(about = "Hiring pipeline data access with a local SQLite fallback")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/hireflow/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Never contact the remote service
  #[arg(long, global = true, conflicts_with = "network_only")]
  offline: bool,

  /// Fail instead of falling back to the local store
  #[arg(long, global = true)]
  network_only: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Populate an empty local store with synthetic data
  Seed {
    /// Seed for reproducible data
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    jobs: Option<usize>,
    #[arg(long)]
    candidates: Option<usize>,
    #[arg(long)]
    assessments: Option<usize>,
    /// Clear the store first
    #[arg(long)]
    reset: bool,
  },
  /// Job postings
  #[command(subcommand)]
  Jobs(JobsCommand),
  /// Candidates and their stage history
  #[command(subcommand)]
  Candidates(CandidatesCommand),
  /// Assessment documents and submissions
  #[command(subcommand)]
  Assessments(AssessmentsCommand),
}

#[derive(ClapArgs, Debug)]
struct PageArgs {
  #[arg(long, default_value_t = 1)]
  page: u32,
  #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
  page_size: u32,
}

#[derive(Subcommand, Debug)]
enum JobsCommand {
  List {
    #[arg(long, default_value = "")]
    search: String,
    /// active | archived
    #[arg(long)]
    status: Option<String>,
    /// order | -order | title | -title
    #[arg(long, default_value = "order")]
    sort: String,
    #[command(flatten)]
    page: PageArgs,
  },
  Show {
    id: String,
  },
  Create {
    title: String,
    #[arg(long)]
    slug: Option<String>,
    #[arg(long = "tag")]
    tags: Vec<String>,
    #[arg(long, default_value = "")]
    company: String,
    #[arg(long, default_value = "")]
    location: String,
  },
  Update {
    id: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    slug: Option<String>,
    #[arg(long)]
    status: Option<String>,
  },
  Archive {
    id: String,
  },
  /// Move a job to the rank held by --to
  Reorder {
    id: String,
    #[arg(long)]
    from: u32,
    #[arg(long)]
    to: u32,
  },
}

#[derive(Subcommand, Debug)]
enum CandidatesCommand {
  List {
    #[arg(long, default_value = "")]
    search: String,
    #[arg(long)]
    stage: Option<String>,
    #[arg(long)]
    job: Option<u64>,
    #[command(flatten)]
    page: PageArgs,
  },
  /// Candidate record with its timeline
  Show {
    id: String,
  },
  Create {
    name: String,
    email: String,
    #[arg(long)]
    job: Option<u64>,
    #[arg(long)]
    stage: Option<String>,
  },
  /// Move a candidate to another stage
  Move {
    id: String,
    stage: String,
    #[arg(long, default_value = "cli")]
    by: String,
    #[arg(long)]
    note: Option<String>,
  },
  Timeline {
    id: String,
  },
}

#[derive(Subcommand, Debug)]
enum AssessmentsCommand {
  Show {
    job_id: String,
  },
  /// Replace a job's assessment with a YAML or JSON document
  Put {
    job_id: u64,
    file: PathBuf,
  },
  /// Submit answers (a JSON object keyed by question id)
  Submit {
    job_id: String,
    /// Answers file; reads --answers when absent
    #[arg(long, conflicts_with = "answers")]
    file: Option<PathBuf>,
    #[arg(long)]
    answers: Option<String>,
    #[arg(long)]
    candidate: Option<u64>,
  },
  /// Submissions recorded locally for a job
  Submissions {
    job_id: String,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = hireflow::logging::init(&config.log)?;

  let policy = if args.offline {
    FetchPolicy::LocalOnly
  } else if args.network_only {
    FetchPolicy::NetworkOnly
  } else {
    config.policy()
  };

  let store_path = config.store_path()?;
  let store = Arc::new(LocalStore::open(&store_path)?);
  info!(path = %store_path.display(), ?policy, "opened local store");

  if let Command::Seed {
    seed: value,
    jobs,
    candidates,
    assessments,
    reset,
  } = &args.command
  {
    let defaults = config.seed.options();
    let options = SeedOptions {
      seed: value.or(defaults.seed),
      jobs: jobs.unwrap_or(defaults.jobs),
      candidates: candidates.unwrap_or(defaults.candidates),
      assessments: assessments.unwrap_or(defaults.assessments),
    };
    if *reset {
      store.clear()?;
    }
    return match seed::bootstrap(&store, &options)? {
      Some(report) => print_json(&json!({
        "seed": report.seed,
        "jobs": report.jobs,
        "candidates": report.candidates,
        "timeline": report.timeline,
        "assessments": report.assessments,
      })),
      None => print_json(&json!({ "skipped": "store already has jobs" })),
    };
  }

  seed::bootstrap(&store, &config.seed.options())?;

  let gateway = Arc::new(HttpGateway::new(&config.remote, Config::get_api_token())?);
  let services = Services::new(gateway, store, Arc::new(Overlays::new()), policy);

  match args.command {
    Command::Seed { .. } => Ok(()),
    Command::Jobs(command) => run_jobs(&services, command).await,
    Command::Candidates(command) => run_candidates(&services, command).await,
    Command::Assessments(command) => run_assessments(&services, command).await,
  }
}

async fn run_jobs(services: &Services<HttpGateway>, command: JobsCommand) -> Result<()> {
  let jobs = &services.jobs;
  match command {
    JobsCommand::List {
      search,
      status,
      sort,
      page,
    } => {
      let query = JobQuery::new()
        .with_search(&search)
        .with_status(status.as_deref().and_then(JobStatus::parse))
        .with_sort(JobSort::parse(&sort))
        .with_page(page.page, page.page_size);
      emit(jobs.list(&query).await?)
    }
    JobsCommand::Show { id } => emit(jobs.get(&id).await?),
    JobsCommand::Create {
      title,
      slug,
      tags,
      company,
      location,
    } => {
      let input = NewJob {
        title,
        slug,
        status: None,
        tags,
        company,
        location,
      };
      emit(jobs.create(input).await?)
    }
    JobsCommand::Update {
      id,
      title,
      slug,
      status,
    } => {
      let status = match status {
        Some(raw) => Some(JobStatus::parse(&raw).ok_or_else(|| eyre!("Unknown job status: {}", raw))?),
        None => None,
      };
      let patch = JobPatch {
        title,
        slug,
        status,
        ..JobPatch::default()
      };
      emit(jobs.update(&id, patch).await?)
    }
    JobsCommand::Archive { id } => emit(jobs.archive(&id).await?),
    JobsCommand::Reorder { id, from, to } => emit(jobs.reorder(&id, from, to).await?),
  }
}

async fn run_candidates(services: &Services<HttpGateway>, command: CandidatesCommand) -> Result<()> {
  let candidates = &services.candidates;
  match command {
    CandidatesCommand::List {
      search,
      stage,
      job,
      page,
    } => {
      let query = CandidateQuery::new()
        .with_search(&search)
        .with_stage(stage.as_deref().and_then(Stage::parse))
        .with_job(job)
        .with_page(page.page, page.page_size);
      emit(candidates.list(&query).await?)
    }
    CandidatesCommand::Show { id } => {
      let (candidate, timeline) =
        futures::try_join!(candidates.get(&id), candidates.timeline(&id))?;
      print_json(&json!({
        "source": source_label(candidate.source),
        "data": candidate.data,
        "timeline": timeline.data,
      }))
    }
    CandidatesCommand::Create {
      name,
      email,
      job,
      stage,
    } => {
      let input = NewCandidate {
        name,
        email,
        stage,
        job_id: job,
        ..NewCandidate::default()
      };
      emit(candidates.create(input).await?)
    }
    CandidatesCommand::Move {
      id,
      stage,
      by,
      note,
    } => {
      let stage = Stage::parse(&stage).ok_or_else(|| eyre!("Unknown stage: {}", stage))?;
      let current = candidates.get(&id).await?.into_data();
      let candidate_id = current.id;
      let mut board = vec![current];

      let patch = CandidatePatch {
        by: Some(by),
        note,
        ..CandidatePatch::stage(stage)
      };
      let result = optimistic_update(
        &mut board,
        candidate_id,
        |c| &mut c.stage,
        stage,
        || candidates.update(candidate_id, patch),
      )
      .await;

      match result {
        Ok(moved) => emit(moved),
        Err(error) => {
          print_json(&json!({ "rolledBack": true, "data": board }))?;
          Err(error.into())
        }
      }
    }
    CandidatesCommand::Timeline { id } => emit(candidates.timeline(&id).await?),
  }
}

async fn run_assessments(services: &Services<HttpGateway>, command: AssessmentsCommand) -> Result<()> {
  match command {
    AssessmentsCommand::Show { job_id } => emit(services.assessments.get(&job_id).await?),
    AssessmentsCommand::Put { job_id, file } => {
      let mut raw: Value = read_document(&file)?;
      match raw.as_object_mut() {
        Some(map) => {
          map.insert("jobId".to_string(), json!(job_id));
        }
        None => return Err(eyre!("{} is not a document object", file.display())),
      }
      let doc: AssessmentDocument = serde_json::from_value(raw)
        .map_err(|e| eyre!("Invalid assessment document {}: {}", file.display(), e))?;
      emit(services.assessments.put(doc).await?)
    }
    AssessmentsCommand::Submit {
      job_id,
      file,
      answers,
      candidate,
    } => {
      let answers = match (file, answers) {
        (Some(path), _) => read_document(&path)?,
        (None, Some(inline)) => {
          serde_json::from_str(&inline).map_err(|e| eyre!("Invalid --answers JSON: {}", e))?
        }
        (None, None) => return Err(eyre!("Pass answers with --file or --answers")),
      };
      let input = NewSubmission {
        candidate_id: candidate,
        answers,
      };
      emit(services.submissions.submit(&job_id, input).await?)
    }
    AssessmentsCommand::Submissions { job_id } => emit(services.submissions.for_job(&job_id)?),
  }
}

/// Read a YAML or JSON file into a JSON value.
fn read_document(path: &Path) -> Result<Value> {
  let contents = std::fs::read_to_string(path)
    .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
  serde_yaml::from_str(&contents).map_err(|e| eyre!("Failed to parse {}: {}", path.display(), e))
}

fn source_label(source: DataSource) -> &'static str {
  match source {
    DataSource::Remote => "remote",
    DataSource::LocalFallback => "local-fallback",
    DataSource::LocalOnly => "local-only",
  }
}

fn emit<T: Serialize>(fetched: Fetched<T>) -> Result<()> {
  print_json(&json!({
    "source": source_label(fetched.source),
    "data": fetched.data,
  }))
}

fn print_json(value: &Value) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
