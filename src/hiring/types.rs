//! Domain records shared by the remote wire format and the local store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

use crate::cache::Record;
use crate::error::AccessError;

// ============================================================================
// Identifiers
// ============================================================================

/// Anything a caller may hand over as an entity id.
///
/// Text ids (route params, CLI args) are parsed here so a bad id fails
/// before any I/O happens.
pub trait IntoId {
  fn into_id(self) -> Result<u64, AccessError>;
}

impl IntoId for u64 {
  fn into_id(self) -> Result<u64, AccessError> {
    Ok(self)
  }
}

impl IntoId for &str {
  fn into_id(self) -> Result<u64, AccessError> {
    self
      .trim()
      .parse()
      .map_err(|_| AccessError::InvalidId(self.to_string()))
  }
}

impl IntoId for &String {
  fn into_id(self) -> Result<u64, AccessError> {
    self.as_str().into_id()
  }
}

impl IntoId for String {
  fn into_id(self) -> Result<u64, AccessError> {
    self.as_str().into_id()
  }
}

// ============================================================================
// Jobs
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
  #[default]
  Active,
  Archived,
}

impl JobStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Active => "active",
      Self::Archived => "archived",
    }
  }

  /// Strict parse used for filters; unknown values mean "no filter".
  pub fn parse(raw: &str) -> Option<Self> {
    match raw.trim().to_lowercase().as_str() {
      "active" => Some(Self::Active),
      "archived" => Some(Self::Archived),
      _ => None,
    }
  }
}

impl fmt::Display for JobStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
  pub id: u64,
  pub title: String,
  pub slug: String,
  #[serde(default)]
  pub status: JobStatus,
  /// Dense rank shared by all jobs, starting at 0
  #[serde(default)]
  pub order: u32,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default)]
  pub company: String,
  #[serde(default)]
  pub location: String,
}

impl Record for Job {
  fn id(&self) -> u64 {
    self.id
  }

  fn kind() -> &'static str {
    "job"
  }

  fn rank(&self) -> Option<i64> {
    Some(i64::from(self.order))
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
  pub title: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub slug: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<JobStatus>,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default)]
  pub company: String,
  #[serde(default)]
  pub location: String,
}

impl NewJob {
  pub fn titled(title: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      ..Self::default()
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub slug: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<JobStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tags: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub company: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
}

// ============================================================================
// Candidates
// ============================================================================

/// Pipeline stage. Unknown input is coerced to `Applied`, including on
/// deserialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
  #[default]
  Applied,
  Screen,
  Tech,
  Offer,
  Hired,
  Rejected,
}

impl Stage {
  pub const ALL: [Stage; 6] = [
    Stage::Applied,
    Stage::Screen,
    Stage::Tech,
    Stage::Offer,
    Stage::Hired,
    Stage::Rejected,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Applied => "applied",
      Self::Screen => "screen",
      Self::Tech => "tech",
      Self::Offer => "offer",
      Self::Hired => "hired",
      Self::Rejected => "rejected",
    }
  }

  /// Strict parse used for filters.
  pub fn parse(raw: &str) -> Option<Self> {
    let raw = raw.trim().to_lowercase();
    Self::ALL.into_iter().find(|s| s.as_str() == raw)
  }

  /// Lenient parse used for stored and submitted values.
  pub fn coerce(raw: &str) -> Self {
    Self::parse(raw).unwrap_or_default()
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl<'de> Deserialize<'de> for Stage {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().map(Stage::coerce).unwrap_or_default())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
  pub id: u64,
  pub name: String,
  pub email: String,
  #[serde(default)]
  pub stage: Stage,
  pub job_id: u64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
  #[serde(default = "Utc::now")]
  pub created_at: DateTime<Utc>,
}

impl Record for Candidate {
  fn id(&self) -> u64 {
    self.id
  }

  fn kind() -> &'static str {
    "candidate"
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCandidate {
  pub name: String,
  pub email: String,
  /// Raw stage text; coerced on create
  #[serde(skip_serializing_if = "Option::is_none")]
  pub stage: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub job_id: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub stage: Option<Stage>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub job_id: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
  /// Author label for the timeline entry a stage change produces
  #[serde(skip_serializing_if = "Option::is_none")]
  pub by: Option<String>,
  /// Note for the timeline entry a stage change produces
  #[serde(skip_serializing_if = "Option::is_none")]
  pub note: Option<String>,
}

impl CandidatePatch {
  pub fn stage(stage: Stage) -> Self {
    Self {
      stage: Some(stage),
      ..Self::default()
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
  pub id: u64,
  pub candidate_id: u64,
  pub stage: Stage,
  pub ts: DateTime<Utc>,
  #[serde(default)]
  pub by: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub note: Option<String>,
}

// ============================================================================
// Assessments
// ============================================================================

/// Answer shape of a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuestionKind {
  SingleChoice {
    #[serde(default)]
    options: Vec<String>,
  },
  MultiChoice {
    #[serde(default)]
    options: Vec<String>,
  },
  Numeric {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
  },
  ShortText {
    #[serde(default, rename = "maxLength", skip_serializing_if = "Option::is_none")]
    max_length: Option<u32>,
  },
  LongText {
    #[serde(default, rename = "maxLength", skip_serializing_if = "Option::is_none")]
    max_length: Option<u32>,
  },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
  pub id: String,
  pub label: String,
  #[serde(default)]
  pub required: bool,
  #[serde(flatten)]
  pub kind: QuestionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentDocument {
  pub job_id: u64,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub sections: Vec<Section>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
}

impl AssessmentDocument {
  pub fn question_count(&self) -> usize {
    self.sections.iter().map(|s| s.questions.len()).sum()
  }

  /// Structural checks run before a document is written anywhere.
  pub fn validate(&self) -> Result<(), String> {
    let mut seen = HashSet::new();

    for section in &self.sections {
      if section.questions.is_empty() {
        return Err(format!("section {:?} has no questions", section.id));
      }

      for question in &section.questions {
        if question.id.trim().is_empty() {
          return Err(format!("section {:?} has a question without an id", section.id));
        }
        if !seen.insert(question.id.as_str()) {
          return Err(format!("duplicate question id {:?}", question.id));
        }

        match &question.kind {
          QuestionKind::SingleChoice { options } | QuestionKind::MultiChoice { options }
            if options.len() < 2 =>
          {
            return Err(format!(
              "choice question {:?} needs at least two options",
              question.id
            ));
          }
          QuestionKind::Numeric {
            min: Some(min),
            max: Some(max),
          } if min > max => {
            return Err(format!(
              "numeric question {:?} has min {} above max {}",
              question.id, min, max
            ));
          }
          _ => {}
        }
      }
    }

    Ok(())
  }
}

// ============================================================================
// Submissions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
  pub id: u64,
  pub job_id: u64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub candidate_id: Option<u64>,
  pub submitted_at: DateTime<Utc>,
  /// Opaque answer payload keyed by question id
  pub answers: Value,
  /// Set when the submission was only recorded locally
  #[serde(default)]
  pub local_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub candidate_id: Option<u64>,
  pub answers: Value,
}

/// Acknowledgement of a submit call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
  #[serde(default)]
  pub ok: bool,
  /// True when the submission never reached the remote service
  #[serde(default)]
  pub local: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<u64>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use serde_json::json;

  #[test]
  fn test_stage_coerces_unknown_values() {
    assert_eq!(Stage::coerce("TECH"), Stage::Tech);
    assert_eq!(Stage::coerce(" offer "), Stage::Offer);
    assert_eq!(Stage::coerce("interviewing"), Stage::Applied);
    assert_eq!(Stage::parse("interviewing"), None);

    let candidate: Candidate = serde_json::from_value(json!({
      "id": 1,
      "name": "Ada Lovelace",
      "email": "ada@example.com",
      "stage": "phone-screen",
      "jobId": 3,
      "createdAt": "2025-01-01T00:00:00Z"
    }))
    .unwrap();
    assert_eq!(candidate.stage, Stage::Applied);

    let null_stage: Candidate = serde_json::from_value(json!({
      "id": 2,
      "name": "Grace Hopper",
      "email": "grace@example.com",
      "stage": null,
      "jobId": 3
    }))
    .unwrap();
    assert_eq!(null_stage.stage, Stage::Applied);
  }

  #[test]
  fn test_into_id_rejects_non_numeric() {
    assert_eq!("42".into_id().unwrap(), 42);
    assert_eq!(" 7 ".into_id().unwrap(), 7);
    assert!(matches!("abc".into_id(), Err(AccessError::InvalidId(id)) if id == "abc"));
    assert!(matches!("-1".into_id(), Err(AccessError::InvalidId(_))));
  }

  #[test]
  fn test_job_wire_shape() {
    let job = Job {
      id: 4,
      title: "Data Engineer".to_string(),
      slug: "data-engineer".to_string(),
      status: JobStatus::Archived,
      order: 2,
      tags: vec!["remote".to_string()],
      company: "Acme".to_string(),
      location: "Berlin".to_string(),
    };
    assert_eq!(
      serde_json::to_value(&job).unwrap(),
      json!({
        "id": 4,
        "title": "Data Engineer",
        "slug": "data-engineer",
        "status": "archived",
        "order": 2,
        "tags": ["remote"],
        "company": "Acme",
        "location": "Berlin"
      })
    );
  }

  #[test]
  fn test_question_kinds_are_tagged() {
    let question: Question = serde_json::from_value(json!({
      "id": "q1",
      "label": "Years of Rust?",
      "required": true,
      "type": "numeric",
      "min": 0,
      "max": 40
    }))
    .unwrap();
    assert_eq!(
      question.kind,
      QuestionKind::Numeric {
        min: Some(0.0),
        max: Some(40.0)
      }
    );

    let text = serde_json::to_value(Question {
      id: "q2".to_string(),
      label: "Tell us about a bug".to_string(),
      required: false,
      kind: QuestionKind::LongText {
        max_length: Some(500),
      },
    })
    .unwrap();
    assert_eq!(text["type"], "long-text");
    assert_eq!(text["maxLength"], 500);
  }

  fn doc(questions: Vec<Question>) -> AssessmentDocument {
    AssessmentDocument {
      job_id: 1,
      title: "Screening".to_string(),
      sections: vec![Section {
        id: "s1".to_string(),
        title: "Basics".to_string(),
        questions,
      }],
      updated_at: None,
    }
  }

  fn choice(id: &str, options: &[&str]) -> Question {
    Question {
      id: id.to_string(),
      label: id.to_string(),
      required: true,
      kind: QuestionKind::SingleChoice {
        options: options.iter().map(|o| o.to_string()).collect(),
      },
    }
  }

  #[test]
  fn test_validate_accepts_well_formed_document() {
    let doc = doc(vec![choice("q1", &["yes", "no"]), choice("q2", &["a", "b", "c"])]);
    assert_eq!(doc.validate(), Ok(()));
    assert_eq!(doc.question_count(), 2);
  }

  #[test]
  fn test_validate_rejects_structural_problems() {
    assert!(doc(vec![]).validate().unwrap_err().contains("no questions"));
    assert!(doc(vec![choice("q1", &["only"])])
      .validate()
      .unwrap_err()
      .contains("two options"));
    assert!(doc(vec![choice("q1", &["a", "b"]), choice("q1", &["c", "d"])])
      .validate()
      .unwrap_err()
      .contains("duplicate"));

    let numeric = Question {
      id: "n".to_string(),
      label: "n".to_string(),
      required: false,
      kind: QuestionKind::Numeric {
        min: Some(10.0),
        max: Some(1.0),
      },
    };
    assert!(doc(vec![numeric]).validate().unwrap_err().contains("above max"));
  }
}
