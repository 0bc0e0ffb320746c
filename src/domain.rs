//! Domain models: difficulty, question types, the validated generation request,
//! questions, exam metadata and the final generation result.
//!
//! Wire names are camelCase to match the HTTP protocol.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Difficulty levels accepted from callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
  Novice,
  Intermediate,
  Expert,
  Master,
}

impl Difficulty {
  pub const ALL: [Difficulty; 7] = [
    Difficulty::Easy,
    Difficulty::Medium,
    Difficulty::Hard,
    Difficulty::Novice,
    Difficulty::Intermediate,
    Difficulty::Expert,
    Difficulty::Master,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Difficulty::Easy => "easy",
      Difficulty::Medium => "medium",
      Difficulty::Hard => "hard",
      Difficulty::Novice => "novice",
      Difficulty::Intermediate => "intermediate",
      Difficulty::Expert => "expert",
      Difficulty::Master => "master",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|d| d.as_str() == s)
  }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// MCQ: exactly one correct answer. MSQ: two or more.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
  #[serde(rename = "MCQ")]
  Mcq,
  #[serde(rename = "MSQ")]
  Msq,
}

impl QuestionType {
  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "MCQ" => Some(QuestionType::Mcq),
      "MSQ" => Some(QuestionType::Msq),
      _ => None,
    }
  }
}

/// Caller request after validation. Text fields are trimmed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationRequest {
  pub subject: String,
  pub topics: Vec<String>,
  pub difficulty: Difficulty,
  pub total_questions: u32,
  pub mcq_count: u32,
  pub msq_count: u32,
  pub duration_minutes: u32,
  pub negative_marking: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub id: u32,
  #[serde(rename = "type")]
  pub kind: QuestionType,
  pub question: String,
  pub options: Vec<String>,
  pub correct_answers: Vec<String>,
  pub marks: u32,
}

/// Metadata echoed back with every generated exam.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamMeta {
  pub subject: String,
  pub difficulty: Difficulty,
  pub duration_minutes: u32,
  pub total_questions: u32,
  pub mcq_count: u32,
  pub msq_count: u32,
}

/// Final, repaired exam handed back to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
  pub exam_meta: ExamMeta,
  pub questions: Vec<Question>,
}
