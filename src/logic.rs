//! Exam generation entry point shared by the HTTP handlers.
//!
//! validate request → render prompt (once) → retry orchestrator. Validation failures
//! return before the oracle is touched and consume no attempt.

use serde_json::Value;
use tracing::{info, instrument};

use crate::domain::GenerationResult;
use crate::error::ExamGenError;
use crate::state::AppState;
use crate::validation::validate_request;

#[instrument(level = "info", skip_all)]
pub async fn generate_exam(state: &AppState, body: &Value) -> Result<GenerationResult, ExamGenError> {
  let req = validate_request(body).map_err(ExamGenError::Validation)?;
  let oracle = state.oracle.as_deref().ok_or(ExamGenError::OracleUnavailable)?;

  info!(
    target: "exam",
    subject = %req.subject,
    difficulty = %req.difficulty,
    total = req.total_questions,
    mcq = req.mcq_count,
    msq = req.msq_count,
    "Generating exam"
  );

  let prompt = state.prompt_builder.build(&req);
  state.orchestrator(oracle).run(&prompt, &req).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;

  use serde_json::json;

  use crate::config::GeneratorConfig;
  use crate::oracle::testing::ScriptedOracle;
  use crate::oracle::GenerativeOracle;
  use crate::response::tests::{question_json, response_json};

  fn state_with(oracle: Arc<ScriptedOracle>) -> AppState {
    let shared: Arc<dyn GenerativeOracle> = oracle;
    AppState::with_oracle(GeneratorConfig::default(), Some(shared))
  }

  fn body() -> Value {
    json!({
      "subject": "Math",
      "topics": ["Algebra"],
      "difficulty": "easy",
      "totalQuestions": 2,
      "mcqCount": 1,
      "msqCount": 1,
      "durationMinutes": 10,
      "negativeMarking": false
    })
  }

  #[tokio::test]
  async fn invalid_split_never_reaches_the_oracle() {
    let oracle = Arc::new(ScriptedOracle::always(Ok("{}".into())));
    let state = state_with(oracle.clone());
    let mut b = body();
    b["mcqCount"] = json!(2);
    let err = generate_exam(&state, &b).await.unwrap_err();
    assert!(matches!(err, ExamGenError::Validation(ref e) if e.contains("mcqCount")));
    assert_eq!(oracle.calls(), 0);
  }

  #[tokio::test]
  async fn concrete_scenario_end_to_end() {
    let raw = response_json(vec![
      question_json(1, "MCQ", &["A"]),
      question_json(2, "MSQ", &["B"]),
      question_json(3, "MCQ", &["C"]),
    ])
    .to_string();
    let oracle = Arc::new(ScriptedOracle::always(Ok(raw)));
    let state = state_with(oracle.clone());
    let exam = generate_exam(&state, &body()).await.unwrap();
    assert_eq!(exam.questions.iter().map(|q| q.id).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!((exam.exam_meta.mcq_count, exam.exam_meta.msq_count), (2, 0));
    assert_eq!(exam.exam_meta.subject, "Math");
    assert_eq!(oracle.calls(), 1);
  }

  #[tokio::test]
  async fn missing_oracle_is_reported_after_validation() {
    let state = AppState::with_oracle(GeneratorConfig::default(), None);
    assert!(matches!(generate_exam(&state, &body()).await, Err(ExamGenError::OracleUnavailable)));
    assert!(matches!(generate_exam(&state, &json!({})).await, Err(ExamGenError::Validation(_))));
  }
}
