//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs basic result info.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, response::IntoResponse, Json};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::error::{ExamGenError, FieldError, ValidationErrors};
use crate::logic::generate_exam;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, oracle_configured: state.oracle.is_some() })
}

/// Body is taken raw so that malformed JSON is reported in the same shape as
/// any other validation failure.
#[instrument(level = "info", skip(state, body), fields(body_len = body.len()))]
pub async fn http_post_generate_exam(State(state): State<Arc<AppState>>, body: Bytes) -> axum::response::Response {
  let parsed = match serde_json::from_slice::<Value>(&body) {
    Ok(v) => v,
    Err(e) => {
      let mut errs = ValidationErrors::default();
      errs.push(FieldError::new("body", format!("invalid JSON: {e}")));
      return ExamGenError::Validation(errs).into_response();
    }
  };

  match generate_exam(&state, &parsed).await {
    Ok(exam) => {
      info!(target: "exam", questions = exam.questions.len(), "HTTP exam generated");
      Json(GenerateExamOut { success: true, exam }).into_response()
    }
    Err(e) => {
      warn!(target: "exam", error = %e, status = %e.status_code(), "HTTP exam generation failed");
      e.into_response()
    }
  }
}
