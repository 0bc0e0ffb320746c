//! Error taxonomy for exam generation.
//!
//! Only `ExamGenError` crosses the pipeline boundary. `AttemptFailure` classifies a
//! single generate → validate → repair attempt and is absorbed by the orchestrator
//! until the attempt bound is reached.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::protocol::{ErrorOut, ValidationErrorOut};

/// One failing field, addressed by a dotted/indexed path (e.g. `questions[3].options`).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{path}: {message}")]
pub struct FieldError {
  pub path: String,
  pub message: String,
}

impl FieldError {
  pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
    Self { path: path.into(), message: message.into() }
  }
}

/// Every field-level problem found in a caller request, keyed by field path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors {
  pub fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
  pub fn push(&mut self, e: FieldError) {
    self.fields.entry(e.path).or_default().push(e.message);
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }

  #[cfg(test)]
  pub fn contains(&self, path: &str) -> bool {
    self.fields.contains_key(path)
  }
}

/// Why a single attempt failed. Every variant is retried.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AttemptFailure {
  #[error("oracle rate limited")]
  RateLimited,
  #[error("oracle timed out")]
  Timeout,
  /// Upstream rejected the request itself as malformed.
  #[error("oracle rejected request: {0}")]
  InvalidRequest(String),
  #[error("oracle output has invalid shape at {path}: {message}")]
  ShapeInvalid { path: String, message: String },
  #[error("oracle returned {actual} questions, {expected} required")]
  CountInsufficient { expected: u32, actual: usize },
  #[error("oracle failure: {0}")]
  Other(String),
}

impl AttemptFailure {
  /// Stable classification label used in logs.
  pub fn kind(&self) -> &'static str {
    match self {
      AttemptFailure::RateLimited => "RATE_LIMITED",
      AttemptFailure::Timeout => "TIMEOUT",
      AttemptFailure::InvalidRequest(_) => "INVALID_REQUEST",
      AttemptFailure::ShapeInvalid { .. } => "SHAPE_INVALID",
      AttemptFailure::CountInsufficient { .. } => "COUNT_INSUFFICIENT",
      AttemptFailure::Other(_) => "OTHER",
    }
  }

  /// Rate limits and timeouts are worth waiting out before the next attempt.
  pub fn is_transient(&self) -> bool {
    matches!(self, AttemptFailure::RateLimited | AttemptFailure::Timeout)
  }
}

impl From<FieldError> for AttemptFailure {
  fn from(e: FieldError) -> Self {
    AttemptFailure::ShapeInvalid { path: e.path, message: e.message }
  }
}

/// Errors surfaced to the caller of the generation pipeline.
#[derive(Debug, Error)]
pub enum ExamGenError {
  #[error("validation failed")]
  Validation(ValidationErrors),
  #[error("generation failed after {attempts} attempts: {last}")]
  Exhausted {
    attempts: u32,
    last: AttemptFailure,
    failures: Vec<AttemptFailure>,
  },
  #[error("generative service is not configured")]
  OracleUnavailable,
}

impl ExamGenError {
  /// HTTP status for this error.
  ///
  /// - Validation: 400
  /// - Exhausted with upstream-rejected request: 400
  /// - Exhausted otherwise: 500
  /// - OracleUnavailable: 503
  pub fn status_code(&self) -> StatusCode {
    match self {
      ExamGenError::Validation(_) => StatusCode::BAD_REQUEST,
      ExamGenError::Exhausted { last: AttemptFailure::InvalidRequest(_), .. } => StatusCode::BAD_REQUEST,
      ExamGenError::Exhausted { .. } => StatusCode::INTERNAL_SERVER_ERROR,
      ExamGenError::OracleUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
  }

  /// Caller-facing message. For exhaustion it depends on the last failure only.
  pub fn user_message(&self) -> String {
    match self {
      ExamGenError::Validation(_) => "Validation failed".into(),
      ExamGenError::Exhausted { last, .. } => match last {
        AttemptFailure::RateLimited => "AI service is busy (rate limited). Please retry shortly.".into(),
        AttemptFailure::Timeout => "AI service timed out. Please retry.".into(),
        AttemptFailure::InvalidRequest(_) => "Invalid request to AI service.".into(),
        _ => "Failed to generate exam. Please try again.".into(),
      },
      ExamGenError::OracleUnavailable => "AI service is not configured.".into(),
    }
  }
}

impl IntoResponse for ExamGenError {
  fn into_response(self) -> Response {
    let status = self.status_code();
    let message = self.user_message();
    match self {
      ExamGenError::Validation(errs) => {
        (status, Json(ValidationErrorOut { success: false, message, errors: errs.fields })).into_response()
      }
      _ => (status, Json(ErrorOut { success: false, message })).into_response(),
    }
  }
}
