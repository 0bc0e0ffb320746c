//! Request validation: untyped JSON body → `GenerationRequest`.
//!
//! All field errors are collected (not just the first) so callers can fix the
//! whole form at once. The `mcqCount + msqCount == totalQuestions` rule runs last
//! and only when all three counts are individually valid.

use serde_json::Value;
use tracing::{debug, instrument};

use crate::domain::{Difficulty, GenerationRequest};
use crate::error::{FieldError, ValidationErrors};
use crate::schema::{self, index_path};

pub const MIN_TEXT_LEN: usize = 2;
pub const MAX_TOTAL_QUESTIONS: i64 = 50;
pub const MAX_DURATION_MINUTES: i64 = 300;

/// Records the error (if any) and turns the result into an Option.
fn check<T>(errs: &mut ValidationErrors, r: Result<T, FieldError>) -> Option<T> {
  match r {
    Ok(v) => Some(v),
    Err(e) => {
      errs.push(e);
      None
    }
  }
}

fn field<'a>(
  errs: &mut ValidationErrors,
  obj: &'a schema::Object,
  key: &str,
) -> Option<&'a Value> {
  check(errs, schema::required(obj, "", key))
}

fn parse_topics(v: &Value) -> Result<Vec<String>, Vec<FieldError>> {
  let arr = schema::as_array(v, "topics").map_err(|e| vec![e])?;
  if arr.is_empty() {
    return Err(vec![FieldError::new("topics", "must contain at least one topic")]);
  }
  let mut out = Vec::with_capacity(arr.len());
  let mut errs = Vec::new();
  for (i, t) in arr.iter().enumerate() {
    match schema::text(t, &index_path("topics", i), MIN_TEXT_LEN) {
      Ok(s) => out.push(s),
      Err(e) => errs.push(e),
    }
  }
  if errs.is_empty() { Ok(out) } else { Err(errs) }
}

fn parse_difficulty(v: &Value) -> Result<Difficulty, FieldError> {
  let s = schema::as_str(v, "difficulty")?;
  Difficulty::parse(s.trim()).ok_or_else(|| {
    let allowed: Vec<&str> = Difficulty::ALL.iter().map(|d| d.as_str()).collect();
    FieldError::new("difficulty", format!("must be one of: {}", allowed.join(", ")))
  })
}

/// Validate a caller-supplied body. No side effects.
#[instrument(level = "debug", skip_all)]
pub fn validate_request(body: &Value) -> Result<GenerationRequest, ValidationErrors> {
  let mut errs = ValidationErrors::default();

  let obj = match schema::as_object(body, "body") {
    Ok(o) => o,
    Err(e) => {
      errs.push(e);
      return Err(errs);
    }
  };

  let subject = field(&mut errs, obj, "subject")
    .and_then(|v| check(&mut errs, schema::text(v, "subject", MIN_TEXT_LEN)));

  let topics = field(&mut errs, obj, "topics").and_then(|v| match parse_topics(v) {
    Ok(t) => Some(t),
    Err(list) => {
      list.into_iter().for_each(|e| errs.push(e));
      None
    }
  });

  let difficulty = field(&mut errs, obj, "difficulty").and_then(|v| check(&mut errs, parse_difficulty(v)));

  let total = field(&mut errs, obj, "totalQuestions")
    .and_then(|v| check(&mut errs, schema::int_in_range(v, "totalQuestions", 1, MAX_TOTAL_QUESTIONS)));
  let mcq = field(&mut errs, obj, "mcqCount")
    .and_then(|v| check(&mut errs, schema::int_in_range(v, "mcqCount", 0, i64::from(u32::MAX))));
  let msq = field(&mut errs, obj, "msqCount")
    .and_then(|v| check(&mut errs, schema::int_in_range(v, "msqCount", 0, i64::from(u32::MAX))));

  let duration = field(&mut errs, obj, "durationMinutes")
    .and_then(|v| check(&mut errs, schema::int_in_range(v, "durationMinutes", 1, MAX_DURATION_MINUTES)));

  let negative_marking =
    field(&mut errs, obj, "negativeMarking").and_then(|v| check(&mut errs, schema::as_bool(v, "negativeMarking")));

  if let (Some(t), Some(m), Some(s)) = (total, mcq, msq) {
    if u64::from(m) + u64::from(s) != u64::from(t) {
      errs.push(FieldError::new("mcqCount", "mcqCount + msqCount must equal totalQuestions"));
    }
  }

  match (subject, topics, difficulty, total, mcq, msq, duration, negative_marking) {
    (Some(subject), Some(topics), Some(difficulty), Some(total), Some(mcq), Some(msq), Some(duration), Some(neg))
      if errs.is_empty() =>
    {
      Ok(GenerationRequest {
        subject,
        topics,
        difficulty,
        total_questions: total,
        mcq_count: mcq,
        msq_count: msq,
        duration_minutes: duration,
        negative_marking: neg,
      })
    }
    _ => {
      debug!(target: "exam", fields = ?errs.fields.keys().collect::<Vec<_>>(), "Request validation failed");
      Err(errs)
    }
  }
}
