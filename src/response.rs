//! Oracle output validation: raw text → `ValidatedResponse`.
//!
//! Checks shape only (types, enumerations, per-question cardinalities). Cross-question
//! rules (question count, MCQ/MSQ split, id sequence) are left to `repair`, because
//! those are recoverable and shape errors are not.

use serde_json::Value;
use tracing::{debug, instrument};

use crate::domain::{GenerationResult, Question, QuestionType};
use crate::error::FieldError;
use crate::schema::{self, child_path, index_path};
use crate::util::{strip_code_fence, trunc_for_log};

pub const OPTIONS_PER_QUESTION: usize = 4;
pub const MIN_QUESTION_LEN: usize = 5;

/// Shape-checked oracle output. The oracle's `examMeta` is type-checked only; its values
/// are discarded because the final metadata is rebuilt from the request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedResponse {
  pub questions: Vec<Question>,
}

impl From<&GenerationResult> for ValidatedResponse {
  fn from(r: &GenerationResult) -> Self {
    Self { questions: r.questions.clone() }
  }
}

fn exam_meta(root: &schema::Object) -> Result<(), FieldError> {
  let path = "examMeta";
  let meta = schema::as_object(schema::required(root, "", path)?, path)?;
  for key in ["subject", "difficulty"] {
    schema::as_str(schema::required(meta, path, key)?, &child_path(path, key))?;
  }
  for key in ["durationMinutes", "totalQuestions", "mcqCount", "msqCount"] {
    schema::as_int(schema::required(meta, path, key)?, &child_path(path, key))?;
  }
  Ok(())
}

fn options(v: &Value, path: &str) -> Result<Vec<String>, FieldError> {
  let arr = schema::as_array(v, path)?;
  if arr.len() != OPTIONS_PER_QUESTION {
    return Err(FieldError::new(
      path,
      format!("must contain exactly {OPTIONS_PER_QUESTION} options, received {}", arr.len()),
    ));
  }
  let mut out: Vec<String> = Vec::with_capacity(arr.len());
  for (i, o) in arr.iter().enumerate() {
    let p = index_path(path, i);
    let s = schema::text(o, &p, 1)?;
    if out.contains(&s) {
      return Err(FieldError::new(p, "duplicates another option"));
    }
    out.push(s);
  }
  Ok(out)
}

fn correct_answers(v: &Value, path: &str, options: &[String]) -> Result<Vec<String>, FieldError> {
  let arr = schema::as_array(v, path)?;
  if arr.is_empty() {
    return Err(FieldError::new(path, "must contain at least one answer"));
  }
  arr
    .iter()
    .enumerate()
    .map(|(i, a)| {
      let p = index_path(path, i);
      let s = schema::text(a, &p, 1)?;
      if options.contains(&s) {
        Ok(s)
      } else {
        Err(FieldError::new(p, "does not match any option"))
      }
    })
    .collect()
}

fn question(v: &Value, path: &str) -> Result<Question, FieldError> {
  let obj = schema::as_object(v, path)?;
  let req = |key: &str| schema::required(obj, path, key);

  let id = schema::positive_int(req("id")?, &child_path(path, "id"))?;

  let type_path = child_path(path, "type");
  let kind = QuestionType::parse(schema::as_str(req("type")?, &type_path)?)
    .ok_or_else(|| FieldError::new(&type_path, "must be one of: MCQ, MSQ"))?;

  let question = schema::text(req("question")?, &child_path(path, "question"), MIN_QUESTION_LEN)?;
  let options = options(req("options")?, &child_path(path, "options"))?;
  let correct_answers = correct_answers(req("correctAnswers")?, &child_path(path, "correctAnswers"), &options)?;
  let marks = schema::positive_int(req("marks")?, &child_path(path, "marks"))?;

  Ok(Question { id, kind, question, options, correct_answers, marks })
}

fn questions(root: &schema::Object) -> Result<Vec<Question>, FieldError> {
  let path = "questions";
  let arr = schema::as_array(schema::required(root, "", path)?, path)?;
  if arr.is_empty() {
    return Err(FieldError::new(path, "must contain at least one question"));
  }
  arr.iter().enumerate().map(|(i, q)| question(q, &index_path(path, i))).collect()
}

/// Parse and shape-check raw oracle text. Stops at the first failing field.
#[instrument(level = "debug", skip_all, fields(raw_len = raw.len()))]
pub fn validate_response(raw: &str) -> Result<ValidatedResponse, FieldError> {
  let body = strip_code_fence(raw);
  let value: Value = serde_json::from_str(body).map_err(|e| {
    debug!(target: "exam", preview = %trunc_for_log(body, 120), error = %e, "Oracle output is not JSON");
    FieldError::new("response", format!("invalid JSON: {e}"))
  })?;
  let root = schema::as_object(&value, "response")?;
  exam_meta(root)?;
  let questions = questions(root)?;
  Ok(ValidatedResponse { questions })
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use serde_json::json;

  pub(crate) fn question_json(id: u32, kind: &str, answers: &[&str]) -> Value {
    json!({
      "id": id,
      "type": kind,
      "question": format!("Question number {id}?"),
      "options": ["A", "B", "C", "D"],
      "correctAnswers": answers,
      "marks": 1
    })
  }

  pub(crate) fn response_json(questions: Vec<Value>) -> Value {
    json!({
      "examMeta": {
        "subject": "Whatever",
        "difficulty": "hard",
        "durationMinutes": 99,
        "totalQuestions": 42,
        "mcqCount": 40,
        "msqCount": 2
      },
      "questions": questions
    })
  }

  fn shape_error(v: Value) -> FieldError {
    validate_response(&v.to_string()).unwrap_err()
  }

  #[test]
  fn accepts_well_formed_output() {
    let raw = response_json(vec![question_json(1, "MCQ", &["A"]), question_json(7, "MSQ", &["B", "C"])]).to_string();
    let r = validate_response(&raw).unwrap();
    assert_eq!(r.questions.len(), 2);
    assert_eq!(r.questions[1].id, 7);
    assert_eq!(r.questions[1].kind, QuestionType::Msq);
  }

  #[test]
  fn accepts_fenced_output() {
    let raw = format!("```json\n{}\n```", response_json(vec![question_json(1, "MCQ", &["A"])]));
    assert!(validate_response(&raw).is_ok());
  }

  #[test]
  fn rejects_non_json() {
    let e = validate_response("Sure! Here is your exam:").unwrap_err();
    assert_eq!(e.path, "response");
    assert!(e.message.starts_with("invalid JSON"));
    assert_eq!(validate_response("[1,2]").unwrap_err().path, "response");
  }

  #[test]
  fn reports_meta_paths() {
    let mut v = response_json(vec![question_json(1, "MCQ", &["A"])]);
    v["examMeta"]["durationMinutes"] = json!("ten");
    assert_eq!(shape_error(v).path, "examMeta.durationMinutes");

    let mut v = response_json(vec![question_json(1, "MCQ", &["A"])]);
    v.as_object_mut().unwrap().remove("examMeta");
    assert_eq!(shape_error(v).path, "examMeta");

    let mut v = response_json(vec![question_json(1, "MCQ", &["A"])]);
    v["examMeta"]["difficulty"] = json!(3);
    assert_eq!(shape_error(v).path, "examMeta.difficulty");
  }

  #[test]
  fn rejects_empty_question_list() {
    assert_eq!(shape_error(response_json(vec![])).path, "questions");
  }

  #[test]
  fn rejects_wrong_option_count() {
    let mut q = question_json(1, "MCQ", &["A"]);
    q["options"] = json!(["A", "B", "C"]);
    let e = shape_error(response_json(vec![question_json(1, "MCQ", &["A"]), q]));
    assert_eq!(e.path, "questions[1].options");
  }

  #[test]
  fn rejects_duplicate_options() {
    let mut q = question_json(1, "MCQ", &["A"]);
    q["options"] = json!(["A", "B", "A ", "D"]);
    assert_eq!(shape_error(response_json(vec![q])).path, "questions[0].options[2]");
  }

  #[test]
  fn rejects_unknown_type_and_bad_numbers() {
    let mut q = question_json(1, "TF", &["A"]);
    assert_eq!(shape_error(response_json(vec![q.clone()])).path, "questions[0].type");
    q["type"] = json!("MCQ");
    q["marks"] = json!(0);
    assert_eq!(shape_error(response_json(vec![q.clone()])).path, "questions[0].marks");
    q["marks"] = json!(2);
    q["id"] = json!(-3);
    assert_eq!(shape_error(response_json(vec![q])).path, "questions[0].id");
  }

  #[test]
  fn rejects_answers_outside_options() {
    let q = question_json(1, "MSQ", &["A", "E"]);
    assert_eq!(shape_error(response_json(vec![q])).path, "questions[0].correctAnswers[1]");
    let q = question_json(1, "MCQ", &[]);
    assert_eq!(shape_error(response_json(vec![q])).path, "questions[0].correctAnswers");
  }

  #[test]
  fn rejects_short_question_text() {
    let mut q = question_json(1, "MCQ", &["A"]);
    q["question"] = json!("Why");
    assert_eq!(shape_error(response_json(vec![q])).path, "questions[0].question");
  }

  #[test]
  fn does_not_check_cross_question_rules() {
    // Wrong count, MCQ with two answers, duplicate ids: all shape-valid.
    let v = response_json(vec![question_json(3, "MCQ", &["A", "B"]), question_json(3, "MSQ", &["C"])]);
    assert!(validate_response(&v.to_string()).is_ok());
  }
}
