//! Deterministic repair of shape-valid oracle output.
//!
//! Given enough questions, the result always satisfies: exact count, ids `1..=n` in
//! order, MCQ ⇒ 1 answer, MSQ ⇒ ≥2 answers, and metadata echoed from the request with
//! counts recomputed from the final question types. Repair is idempotent.

use tracing::{debug, instrument};

use crate::domain::{ExamMeta, GenerationRequest, GenerationResult, Question, QuestionType};
use crate::error::AttemptFailure;
use crate::response::ValidatedResponse;

/// Order-preserving de-duplication.
fn dedup_answers(answers: Vec<String>) -> Vec<String> {
  let mut out: Vec<String> = Vec::with_capacity(answers.len());
  for a in answers {
    if !out.contains(&a) {
      out.push(a);
    }
  }
  out
}

/// Enforce per-type answer cardinality on one question.
fn fix_cardinality(q: Question) -> Question {
  let mut answers = dedup_answers(q.correct_answers);
  let kind = match q.kind {
    QuestionType::Mcq => {
      answers.truncate(1);
      QuestionType::Mcq
    }
    QuestionType::Msq if answers.len() < 2 => QuestionType::Mcq,
    QuestionType::Msq => QuestionType::Msq,
  };
  Question { kind, correct_answers: answers, ..q }
}

#[derive(Default)]
struct Tally {
  questions: Vec<Question>,
  mcq: u32,
  msq: u32,
}

#[instrument(level = "debug", skip_all, fields(got = resp.questions.len(), want = req.total_questions))]
pub fn repair(resp: ValidatedResponse, req: &GenerationRequest) -> Result<GenerationResult, AttemptFailure> {
  let want = req.total_questions as usize;
  let got = resp.questions.len();
  if got < want {
    return Err(AttemptFailure::CountInsufficient { expected: req.total_questions, actual: got });
  }
  if got > want {
    debug!(target: "exam", got, want, "Truncating surplus questions");
  }

  let tally = resp.questions.into_iter().take(want).zip(1u32..).fold(Tally::default(), |mut t, (q, id)| {
    let before = q.kind;
    let q = fix_cardinality(Question { id, ..q });
    if before != q.kind {
      debug!(target: "exam", id, "Reclassified MSQ with fewer than 2 answers to MCQ");
    }
    match q.kind {
      QuestionType::Mcq => t.mcq += 1,
      QuestionType::Msq => t.msq += 1,
    }
    t.questions.push(q);
    t
  });

  Ok(GenerationResult {
    exam_meta: ExamMeta {
      subject: req.subject.clone(),
      difficulty: req.difficulty,
      duration_minutes: req.duration_minutes,
      total_questions: tally.mcq + tally.msq,
      mcq_count: tally.mcq,
      msq_count: tally.msq,
    },
    questions: tally.questions,
  })
}
