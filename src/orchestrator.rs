//! Bounded retry of the generate → validate → repair cycle.
//!
//! States: `Attempting` → (`Succeeded` | `FailedRetryable`); `FailedRetryable` →
//! (`Attempting` | `Exhausted`). Attempts run strictly one after another and all of
//! them reuse the same prompt payload. Every failure kind is retried; only the bound
//! ends the run. Rate limits and timeouts wait out a capped exponential backoff first.

use std::time::Duration;

use rand::Rng;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::RetryCfg;
use crate::domain::{GenerationRequest, GenerationResult};
use crate::error::{AttemptFailure, ExamGenError};
use crate::oracle::{GenerateOptions, GenerativeOracle};
use crate::prompt::PromptPayload;
use crate::repair::repair;
use crate::response::validate_response;
use crate::util::trunc_for_log;

/// Attempts per run. Not configurable.
pub const MAX_ATTEMPTS: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
  Attempting,
  Succeeded,
  FailedRetryable,
  Exhausted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
  pub attempt: u32,
  pub state: RunState,
}

#[derive(Clone, Debug, Default)]
pub struct BackoffPolicy {
  pub base: Duration,
  pub max: Duration,
}

impl From<&RetryCfg> for BackoffPolicy {
  fn from(cfg: &RetryCfg) -> Self {
    Self { base: Duration::from_millis(cfg.backoff_base_ms), max: Duration::from_millis(cfg.backoff_max_ms) }
  }
}

impl BackoffPolicy {
  /// Delay before the attempt following `attempt` (1-based). Zero for non-transient failures.
  pub fn base_delay(&self, failure: &AttemptFailure, attempt: u32) -> Duration {
    if !failure.is_transient() || self.base.is_zero() {
      return Duration::ZERO;
    }
    let factor = 1u32 << attempt.saturating_sub(1).min(16);
    self.base.saturating_mul(factor).min(self.max)
  }

  /// `base_delay` plus up to 10% random jitter.
  pub fn delay(&self, failure: &AttemptFailure, attempt: u32) -> Duration {
    let d = self.base_delay(failure, attempt);
    let jitter_ms = (d.as_millis() / 10) as u64;
    if jitter_ms == 0 {
      return d;
    }
    d + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
  }
}

/// Failure kinds in attempt order, e.g. `OTHER,SHAPE_INVALID,TIMEOUT`.
fn failure_kinds(failures: &[AttemptFailure]) -> String {
  failures.iter().map(AttemptFailure::kind).collect::<Vec<_>>().join(",")
}

/// One run per request; never shared between requests.
pub struct RetryOrchestrator<'a> {
  oracle: &'a dyn GenerativeOracle,
  options: GenerateOptions,
  backoff: BackoffPolicy,
  run_id: Uuid,
  history: Vec<Transition>,
}

impl<'a> RetryOrchestrator<'a> {
  pub fn new(oracle: &'a dyn GenerativeOracle, options: GenerateOptions, backoff: BackoffPolicy) -> Self {
    Self { oracle, options, backoff, run_id: Uuid::new_v4(), history: Vec::new() }
  }

  /// Every state entered so far, in order.
  pub fn history(&self) -> &[Transition] {
    &self.history
  }

  /// Compact rendering of `history` for logs, e.g. `1:Attempting 1:FailedRetryable 2:Attempting`.
  fn trail(&self) -> String {
    self.history().iter().map(|t| format!("{}:{:?}", t.attempt, t.state)).collect::<Vec<_>>().join(" ")
  }

  fn enter(&mut self, attempt: u32, state: RunState) {
    self.history.push(Transition { attempt, state });
  }

  async fn attempt(&self, prompt: &PromptPayload, req: &GenerationRequest) -> Result<GenerationResult, AttemptFailure> {
    let raw = self.oracle.generate(prompt, &self.options).await?;
    let validated = validate_response(&raw).map_err(|e| {
      warn!(target: "exam", run_id = %self.run_id, path = %e.path, preview = %trunc_for_log(&raw, 200), "Oracle output failed shape validation");
      AttemptFailure::from(e)
    })?;
    repair(validated, req)
  }

  #[instrument(level = "info", skip_all, fields(run_id = %self.run_id, oracle = %self.oracle.name(), total = req.total_questions))]
  pub async fn run(&mut self, prompt: &PromptPayload, req: &GenerationRequest) -> Result<GenerationResult, ExamGenError> {
    let mut attempt = 1;
    let mut failures: Vec<AttemptFailure> = Vec::new();

    loop {
      self.enter(attempt, RunState::Attempting);
      let started = std::time::Instant::now();

      let failure = match self.attempt(prompt, req).await {
        Ok(result) => {
          self.enter(attempt, RunState::Succeeded);
          info!(target: "exam", attempt, elapsed = ?started.elapsed(), questions = result.questions.len(), "Exam generated");
          return Ok(result);
        }
        Err(f) => f,
      };

      self.enter(attempt, RunState::FailedRetryable);
      warn!(target: "exam", attempt, kind = failure.kind(), error = %failure, elapsed = ?started.elapsed(), "Generation attempt failed");
      failures.push(failure.clone());

      if attempt >= MAX_ATTEMPTS {
        self.enter(attempt, RunState::Exhausted);
        warn!(
          target: "exam",
          attempts = attempt,
          last = failure.kind(),
          failures = %failure_kinds(&failures),
          trail = %self.trail(),
          "Generation retries exhausted"
        );
        return Err(ExamGenError::Exhausted { attempts: attempt, last: failure, failures });
      }

      let delay = self.backoff.delay(&failure, attempt);
      if !delay.is_zero() {
        info!(target: "exam", attempt, ?delay, "Backing off before next attempt");
        tokio::time::sleep(delay).await;
      }
      attempt += 1;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Difficulty, QuestionType};
  use crate::oracle::testing::ScriptedOracle;
  use crate::oracle::OracleError;
  use crate::prompt::PromptBuilder;
  use crate::response::tests::{question_json, response_json};

  fn request() -> GenerationRequest {
    GenerationRequest {
      subject: "Math".into(),
      topics: vec!["Algebra".into()],
      difficulty: Difficulty::Easy,
      total_questions: 2,
      mcq_count: 1,
      msq_count: 1,
      duration_minutes: 10,
      negative_marking: false,
    }
  }

  fn good_output() -> Result<String, OracleError> {
    Ok(response_json(vec![question_json(1, "MCQ", &["A"]), question_json(2, "MSQ", &["B", "C"])]).to_string())
  }

  fn options() -> GenerateOptions {
    GenerateOptions { temperature: 0.3, max_output_tokens: 1024, json_response: true }
  }

  async fn run_with(oracle: &ScriptedOracle) -> (Result<GenerationResult, ExamGenError>, Vec<Transition>) {
    let req = request();
    let prompt = PromptBuilder::default().build(&req);
    let mut orch = RetryOrchestrator::new(oracle, options(), BackoffPolicy::default());
    let out = orch.run(&prompt, &req).await;
    (out, orch.history().to_vec())
  }

  fn states(h: &[Transition]) -> Vec<(u32, RunState)> {
    h.iter().map(|t| (t.attempt, t.state)).collect()
  }

  #[tokio::test]
  async fn first_attempt_success() {
    let oracle = ScriptedOracle::always(good_output());
    let (out, history) = run_with(&oracle).await;
    let exam = out.unwrap();
    assert_eq!(exam.questions[1].kind, QuestionType::Msq);
    assert_eq!(oracle.calls(), 1);
    assert_eq!(states(&history), vec![(1, RunState::Attempting), (1, RunState::Succeeded)]);
  }

  #[tokio::test]
  async fn shape_invalid_forever_exhausts_after_three_attempts() {
    let oracle = ScriptedOracle::always(Ok("not json at all".into()));
    let (out, history) = run_with(&oracle).await;
    assert_eq!(oracle.calls(), 3);
    match out {
      Err(ExamGenError::Exhausted { attempts, last, failures }) => {
        assert_eq!(attempts, 3);
        assert_eq!(last.kind(), "SHAPE_INVALID");
        assert_eq!(failures.len(), 3);
      }
      other => panic!("expected exhaustion, got {other:?}"),
    }
    assert_eq!(history.last(), Some(&Transition { attempt: 3, state: RunState::Exhausted }));
  }

  #[tokio::test]
  async fn recovers_after_transient_and_count_failures() {
    let short = Ok(response_json(vec![question_json(1, "MCQ", &["A"])]).to_string());
    let oracle = ScriptedOracle::new(vec![Err(OracleError::RateLimited("slow down".into())), short, good_output()]);
    let (out, history) = run_with(&oracle).await;
    assert!(out.is_ok());
    assert_eq!(oracle.calls(), 3);
    assert_eq!(
      states(&history),
      vec![
        (1, RunState::Attempting),
        (1, RunState::FailedRetryable),
        (2, RunState::Attempting),
        (2, RunState::FailedRetryable),
        (3, RunState::Attempting),
        (3, RunState::Succeeded),
      ]
    );
  }

  #[tokio::test]
  async fn last_failure_drives_message() {
    let oracle = ScriptedOracle::new(vec![
      Err(OracleError::Other("boom".into())),
      Ok("{}".into()),
      Err(OracleError::Timeout),
    ]);
    let (out, _) = run_with(&oracle).await;
    let err = out.unwrap_err();
    assert_eq!(err.user_message(), "AI service timed out. Please retry.");
    match err {
      ExamGenError::Exhausted { failures, .. } => {
        assert_eq!(failure_kinds(&failures), "OTHER,SHAPE_INVALID,TIMEOUT");
      }
      other => panic!("expected exhaustion, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn every_attempt_reuses_the_same_prompt() {
    let oracle = ScriptedOracle::always(Err(OracleError::Other("down".into())));
    let _ = run_with(&oracle).await;
    let prompts = oracle.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts.windows(2).all(|w| w[0] == w[1]));
  }

  #[tokio::test]
  async fn backoff_does_not_change_attempt_bound() {
    let oracle = ScriptedOracle::always(Err(OracleError::RateLimited("busy".into())));
    let req = request();
    let prompt = PromptBuilder::default().build(&req);
    let backoff = BackoffPolicy { base: Duration::from_millis(1), max: Duration::from_millis(2) };
    let mut orch = RetryOrchestrator::new(&oracle, options(), backoff);
    let err = orch.run(&prompt, &req).await.unwrap_err();
    assert_eq!(oracle.calls(), 3);
    assert!(err.user_message().contains("retry shortly"));
    assert_eq!(
      orch.trail(),
      "1:Attempting 1:FailedRetryable 2:Attempting 2:FailedRetryable 3:Attempting 3:FailedRetryable 3:Exhausted"
    );
  }

  #[test]
  fn backoff_schedule() {
    let p = BackoffPolicy { base: Duration::from_millis(500), max: Duration::from_millis(1500) };
    assert_eq!(p.base_delay(&AttemptFailure::RateLimited, 1), Duration::from_millis(500));
    assert_eq!(p.base_delay(&AttemptFailure::Timeout, 2), Duration::from_millis(1000));
    assert_eq!(p.base_delay(&AttemptFailure::Timeout, 3), Duration::from_millis(1500));
    assert_eq!(p.base_delay(&AttemptFailure::Other("x".into()), 1), Duration::ZERO);
    assert_eq!(
      p.base_delay(&AttemptFailure::ShapeInvalid { path: "response".into(), message: "bad".into() }, 1),
      Duration::ZERO
    );
    let d = p.delay(&AttemptFailure::RateLimited, 1);
    assert!(d >= Duration::from_millis(500) && d <= Duration::from_millis(550));
    assert_eq!(BackoffPolicy::default().delay(&AttemptFailure::RateLimited, 1), Duration::ZERO);
  }
}
