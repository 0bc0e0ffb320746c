//! The generative text service as an injected capability.
//!
//! The pipeline only ever calls `generate`; concrete clients (see `openai`) and test
//! stubs implement it. Implementations must not retry on their own: all retry policy
//! lives in the orchestrator.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::AttemptFailure;
use crate::prompt::PromptPayload;

#[derive(Clone, Debug, PartialEq)]
pub struct GenerateOptions {
  pub temperature: f32,
  pub max_output_tokens: u32,
  /// Ask the service for a JSON-only response.
  pub json_response: bool,
}

impl From<&crate::config::GenerationCfg> for GenerateOptions {
  fn from(cfg: &crate::config::GenerationCfg) -> Self {
    Self { temperature: cfg.temperature, max_output_tokens: cfg.max_output_tokens, json_response: true }
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum OracleError {
  #[error("rate limited: {0}")]
  RateLimited(String),
  #[error("timed out")]
  Timeout,
  #[error("request rejected: {0}")]
  InvalidRequest(String),
  #[error("{0}")]
  Other(String),
}

impl From<OracleError> for AttemptFailure {
  fn from(e: OracleError) -> Self {
    match e {
      OracleError::RateLimited(_) => AttemptFailure::RateLimited,
      OracleError::Timeout => AttemptFailure::Timeout,
      OracleError::InvalidRequest(m) => AttemptFailure::InvalidRequest(m),
      OracleError::Other(m) => AttemptFailure::Other(m),
    }
  }
}

#[async_trait]
pub trait GenerativeOracle: Send + Sync {
  /// One completion. Returns the raw response text, unparsed.
  async fn generate(&self, prompt: &PromptPayload, options: &GenerateOptions) -> Result<String, OracleError>;

  /// Short label for logs (model name, "stub", ...).
  fn name(&self) -> &str;
}
