//! Loading generator configuration (prompts + oracle options + retry backoff) from TOML.
//!
//! Every section is optional; missing keys fall back to defaults. Example:
//!
//! ```toml
//! [generation]
//! temperature = 0.2
//! max_output_tokens = 8192
//!
//! [retry]
//! backoff_base_ms = 250
//! backoff_max_ms = 2000
//! ```

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct GeneratorConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub generation: GenerationCfg,
  #[serde(default)]
  pub retry: RetryCfg,
}

/// Prompts sent to the oracle. The user template is filled per request;
/// see `prompt::PromptBuilder` for the placeholders.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub system_instruction: String,
  pub user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      system_instruction: DEFAULT_SYSTEM_INSTRUCTION.into(),
      user_template: DEFAULT_USER_TEMPLATE.into(),
    }
  }
}

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = r#"You are an exam question generator. Respond ONLY with strict JSON.

Output schema (exactly this shape, no extra keys):
{
  "examMeta": {
    "subject": string,
    "difficulty": string,
    "durationMinutes": integer,
    "totalQuestions": integer,
    "mcqCount": integer,
    "msqCount": integer
  },
  "questions": [
    {
      "id": integer (1, 2, 3, ... in order),
      "type": "MCQ" | "MSQ",
      "question": string,
      "options": [string, string, string, string],
      "correctAnswers": [string, ...],
      "marks": integer (>= 1)
    }
  ]
}

Rules:
- Every question has exactly 4 distinct options.
- Every entry of correctAnswers is copied verbatim from options.
- MCQ questions have exactly 1 correct answer. MSQ questions have 2 or more.
- Do NOT include explanations, comments, markdown or code fences. Output the JSON object only."#;

pub const DEFAULT_USER_TEMPLATE: &str = "Create an exam.
Subject: {subject}
Topics: {topics}
Difficulty: {difficulty}
Duration: {duration} minutes
Negative marking: {negative_marking}

Generate EXACTLY {total} questions: EXACTLY {mcq} of type MCQ and EXACTLY {msq} of type MSQ.
Required totals (repeat): totalQuestions = {total}, mcqCount = {mcq}, msqCount = {msq}.";

/// Options forwarded to the oracle on every attempt.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GenerationCfg {
  pub temperature: f32,
  pub max_output_tokens: u32,
}

impl Default for GenerationCfg {
  fn default() -> Self {
    Self { temperature: 0.3, max_output_tokens: 8192 }
  }
}

/// Backoff before re-attempting after a rate limit or timeout. `backoff_base_ms = 0` disables it.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RetryCfg {
  pub backoff_base_ms: u64,
  pub backoff_max_ms: u64,
}

impl Default for RetryCfg {
  fn default() -> Self {
    Self { backoff_base_ms: 500, backoff_max_ms: 4000 }
  }
}

/// Attempt to load `GeneratorConfig` from EXAMGEN_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_generator_config_from_env() -> Option<GeneratorConfig> {
  let path = std::env::var("EXAMGEN_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_config(&s) {
      Ok(cfg) => {
        info!(target: "examgen_backend", %path, "Loaded generator config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "examgen_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "examgen_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_config(s: &str) -> Result<GeneratorConfig, toml::de::Error> {
  toml::from_str::<GeneratorConfig>(s)
}
