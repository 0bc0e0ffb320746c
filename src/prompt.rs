//! Renders a validated request into the oracle instruction payload.
//!
//! Rendering is deterministic: no randomness and no timestamps, so the same request
//! always yields a byte-identical payload and retries reuse it as-is.

use crate::config::Prompts;
use crate::domain::GenerationRequest;
use crate::util::fill_template;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptPayload {
  pub system_instruction: String,
  pub user_instruction: String,
}

/// Placeholders: `{subject}`, `{topics}`, `{difficulty}`, `{total}`, `{mcq}`, `{msq}`,
/// `{duration}`, `{negative_marking}`.
#[derive(Clone, Debug, Default)]
pub struct PromptBuilder {
  prompts: Prompts,
}

impl PromptBuilder {
  pub fn new(prompts: Prompts) -> Self {
    Self { prompts }
  }

  pub fn build(&self, req: &GenerationRequest) -> PromptPayload {
    let topics = req.topics.join(", ");
    let total = req.total_questions.to_string();
    let mcq = req.mcq_count.to_string();
    let msq = req.msq_count.to_string();
    let duration = req.duration_minutes.to_string();
    let negative = if req.negative_marking { "yes" } else { "no" };

    let user_instruction = fill_template(
      &self.prompts.user_template,
      &[
        ("subject", req.subject.as_str()),
        ("topics", topics.as_str()),
        ("difficulty", req.difficulty.as_str()),
        ("total", total.as_str()),
        ("mcq", mcq.as_str()),
        ("msq", msq.as_str()),
        ("duration", duration.as_str()),
        ("negative_marking", negative),
      ],
    );

    PromptPayload {
      system_instruction: self.prompts.system_instruction.clone(),
      user_instruction,
    }
  }
}
