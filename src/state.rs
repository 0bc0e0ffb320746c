//! Application state: generator config, prompt builder, and the injected oracle.
//!
//! The state is read-only after startup. Each generation request builds its own
//! orchestrator from it, so concurrent requests share nothing mutable.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::config::{load_generator_config_from_env, GeneratorConfig};
use crate::oracle::{GenerateOptions, GenerativeOracle};
use crate::openai::OpenAI;
use crate::orchestrator::{BackoffPolicy, RetryOrchestrator};
use crate::prompt::PromptBuilder;

#[derive(Clone)]
pub struct AppState {
    pub config: GeneratorConfig,
    pub prompt_builder: PromptBuilder,
    pub oracle: Option<Arc<dyn GenerativeOracle>>,
}

impl AppState {
    /// Build state from env: load config, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let config = load_generator_config_from_env().unwrap_or_default();

        let oracle: Option<Arc<dyn GenerativeOracle>> = match OpenAI::from_env() {
            Some(oa) => {
                info!(target: "examgen_backend", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
                Some(Arc::new(oa))
            }
            None => {
                warn!(target: "examgen_backend", "OpenAI disabled (no OPENAI_API_KEY). Exam generation will be unavailable.");
                None
            }
        };

        Self::with_oracle(config, oracle)
    }

    pub fn with_oracle(config: GeneratorConfig, oracle: Option<Arc<dyn GenerativeOracle>>) -> Self {
        info!(
            target: "examgen_backend",
            temperature = config.generation.temperature,
            max_output_tokens = config.generation.max_output_tokens,
            backoff_base_ms = config.retry.backoff_base_ms,
            "Generator settings"
        );
        Self { prompt_builder: PromptBuilder::new(config.prompts.clone()), config, oracle }
    }

    /// Fresh orchestrator over `oracle` for a single request.
    pub fn orchestrator<'a>(&self, oracle: &'a dyn GenerativeOracle) -> RetryOrchestrator<'a> {
        RetryOrchestrator::new(
            oracle,
            GenerateOptions::from(&self.config.generation),
            BackoffPolicy::from(&self.config.retry),
        )
    }
}
