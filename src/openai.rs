//! OpenAI chat.completions client implementing `GenerativeOracle`.
//!
//! One request per `generate` call, no retries here. HTTP failures are classified
//! for the orchestrator: 429 → rate limited, 400 → invalid request, client timeout →
//! timeout, everything else → other.
//!
//! NOTE: We never log the API key, and response contents only as short previews.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::oracle::{GenerateOptions, GenerativeOracle, OracleError};
use crate::prompt::PromptPayload;

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .unwrap_or(60);

    let client = match reqwest::Client::builder().timeout(Duration::from_secs(timeout_secs)).build() {
      Ok(c) => c,
      Err(e) => {
        error!(target: "examgen_backend", error = %e, "Failed to build HTTP client");
        return None;
      }
    };

    Some(Self { client, api_key, base_url, model })
  }

  fn request_body(&self, prompt: &PromptPayload, options: &GenerateOptions) -> ChatCompletionRequest {
    ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: prompt.system_instruction.clone() },
        ChatMessageReq { role: "user".into(), content: prompt.user_instruction.clone() },
      ],
      temperature: options.temperature,
      response_format: options.json_response.then(|| ResponseFormat { r#type: "json_object".into() }),
      max_tokens: Some(options.max_output_tokens),
    }
  }
}

#[async_trait]
impl GenerativeOracle for OpenAI {
  #[instrument(level = "info", skip_all, fields(model = %self.model))]
  async fn generate(&self, prompt: &PromptPayload, options: &GenerateOptions) -> Result<String, OracleError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = self.request_body(prompt, options);
    let start = std::time::Instant::now();

    let res = self.client.post(&url)
      .header(USER_AGENT, "examgen-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(classify_transport)?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      error!(%status, elapsed = ?start.elapsed(), "OpenAI returned an error status");
      return Err(classify_status(status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(classify_transport)?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let choice = body.choices.into_iter().next();
    if let Some(reason) = choice.as_ref().and_then(|c| c.finish_reason.as_deref()) {
      if reason == "length" {
        info!("OpenAI response hit the output token ceiling");
      }
    }
    let text = choice.and_then(|c| c.message.content).unwrap_or_default();
    info!(elapsed = ?start.elapsed(), response_len = text.len(), "Model response received");
    Ok(text)
  }

  fn name(&self) -> &str {
    &self.model
  }
}

fn classify_transport(e: reqwest::Error) -> OracleError {
  if e.is_timeout() {
    OracleError::Timeout
  } else {
    OracleError::Other(e.to_string())
  }
}

fn classify_status(status: StatusCode, msg: String) -> OracleError {
  match status {
    StatusCode::TOO_MANY_REQUESTS => OracleError::RateLimited(msg),
    StatusCode::BAD_REQUEST => OracleError::InvalidRequest(msg),
    StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => OracleError::Timeout,
    _ => OracleError::Other(format!("OpenAI HTTP {}: {}", status, msg)),
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice {
  message: ChatMessageResp,
  #[serde(default)] finish_reason: Option<String>,
}
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client() -> OpenAI {
    OpenAI {
      client: reqwest::Client::new(),
      api_key: "sk-test".into(),
      base_url: "http://localhost".into(),
      model: "gpt-test".into(),
    }
  }

  #[test]
  fn status_classification() {
    assert!(matches!(classify_status(StatusCode::TOO_MANY_REQUESTS, "x".into()), OracleError::RateLimited(_)));
    assert!(matches!(classify_status(StatusCode::BAD_REQUEST, "x".into()), OracleError::InvalidRequest(_)));
    assert_eq!(classify_status(StatusCode::GATEWAY_TIMEOUT, "x".into()), OracleError::Timeout);
    assert!(matches!(classify_status(StatusCode::INTERNAL_SERVER_ERROR, "x".into()), OracleError::Other(_)));
  }

  #[test]
  fn error_body_extraction() {
    assert_eq!(
      extract_openai_error(r#"{"error":{"message":"Rate limit reached","type":"requests"}}"#).as_deref(),
      Some("Rate limit reached")
    );
    assert_eq!(extract_openai_error("<html>"), None);
  }

  #[test]
  fn request_body_carries_options() {
    let prompt = PromptPayload { system_instruction: "sys".into(), user_instruction: "usr".into() };
    let opts = GenerateOptions { temperature: 0.25, max_output_tokens: 4096, json_response: true };
    let v = serde_json::to_value(client().request_body(&prompt, &opts)).unwrap();
    assert_eq!(v["model"], "gpt-test");
    assert_eq!(v["messages"][0]["role"], "system");
    assert_eq!(v["messages"][1]["content"], "usr");
    assert_eq!(v["response_format"]["type"], "json_object");
    assert_eq!(v["max_tokens"], 4096);
    assert_eq!(v["temperature"], 0.25);

    let plain = GenerateOptions { json_response: false, ..opts };
    let v = serde_json::to_value(client().request_body(&prompt, &plain)).unwrap();
    assert!(v.get("response_format").is_none());
  }
}
