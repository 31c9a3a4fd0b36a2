//! Judge oracle backed by the Anthropic Messages API.

use crate::call_log::CallLog;
use crate::{JudgeOracle, OracleError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [UserMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

pub struct AnthropicJudge {
    agent: ureq::Agent,
    api_key: String,
    model: String,
    call_log: Option<Arc<CallLog>>,
}

impl AnthropicJudge {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self {
            agent,
            api_key: api_key.into(),
            model: model.into(),
            call_log: None,
        }
    }

    /// Build from `ANTHROPIC_API_KEY`.
    pub fn from_env(model: impl Into<String>, timeout: Duration) -> Result<Self, OracleError> {
        let key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(OracleError::MissingCredential(API_KEY_ENV))?;
        Ok(Self::new(key, model, timeout))
    }

    pub fn with_call_log(mut self, log: Arc<CallLog>) -> Self {
        self.call_log = Some(log);
        self
    }

    fn send(&self, prompt: &str, max_tokens: u32) -> Result<String, OracleError> {
        let request = MessageRequest {
            model: &self.model,
            max_tokens,
            messages: [UserMessage {
                role: "user",
                content: prompt,
            }],
        };
        let body = serde_json::to_string(&request).map_err(|e| OracleError::Decode(e.to_string()))?;

        let mut response = self
            .agent
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .send(body)?;

        let status = response.status();
        let text = response.body_mut().read_to_string()?;
        if !status.is_success() {
            return Err(OracleError::Status {
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            });
        }
        let parsed: MessageResponse =
            serde_json::from_str(&text).map_err(|e| OracleError::Decode(e.to_string()))?;
        Ok(first_text(parsed))
    }
}

fn first_text(response: MessageResponse) -> String {
    response
        .content
        .into_iter()
        .find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.trim().to_string()),
            ContentBlock::Other => None,
        })
        .unwrap_or_default()
}

impl JudgeOracle for AnthropicJudge {
    fn model(&self) -> &str {
        &self.model
    }

    fn complete(&self, label: &str, prompt: &str, max_tokens: u32) -> Result<String, OracleError> {
        tracing::debug!(label, model = %self.model, prompt_len = prompt.len(), "judge request");
        let result = self.send(prompt, max_tokens);
        if let Some(log) = &self.call_log {
            match &result {
                Ok(text) => {
                    log.log_llm(label, &self.model, prompt, text, max_tokens, None);
                }
                Err(e) => {
                    let extra = serde_json::json!({ "error": e.to_string() });
                    log.log_llm(label, &self.model, prompt, "", max_tokens, Some(extra));
                }
            }
        }
        result
    }
}
