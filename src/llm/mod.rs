// LLM module
// Client for the hosted Groq chat-completion API (OpenAI-compatible)


use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::GroqConfig;

const CHAT_COMPLETIONS_PATH: &str = "/openai/v1/chat/completions";
const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF_BASE_MS: u64 = 1000;

/// Client for the hosted chat model
#[derive(Debug, Clone)]
pub struct GroqClient {
    base_url: Url,
    api_key: String,
    model: String,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Read the Groq API key from the process environment
#[inline]
pub fn api_key_from_env() -> Result<String> {
    match std::env::var("GROQ_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(anyhow::anyhow!(
            "GROQ_API_KEY is not set. Export it before starting the server."
        )),
    }
}

/// Whether a Groq API key is present in the environment
#[inline]
pub fn has_api_key() -> bool {
    std::env::var("GROQ_API_KEY").is_ok_and(|key| !key.trim().is_empty())
}

impl GroqClient {
    #[inline]
    pub fn new(config: &GroqConfig, api_key: String) -> Result<Self> {
        let base_url = config
            .api_url()
            .context("Failed to parse Groq base URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            api_key,
            model: config.model.clone(),
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a single-turn prompt to the chat model and return its text
    /// reply verbatim.
    #[inline]
    pub fn chat_completion(&self, prompt: &str, temperature: f32) -> Result<String> {
        let url = self
            .base_url
            .join(CHAT_COMPLETIONS_PATH)
            .context("Failed to build chat completions URL")?;

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature,
        };

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize chat request")?;

        debug!(
            "Sending chat completion request (model: {}, prompt length: {})",
            self.model,
            prompt.len()
        );

        let response_text = self.send_with_retry(url.as_str(), &request_json)?;

        let response: ChatResponse =
            serde_json::from_str(&response_text).context("Failed to parse chat response")?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .context("Chat response contained no choices")?;

        Ok(choice.message.content)
    }

    fn send_with_retry(&self, url: &str, body: &str) -> Result<String> {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!(
                "Chat completion attempt {}/{}",
                attempt, self.retry_attempts
            );

            let result = self
                .agent
                .post(url)
                .header("Authorization", &format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .send(body)
                .and_then(|mut resp| resp.body_mut().read_to_string());

            match result {
                Ok(response_text) => return Ok(response_text),
                Err(error) => {
                    if !Self::is_retryable(&error) {
                        return Err(Self::describe_error(error));
                    }

                    warn!(
                        "Chat completion failed (attempt {}/{}): {}",
                        attempt, self.retry_attempts, error
                    );
                    last_error = Some(Self::describe_error(error));

                    if attempt < self.retry_attempts {
                        let delay =
                            Duration::from_millis(RETRY_BACKOFF_BASE_MS * u64::from(attempt));
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow::anyhow!("Chat completion failed after retries")))
    }

    /// Rate limits, server errors and transport failures are worth a retry;
    /// other client errors (bad auth, bad request) fail immediately.
    fn is_retryable(error: &ureq::Error) -> bool {
        match error {
            ureq::Error::StatusCode(status) => *status == 429 || *status >= 500,
            ureq::Error::ConnectionFailed
            | ureq::Error::HostNotFound
            | ureq::Error::Timeout(_)
            | ureq::Error::Io(_) => true,
            _ => false,
        }
    }

    fn describe_error(error: ureq::Error) -> anyhow::Error {
        if let ureq::Error::StatusCode(status) = &error {
            return anyhow::anyhow!("Groq API error: HTTP {}", status);
        }
        anyhow::anyhow!("Groq request failed: {}", error)
    }
}
