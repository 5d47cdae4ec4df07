// SPDX-License-Identifier: MIT
//! AI mentor — forwards a chat transcript to an opaque completion vendor.
//!
//! The vendor sits behind the [`CompletionService`] trait so the REST layer
//! and tests never touch the network. The shipped implementation speaks the
//! OpenAI-compatible chat-completions dialect (Groq hosts the default model).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::MentorConfig;

/// Fixed system prompt prepended to every conversation.
const SYSTEM_PROMPT: &str = "You are 'AI Ustoz', a helpful and professional programming mentor \
for the MAKON platform. Your goal is to help students learn frontend (React, Tailwind, Next.js) \
and backend development. Be encouraging, concise, and provide code examples where helpful. \
Always answer in Uzbek language.";

/// User-facing detail when the vendor is rate-limiting us.
const RATE_LIMIT_DETAIL: &str =
    "AI serveri juda band (Rate Limit). Iltimos, bir ozdan so'ng urinib ko'ring.";

/// Delay before the single retry after a vendor rate-limit response.
const RATE_LIMIT_RETRY: std::time::Duration = std::time::Duration::from_secs(2);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MentorError {
    /// Vendor said 429 twice in a row. Carries the localized retry message.
    #[error("{0}")]
    RateLimited(String),
    /// No API key in the environment — the feature is not configured.
    #[error("API Key not configured")]
    NotConfigured,
    #[error("model error: {0}")]
    Vendor(String),
}

/// Opaque text-completion collaborator: ordered role-tagged messages in,
/// generated text out.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, MentorError>;
}

// ─── Vendor request/response wire types ──────────────────────────────────────

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionChoiceMessage,
}

#[derive(Deserialize)]
struct CompletionChoiceMessage {
    content: Option<String>,
}

// ─── HTTP client ─────────────────────────────────────────────────────────────

/// Reqwest-backed [`CompletionService`] for OpenAI-compatible vendors.
pub struct MentorClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl MentorClient {
    pub fn new(config: &MentorConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty()),
        }
    }

    async fn request(
        &self,
        api_key: &str,
        messages: &[ChatMessage],
    ) -> Result<reqwest::Response, MentorError> {
        let body = CompletionRequest {
            model: &self.model,
            messages: with_system_prompt(messages),
            temperature: 0.7,
            max_tokens: 1024,
        };
        self.http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MentorError::Vendor(e.to_string()))
    }
}

/// Prepend the mentor system prompt and normalise roles the way the platform
/// UI sends them: anything that is not "user" speaks as the assistant.
fn with_system_prompt(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut out = Vec::with_capacity(messages.len() + 1);
    out.push(ChatMessage {
        role: "system".to_string(),
        content: SYSTEM_PROMPT.to_string(),
    });
    out.extend(messages.iter().map(|m| ChatMessage {
        role: if m.role == "user" { "user" } else { "assistant" }.to_string(),
        content: m.content.clone(),
    }));
    out
}

#[async_trait]
impl CompletionService for MentorClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, MentorError> {
        let api_key = self.api_key.as_deref().ok_or(MentorError::NotConfigured)?;

        let mut resp = self.request(api_key, messages).await?;
        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            // One fixed-delay retry, then give up with the localized message.
            warn!("completion vendor rate-limited, retrying once");
            tokio::time::sleep(RATE_LIMIT_RETRY).await;
            resp = self.request(api_key, messages).await?;
            if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(MentorError::RateLimited(RATE_LIMIT_DETAIL.to_string()));
            }
        }
        if !resp.status().is_success() {
            return Err(MentorError::Vendor(format!(
                "vendor returned {}",
                resp.status()
            )));
        }

        let body: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| MentorError::Vendor(e.to_string()))?;
        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
