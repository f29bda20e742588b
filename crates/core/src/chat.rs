use crate::error::CompanionError;
use anyhow::{Context, Result};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHAT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_CHAT_MODEL: &str = "llama3-8b-8192";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub content: Option<String>,
}

impl LlmResponse {
    /// The first choice's content; an empty string counts as no content.
    pub fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
    }
}

#[async_trait]
#[cfg_attr(test, automock)]
pub trait ChatEndpoint: Send + Sync {
    /// Sends one ordered message list and returns the reply content, if the model produced any.
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<Option<String>>;
}

/// Chat-completions client for Groq's OpenAI-compatible API.
pub struct GroqChatClient {
    client: Client,
    api_key: Option<SecretString>,
    model: String,
    base_url: String,
}

impl GroqChatClient {
    /// A missing key is accepted here and reported on the first request.
    pub fn new(api_key: Option<SecretString>, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            base_url: DEFAULT_CHAT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ChatEndpoint for GroqChatClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<Option<String>> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| CompanionError::ConfigurationMissing("GROQ_API_KEY".to_string()))?;

        let body = ChatRequest {
            model: &self.model,
            messages: &messages,
        };
        tracing::debug!(
            "POST {} (model {}, {} messages)",
            self.endpoint(),
            self.model,
            messages.len()
        );

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .context("Chat request could not be sent")?
            .error_for_status()
            .context("Chat endpoint returned an error status")?
            .json::<LlmResponse>()
            .await
            .context("Chat endpoint returned an unexpected body")?;

        Ok(resp.into_content())
    }
}
