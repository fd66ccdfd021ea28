//! Client for OpenAI-compatible `/chat/completions` endpoints.

use serde::{Deserialize, Serialize};

/// HTTP client bound to one API base URL, key and model.
#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

/// One chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
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
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// The assistant's reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    pub content: String,
    /// Model reported by the server, falling back to the requested one.
    pub model: String,
}

/// Errors from the chat completion API.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("Chat API error ({status}): {body}")]
    ApiError { status: u16, body: String },

    /// The response carried no usable message.
    #[error("Chat API returned an empty completion")]
    EmptyCompletion,
}

impl ChatClient {
    /// Create a client with its own connection pool.
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key, model)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: String,
        api_key: String,
        model: String,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `messages` and return the first choice's content.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<ChatCompletion, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyCompletion)?;

        Ok(ChatCompletion {
            content,
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}
