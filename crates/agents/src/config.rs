use crate::llm::ChatClient;

/// Default OpenAI-compatible API base URL.
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model.
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Credentials and endpoints for the agent workers.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// API key for the chat model. Without it no worker is registered.
    pub openai_api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API, without a trailing slash.
    pub openai_base_url: String,
    /// Chat model name.
    pub model: String,
    /// Help-center search credentials, if the `support` worker is enabled.
    pub zendesk: Option<ZendeskConfig>,
}

/// Zendesk help-center access.
#[derive(Debug, Clone)]
pub struct ZendeskConfig {
    /// e.g. `https://acme.zendesk.com`.
    pub base_url: String,
    pub username: String,
    pub password: String,
}

impl AgentConfig {
    /// Load agent configuration from environment variables.
    ///
    /// | Env Var             | Default                       |
    /// |---------------------|-------------------------------|
    /// | `OPENAI_API_KEY`    | unset (workers disabled)      |
    /// | `OPENAI_BASE_URL`   | `https://api.openai.com/v1`   |
    /// | `MODEL`             | `gpt-4o-mini`                 |
    /// | `ZENDESK_SUBDOMAIN` | `COMPANY_NAME`, else unset (support disabled) |
    /// | `ZENDESK_USERNAME`  | unset (support disabled)      |
    /// | `ZENDESK_PW`        | unset (support disabled)      |
    ///
    /// The help center is reached at `https://{ZENDESK_SUBDOMAIN}.zendesk.com`.
    pub fn from_env() -> Self {
        let openai_api_key = non_empty_var("OPENAI_API_KEY");

        let openai_base_url = non_empty_var("OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.into())
            .trim_end_matches('/')
            .to_string();

        let model = non_empty_var("MODEL").unwrap_or_else(|| DEFAULT_MODEL.into());

        let zendesk_base_url = zendesk_base_url(
            non_empty_var("ZENDESK_SUBDOMAIN"),
            non_empty_var("COMPANY_NAME"),
        );

        let zendesk = match (
            zendesk_base_url,
            non_empty_var("ZENDESK_USERNAME"),
            non_empty_var("ZENDESK_PW"),
        ) {
            (Some(base_url), Some(username), Some(password)) => Some(ZendeskConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                username,
                password,
            }),
            _ => None,
        };

        Self {
            openai_api_key,
            openai_base_url,
            model,
            zendesk,
        }
    }

    /// A chat client for the configured model, if an API key is present.
    pub fn chat_client(&self, http: reqwest::Client) -> Option<ChatClient> {
        let api_key = self.openai_api_key.clone()?;
        Some(ChatClient::with_client(
            http,
            self.openai_base_url.clone(),
            api_key,
            self.model.clone(),
        ))
    }
}

/// Help-center URL for a subdomain, preferring `subdomain` over `company`.
fn zendesk_base_url(subdomain: Option<String>, company: Option<String>) -> Option<String> {
    subdomain
        .or(company)
        .map(|name| format!("https://{name}.zendesk.com"))
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
