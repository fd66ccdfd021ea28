//! Workers bound to the job types the service exposes.
//!
//! - `research`: a stock-analyst prompt answered by an OpenAI-compatible
//!   chat model.
//! - `support`: searches a Zendesk help center and answers from the
//!   matching articles.
//!
//! [`build_registry`] wires whichever workers the environment configures.

use std::sync::Arc;

use jobrelay_core::error::CoreError;
use jobrelay_core::worker::WorkerRegistry;

pub mod config;
pub mod help_center;
pub mod llm;
pub mod research;
pub mod support;

pub use config::{AgentConfig, ZendeskConfig};
pub use research::ResearchWorker;
pub use support::SupportWorker;

/// Job type served by [`ResearchWorker`].
pub const JOB_TYPE_RESEARCH: &str = "research";

/// Job type served by [`SupportWorker`].
pub const JOB_TYPE_SUPPORT: &str = "support";

/// Build the worker registry from agent configuration.
///
/// Workers whose credentials are missing are skipped with a warning, so the
/// service still starts and answers unknown job types with 400.
pub fn build_registry(config: &AgentConfig) -> Result<WorkerRegistry, CoreError> {
    let mut registry = WorkerRegistry::new();
    let http = reqwest::Client::new();

    let Some(chat) = config.chat_client(http.clone()) else {
        tracing::warn!("OPENAI_API_KEY not set; no agent workers registered");
        return Ok(registry);
    };

    registry.register(
        JOB_TYPE_RESEARCH,
        Arc::new(ResearchWorker::new(chat.clone())),
    )?;

    match &config.zendesk {
        Some(zendesk) => {
            let help_center = help_center::HelpCenterClient::with_client(http, zendesk.clone());
            registry.register(
                JOB_TYPE_SUPPORT,
                Arc::new(SupportWorker::new(chat, help_center)),
            )?;
        }
        None => {
            tracing::warn!("Zendesk credentials not set; 'support' job type disabled");
        }
    }

    tracing::info!(job_types = ?registry.job_types(), "Agent workers registered");
    Ok(registry)
}
