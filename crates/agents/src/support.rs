//! Customer support agent backed by help-center search.

use async_trait::async_trait;
use jobrelay_core::job::question;
use jobrelay_core::worker::{JobContext, Worker, WorkerError};
use serde_json::{json, Value};

use crate::help_center::{Article, HelpCenterClient};
use crate::llm::{ChatClient, ChatMessage};

/// Articles passed to the model as context.
const MAX_CONTEXT_ARTICLES: usize = 5;

/// Characters kept from each article body.
const MAX_ARTICLE_CHARS: usize = 4_000;

const SYSTEM_PROMPT: &str = "\
You are a customer support agent. Answer the user's question using only the \
help-center articles provided. If the articles do not contain the answer, \
say so and suggest contacting support.";

/// Searches the help center for the question and answers from the results.
///
/// Result shape: `{"answer": string, "model": string, "articles": number}`.
pub struct SupportWorker {
    chat: ChatClient,
    help_center: HelpCenterClient,
}

impl SupportWorker {
    pub fn new(chat: ChatClient, help_center: HelpCenterClient) -> Self {
        Self { chat, help_center }
    }
}

#[async_trait]
impl Worker for SupportWorker {
    async fn execute(&self, ctx: &JobContext, input: Value) -> Result<Value, WorkerError> {
        let question = question(&input)
            .ok_or_else(|| WorkerError::InvalidInput("question is required".into()))?;

        let articles = self
            .help_center
            .search(question)
            .await
            .map_err(|e| WorkerError::Upstream(e.to_string()))?;

        tracing::debug!(
            job_id = %ctx.job_id,
            found = articles.len(),
            "Help center search finished",
        );

        let context = render_articles(&articles);
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!("Articles:\n{context}\n\nQuestion: {question}")),
        ];
        let completion = self
            .chat
            .complete(&messages)
            .await
            .map_err(|e| WorkerError::Upstream(e.to_string()))?;

        Ok(json!({
            "answer": completion.content,
            "model": completion.model,
            "articles": articles.len().min(MAX_CONTEXT_ARTICLES),
        }))
    }
}

/// Format the leading articles as a numbered context block.
fn render_articles(articles: &[Article]) -> String {
    if articles.is_empty() {
        return "(no matching articles)".to_string();
    }

    articles
        .iter()
        .take(MAX_CONTEXT_ARTICLES)
        .enumerate()
        .map(|(i, a)| {
            let body: String = a.body.chars().take(MAX_ARTICLE_CHARS).collect();
            format!("[{}] {}\n{}", i + 1, a.name, body.trim())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
