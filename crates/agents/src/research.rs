//! Stock research agent.

use async_trait::async_trait;
use jobrelay_core::job::question;
use jobrelay_core::worker::{JobContext, Worker, WorkerError};
use serde_json::{json, Value};

use crate::llm::{ChatClient, ChatMessage};

const SYSTEM_PROMPT: &str = "\
You are a stock analyst tasked with producing factual reports on companies. \
Answer the user's question based on the information available to you. \
Cover the current stock price, analyst recommendations, income statements, \
stock fundamentals, and news for the company in question. \
Be objective and create a detailed report for the user that either confirms \
or denies their statement.";

/// Answers market research questions with a chat model.
///
/// No market-data tools (price quotes, fundamentals, news feeds) are
/// called; the answer comes from the model's own knowledge.
///
/// Result shape: `{"answer": string, "model": string}`.
pub struct ResearchWorker {
    chat: ChatClient,
}

impl ResearchWorker {
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl Worker for ResearchWorker {
    async fn execute(&self, ctx: &JobContext, input: Value) -> Result<Value, WorkerError> {
        let question = question(&input)
            .ok_or_else(|| WorkerError::InvalidInput("question is required".into()))?;

        tracing::debug!(job_id = %ctx.job_id, model = self.chat.model(), "Running research agent");

        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!("Process ID: {}\n{question}", ctx.job_id)),
        ];
        let completion = self
            .chat
            .complete(&messages)
            .await
            .map_err(|e| WorkerError::Upstream(e.to_string()))?;

        Ok(json!({
            "answer": completion.content,
            "model": completion.model,
        }))
    }
}
