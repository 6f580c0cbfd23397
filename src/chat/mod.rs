//! 基于检索的研究问答

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::backend::{BackendError, GenerativeBackend};
use crate::retrieval::{Retriever, SearchHit};
use crate::store::{Store, StoreError};
use crate::utils::text::truncate_chars;

/// 保留的历史消息数量
const HISTORY_MESSAGES: usize = 4;
/// 兜底上下文中单个阶段输出的长度上限
const RUN_OUTPUT_CHARS: usize = 2000;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("question must not be empty")]
    EmptyQuestion,

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// 问答结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAnswer {
    pub answer: String,
    pub sources: Vec<SearchHit>,
    /// 检索无结果时改用最近的阶段输出作为上下文
    pub used_run_outputs: bool,
}

/// 研究问答服务
pub struct ResearchChat {
    backend: Arc<dyn GenerativeBackend>,
    retriever: Arc<Retriever>,
    store: Arc<dyn Store>,
}

impl ResearchChat {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        retriever: Arc<Retriever>,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            backend,
            retriever,
            store,
        }
    }

    pub async fn ask(
        &self,
        project_id: &str,
        question: &str,
        history: &[ChatMessage],
    ) -> Result<ChatAnswer, ChatError> {
        if question.trim().is_empty() {
            return Err(ChatError::EmptyQuestion);
        }
        if self.store.get_project(project_id).await?.is_none() {
            return Err(ChatError::ProjectNotFound(project_id.to_string()));
        }

        let hits = match self.retriever.search_default(project_id, question).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("⚠️ 检索失败，改用阶段输出作为上下文: {}", e);
                Vec::new()
            }
        };

        let used_run_outputs = hits.is_empty();
        let context = if used_run_outputs {
            self.run_outputs_context(project_id).await?
        } else {
            hits.iter()
                .enumerate()
                .map(|(i, hit)| format!("[Source {}]: {}", i + 1, hit.content))
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        let prompt = build_prompt(&context, history, question);
        let answer = self.backend.generate_text(&prompt).await?;

        Ok(ChatAnswer {
            answer: answer.trim().to_string(),
            sources: hits,
            used_run_outputs,
        })
    }

    async fn run_outputs_context(&self, project_id: &str) -> Result<String, ChatError> {
        let runs = self.store.latest_completed_runs(project_id).await?;
        Ok(runs
            .iter()
            .filter_map(|run| {
                run.output.as_deref().map(|output| {
                    format!(
                        "[{}]: {}",
                        run.agent_name,
                        truncate_chars(output, RUN_OUTPUT_CHARS)
                    )
                })
            })
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

fn build_prompt(context: &str, history: &[ChatMessage], question: &str) -> String {
    let recent = &history[history.len().saturating_sub(HISTORY_MESSAGES)..];
    let history_text = recent
        .iter()
        .map(|message| {
            let speaker = match message.role {
                ChatRole::User => "User",
                ChatRole::Assistant => "Assistant",
            };
            format!("{}: {}", speaker, message.content)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = String::from(
        "You are a research assistant helping analyze research documents. Use the following context from the research documents to answer the user's question. If the context doesn't contain relevant information, say so.\n\n",
    );
    prompt.push_str("Context from research documents:\n");
    prompt.push_str(context);
    prompt.push_str("\n\n");
    if !history_text.is_empty() {
        prompt.push_str("Previous conversation:\n");
        prompt.push_str(&history_text);
        prompt.push_str("\n\n");
    }
    prompt.push_str(&format!("User question: {}\n\n", question));
    prompt.push_str("Please provide a helpful, accurate answer based on the context above. If you reference specific information, mention which source it came from.");
    prompt
}

// Include tests
#[cfg(test)]
mod tests;
