//! LLM客户端 - 基于rig的生成式后端实现

use anyhow::Result;
use async_trait::async_trait;

use crate::{
    config::LLMConfig,
    llm::backend::{BackendError, Embedder, GenerativeBackend},
};

mod providers;
pub mod utils;

use providers::ProviderClient;
use utils::{evaluate_befitting_model, retry_with_backoff};

/// 所有阶段共用的系统提示词
const SYSTEM_PREAMBLE: &str = "You are a meticulous research assistant. You read scientific documents carefully, never invent facts that are not supported by the material, and follow the requested output format exactly.";

/// LLM客户端 - 提供统一的LLM服务接口
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    client: ProviderClient,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: LLMConfig) -> Result<Self> {
        let client = ProviderClient::new(&config)?;
        Ok(Self { client, config })
    }

    /// 检查模型连接和功能是否正常
    pub async fn check_connection(&self) -> Result<(), BackendError> {
        tracing::info!("🔄 正在检查模型连接...");
        match self.generate_text("Hello").await {
            Ok(_) => {
                tracing::info!("✅ 模型连接正常");
                Ok(())
            }
            Err(e) => {
                tracing::error!("❌ 模型连接失败: {}", e);
                Err(e)
            }
        }
    }

    async fn prompt_with_model(&self, model: &str, prompt: &str) -> Result<String, BackendError> {
        let agent = self.client.create_agent(model, SYSTEM_PREAMBLE, &self.config)?;

        retry_with_backoff(
            self.config.retry_attempts,
            self.config.retry_delay_ms,
            || async {
                let text = agent.prompt(prompt).await?;
                if text.trim().is_empty() {
                    Err(BackendError::EmptyResponse)
                } else {
                    Ok(text)
                }
            },
        )
        .await
    }
}

#[async_trait]
impl GenerativeBackend for LLMClient {
    async fn generate_text(&self, prompt: &str) -> Result<String, BackendError> {
        let (befitting_model, fallover_model) =
            evaluate_befitting_model(&self.config, SYSTEM_PREAMBLE, prompt);

        match self.prompt_with_model(&befitting_model, prompt).await {
            Ok(text) => Ok(text),
            Err(e) => match fallover_model {
                Some(model) => {
                    tracing::warn!(
                        "❌ 调用模型服务出错，尝试 {} 次均失败，尝试使用备选模型{}...{}",
                        self.config.retry_attempts,
                        model,
                        e
                    );
                    self.prompt_with_model(&model, prompt).await
                }
                None => Err(e),
            },
        }
    }
}

#[async_trait]
impl Embedder for LLMClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BackendError> {
        if !self.config.provider.supports_embeddings() {
            return Err(BackendError::Unsupported(format!(
                "provider `{}` does not offer embeddings",
                self.config.provider
            )));
        }

        let model = &self.config.embedding_model;
        retry_with_backoff(
            self.config.retry_attempts,
            self.config.retry_delay_ms,
            || self.client.embed(model, text),
        )
        .await
    }
}
