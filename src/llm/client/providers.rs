//! LLM Provider支持模块

use anyhow::Result;
use rig::{
    agent::Agent,
    client::{CompletionClient, EmbeddingsClient},
    completion::Prompt,
    embeddings::EmbeddingModel,
    providers::gemini::completion::gemini_api_types::{AdditionalParameters, GenerationConfig},
};

use crate::{
    config::{LLMConfig, LLMProvider},
    llm::backend::BackendError,
};

/// 统一的Provider客户端枚举
#[derive(Clone)]
pub enum ProviderClient {
    OpenAI(rig::providers::openai::Client),
    DeepSeek(rig::providers::deepseek::Client),
    OpenRouter(rig::providers::openrouter::Client),
    Anthropic(rig::providers::anthropic::Client),
    Gemini(rig::providers::gemini::Client),
    Ollama(rig::providers::ollama::Client),
}

impl ProviderClient {
    /// 根据配置创建相应的provider客户端
    pub fn new(config: &LLMConfig) -> Result<Self> {
        let key = config.api_key.as_str();
        let client = match config.provider {
            LLMProvider::OpenAI => Self::OpenAI(
                rig::providers::openai::Client::builder(key)
                    .base_url(config.base_url())
                    .build(),
            ),
            LLMProvider::DeepSeek => Self::DeepSeek(
                rig::providers::deepseek::Client::builder(key)
                    .base_url(config.base_url())
                    .build(),
            ),
            LLMProvider::OpenRouter => {
                Self::OpenRouter(rig::providers::openrouter::Client::builder(key).build())
            }
            LLMProvider::Anthropic => {
                Self::Anthropic(rig::providers::anthropic::ClientBuilder::new(key).build()?)
            }
            LLMProvider::Gemini => {
                Self::Gemini(rig::providers::gemini::Client::builder(key).build()?)
            }
            LLMProvider::Ollama => Self::Ollama(rig::providers::ollama::Client::builder().build()),
        };
        tracing::debug!("已创建 {} 客户端", config.provider);
        Ok(client)
    }

    /// 创建无工具的单轮Agent，所有阶段共用同一份系统提示词与采样参数
    pub fn create_agent(
        &self,
        model: &str,
        system_prompt: &str,
        config: &LLMConfig,
    ) -> Result<ProviderAgent, BackendError> {
        macro_rules! sampled {
            ($builder:expr) => {
                $builder
                    .preamble(system_prompt)
                    .max_tokens(config.max_tokens.into())
                    .temperature(config.temperature)
            };
        }

        let agent = match self {
            ProviderClient::OpenAI(client) => ProviderAgent::OpenAI(
                sampled!(
                    client
                        .completion_model(model)
                        .completions_api()
                        .into_agent_builder()
                )
                .build(),
            ),
            ProviderClient::DeepSeek(client) => {
                ProviderAgent::DeepSeek(sampled!(client.agent(model)).build())
            }
            // openrouter不接受max_tokens
            ProviderClient::OpenRouter(client) => ProviderAgent::OpenRouter(
                client
                    .agent(model)
                    .preamble(system_prompt)
                    .temperature(config.temperature)
                    .build(),
            ),
            ProviderClient::Anthropic(client) => {
                ProviderAgent::Anthropic(sampled!(client.agent(model)).build())
            }
            ProviderClient::Gemini(client) => {
                let params = serde_json::to_value(
                    AdditionalParameters::default().with_config(GenerationConfig::default()),
                )
                .map_err(BackendError::backend)?;
                ProviderAgent::Gemini(
                    sampled!(client.agent(model))
                        .additional_params(params)
                        .build(),
                )
            }
            ProviderClient::Ollama(client) => {
                ProviderAgent::Ollama(sampled!(client.agent(model)).build())
            }
        };
        Ok(agent)
    }

    /// 计算单段文本的向量
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, BackendError> {
        match self {
            ProviderClient::OpenAI(client) => embed_with(client.embedding_model(model), text).await,
            ProviderClient::Gemini(client) => embed_with(client.embedding_model(model), text).await,
            ProviderClient::Ollama(client) => embed_with(client.embedding_model(model), text).await,
            ProviderClient::DeepSeek(_) => Err(unsupported_embedding(LLMProvider::DeepSeek)),
            ProviderClient::OpenRouter(_) => Err(unsupported_embedding(LLMProvider::OpenRouter)),
            ProviderClient::Anthropic(_) => Err(unsupported_embedding(LLMProvider::Anthropic)),
        }
    }
}

async fn embed_with<M: EmbeddingModel>(model: M, text: &str) -> Result<Vec<f32>, BackendError> {
    let embedding = model
        .embed_text(text)
        .await
        .map_err(BackendError::backend)?;
    Ok(embedding.vec.into_iter().map(|v| v as f32).collect())
}

fn unsupported_embedding(provider: LLMProvider) -> BackendError {
    BackendError::Unsupported(format!("provider `{}` does not offer embeddings", provider))
}

/// 统一的Agent枚举
pub enum ProviderAgent {
    OpenAI(Agent<rig::providers::openai::CompletionModel>),
    OpenRouter(Agent<rig::providers::openrouter::CompletionModel>),
    Anthropic(Agent<rig::providers::anthropic::completion::CompletionModel>),
    Gemini(Agent<rig::providers::gemini::completion::CompletionModel>),
    DeepSeek(Agent<rig::providers::deepseek::CompletionModel>),
    Ollama(Agent<rig::providers::ollama::CompletionModel<reqwest::Client>>),
}

impl ProviderAgent {
    /// 执行prompt
    pub async fn prompt(&self, prompt: &str) -> Result<String, BackendError> {
        let response = match self {
            ProviderAgent::OpenAI(agent) => agent.prompt(prompt).await,
            ProviderAgent::DeepSeek(agent) => agent.prompt(prompt).await,
            ProviderAgent::OpenRouter(agent) => agent.prompt(prompt).await,
            ProviderAgent::Anthropic(agent) => agent.prompt(prompt).await,
            ProviderAgent::Gemini(agent) => agent.prompt(prompt).await,
            ProviderAgent::Ollama(agent) => agent.prompt(prompt).await,
        };
        response.map_err(BackendError::backend)
    }
}
