//! 生成式后端抽象 - 流水线只依赖这里的trait，不直接依赖具体的模型服务

use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use thiserror::Error;

use crate::utils::text::truncate_chars;

/// 追加在JSON调用末尾的输出约束
pub const JSON_ONLY_INSTRUCTION: &str = "Respond ONLY with valid JSON, no markdown formatting.";

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json|JSON)?[ \t]*\r?\n?").expect("valid fence pattern"));

/// 生成式后端错误
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    /// 模型未返回可用文本（包括被安全策略拦截）
    #[error("backend returned an empty response")]
    EmptyResponse,

    /// 网络、超时、鉴权等服务端错误
    #[error("backend error: {0}")]
    Backend(String),

    /// 清洗后的响应不是合法JSON，或结构与期望不符
    #[error("failed to parse JSON response: {message}")]
    Parse { message: String, excerpt: String },

    /// 当前Provider不支持该能力
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl BackendError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// 文本生成后端
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// 根据prompt生成自由文本，空白响应视为 [`BackendError::EmptyResponse`]
    async fn generate_text(&self, prompt: &str) -> Result<String, BackendError>;
}

/// 向量嵌入后端
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BackendError>;
}

/// 以JSON模式调用后端并解码为目标类型
pub async fn generate_json<T>(
    backend: &dyn GenerativeBackend,
    prompt: &str,
) -> Result<T, BackendError>
where
    T: DeserializeOwned,
{
    let full_prompt = format!("{}\n\n{}", prompt, JSON_ONLY_INSTRUCTION);
    let text = backend.generate_text(&full_prompt).await?;
    parse_json_response(&text)
}

/// 去掉markdown代码块标记后解析JSON；整体解析失败时，退而解析最外层的 `{...}` 或 `[...]`
pub fn parse_json_response<T>(raw: &str) -> Result<T, BackendError>
where
    T: DeserializeOwned,
{
    let cleaned = clean_json_response(raw);
    if cleaned.is_empty() {
        return Err(BackendError::EmptyResponse);
    }

    match serde_json::from_str::<T>(&cleaned) {
        Ok(value) => Ok(value),
        Err(first_error) => {
            if let Some(span) = outermost_json_span(&cleaned)
                && span.len() < cleaned.len()
                && let Ok(value) = serde_json::from_str::<T>(span)
            {
                return Ok(value);
            }
            Err(BackendError::Parse {
                message: first_error.to_string(),
                excerpt: truncate_chars(&cleaned, 200).to_string(),
            })
        }
    }
}

/// 清除响应中的 ```json 代码块标记
pub fn clean_json_response(raw: &str) -> String {
    CODE_FENCE.replace_all(raw, "").trim().to_string()
}

fn outermost_json_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let closing = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(closing)?;
    (end > start).then(|| &text[start..=end])
}
