//! 脚本化的后端，按prompt中的关键字返回预设响应，用于离线测试流水线与检索

use async_trait::async_trait;
use std::sync::Mutex;

use super::backend::{BackendError, Embedder, GenerativeBackend};

#[derive(Debug, Clone)]
enum ScriptedReply {
    Text(String),
    Fail(BackendError),
}

#[derive(Debug, Clone)]
struct ScriptedRule {
    needle: String,
    reply: ScriptedReply,
}

/// 按规则顺序匹配prompt子串，第一个命中的规则决定响应
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    rules: Vec<ScriptedRule>,
    default_reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// prompt包含 `needle` 时返回 `text`
    pub fn respond(mut self, needle: impl Into<String>, text: impl Into<String>) -> Self {
        self.rules.push(ScriptedRule {
            needle: needle.into(),
            reply: ScriptedReply::Text(text.into()),
        });
        self
    }

    /// prompt包含 `needle` 时返回错误
    pub fn fail(mut self, needle: impl Into<String>, error: BackendError) -> Self {
        self.rules.push(ScriptedRule {
            needle: needle.into(),
            reply: ScriptedReply::Fail(error),
        });
        self
    }

    /// 没有规则命中时的响应，未设置时返回 [`BackendError::Backend`]
    pub fn otherwise(mut self, text: impl Into<String>) -> Self {
        self.default_reply = Some(text.into());
        self
    }

    /// 按调用顺序返回收到的全部prompt
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }

    /// 包含 `needle` 的prompt数量
    pub fn count_prompts_containing(&self, needle: &str) -> usize {
        self.prompts()
            .iter()
            .filter(|prompt| prompt.contains(needle))
            .count()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn generate_text(&self, prompt: &str) -> Result<String, BackendError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let reply = self
            .rules
            .iter()
            .find(|rule| prompt.contains(&rule.needle))
            .map(|rule| rule.reply.clone());

        match reply {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Fail(error)) => Err(error),
            None => self
                .default_reply
                .clone()
                .ok_or_else(|| BackendError::Backend("no scripted reply".to_string())),
        }
    }
}

/// 词袋哈希向量化，相同词汇的文本得到相近的向量
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BackendError> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text.split_whitespace() {
            let normalized: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect();
            if normalized.is_empty() {
                continue;
            }
            let bucket = normalized
                .bytes()
                .fold(5381usize, |hash, b| hash.wrapping_mul(33) ^ b as usize)
                % self.dimensions;
            vector[bucket] += 1.0;
        }
        Ok(vector)
    }
}
