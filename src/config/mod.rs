use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::pipeline::policy::StageFailurePolicy;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "paperforge.toml";

/// API KEY 的环境变量名
pub const API_KEY_ENV: &str = "PAPERFORGE_LLM_API_KEY";

/// 生成与嵌入服务的提供方
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    OpenAI,
    #[default]
    Gemini,
    Anthropic,
    DeepSeek,
    OpenRouter,
    Ollama,
}

impl LLMProvider {
    pub const ALL: [LLMProvider; 6] = [
        LLMProvider::OpenAI,
        LLMProvider::Gemini,
        LLMProvider::Anthropic,
        LLMProvider::DeepSeek,
        LLMProvider::OpenRouter,
        LLMProvider::Ollama,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI => "openai",
            LLMProvider::Gemini => "gemini",
            LLMProvider::Anthropic => "anthropic",
            LLMProvider::DeepSeek => "deepseek",
            LLMProvider::OpenRouter => "openrouter",
            LLMProvider::Ollama => "ollama",
        }
    }

    /// 未配置 `api_base_url` 时使用的官方地址
    pub fn default_base_url(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI => "https://api.openai.com/v1",
            LLMProvider::Gemini => "https://generativelanguage.googleapis.com",
            LLMProvider::Anthropic => "https://api.anthropic.com",
            LLMProvider::DeepSeek => "https://api.deepseek.com",
            LLMProvider::OpenRouter => "https://openrouter.ai/api/v1",
            LLMProvider::Ollama => "http://localhost:11434",
        }
    }

    /// 该Provider是否提供向量嵌入接口
    pub fn supports_embeddings(&self) -> bool {
        matches!(
            self,
            LLMProvider::OpenAI | LLMProvider::Gemini | LLMProvider::Ollama
        )
    }
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        LLMProvider::ALL
            .into_iter()
            .find(|provider| provider.as_str() == wanted)
            .ok_or_else(|| format!("Unknown provider: {}", s))
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 待分析文档所在目录
    pub documents_path: PathBuf,

    /// 产物输出目录
    pub output_path: PathBuf,

    /// 参与流水线的文档文件匹配规则
    pub document_patterns: Vec<String>,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 持久化配置
    pub store: StoreConfig,

    /// 检索配置
    pub retrieval: RetrievalConfig,

    /// 流水线配置
    pub pipeline: PipelineConfig,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址，留空时使用Provider的官方地址（部分Provider忽略此项）
    pub api_base_url: String,

    /// 高能效模型，用于常规阶段
    pub model_efficient: String,

    /// 高质量模型，用于超长上下文以及efficient失效时的兜底
    pub model_powerful: String,

    /// 向量嵌入模型
    pub embedding_model: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 重试次数
    pub retry_attempts: u32,

    /// 重试间隔（毫秒），第N次重试等待 N * retry_delay_ms
    pub retry_delay_ms: u64,

    /// 向量化等可并行任务的最大并发数
    pub max_parallels: usize,
}

/// 持久化配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    /// 项目数据目录
    pub data_dir: PathBuf,
}

/// 检索配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// 每个分块的词数
    pub chunk_size: usize,

    /// 相邻分块重叠的词数
    pub chunk_overlap: usize,

    /// 最低相似度阈值
    pub min_similarity: f32,

    /// 默认返回的结果数，问答时作为上下文的检索结果数量
    pub top_k: usize,
}

/// 流水线配置
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct PipelineConfig {
    /// 重新运行前是否清空该项目已有的派生产物（概念、假设、统计、大纲、幻灯片）
    pub clear_derived_on_rerun: bool,

    /// 覆盖各阶段的失败策略（键为阶段名，如 `hypothesis`），未配置的阶段使用默认策略
    pub failure_policy: HashMap<String, StageFailurePolicy>,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to open config file: {:?}", path))?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 按优先级加载配置：显式路径 > 当前目录下的默认文件 > 默认值
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let default_path = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            Self::from_file(&default_path)
        } else {
            Ok(Self::default())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            documents_path: PathBuf::from("./documents"),
            output_path: PathBuf::from("./paperforge.out"),
            document_patterns: vec!["*.txt".to_string(), "*.md".to_string()],
            llm: LLMConfig::default(),
            store: StoreConfig::default(),
            retrieval: RetrievalConfig::default(),
            pipeline: PipelineConfig::default(),
            verbose: false,
        }
    }
}

impl LLMConfig {
    /// 实际请求的API基地址
    pub fn base_url(&self) -> &str {
        match self.api_base_url.trim() {
            "" => self.provider.default_base_url(),
            configured => configured,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: std::env::var(API_KEY_ENV).unwrap_or_default(),
            api_base_url: String::new(),
            model_efficient: String::from("gemini-2.5-flash"),
            model_powerful: String::from("gemini-2.5-pro"),
            embedding_model: String::from("text-embedding-004"),
            max_tokens: 8192,
            temperature: 0.7,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            max_parallels: 4,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".paperforge"),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            min_similarity: 0.5,
            top_k: 3,
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;
