use crate::config::{Config, LLMProvider};
use crate::pipeline::StageFailurePolicy;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// PaperForge - 由Rust与AI驱动的研究论文合成引擎
#[derive(Parser, Debug)]
#[command(name = "paperforge")]
#[command(
    about = "AI-based research synthesis engine. It reads research documents, runs them through a fixed sequence of agents and produces an outline, a full paper, a peer review and a slide deck."
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// 配置文件路径
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 项目数据目录
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// 是否启用详细日志
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 导入文档并运行研究流水线
    Run(RunArgs),
    /// 查看项目状态与各阶段运行记录
    Status {
        /// 项目ID
        project_id: String,
    },
    /// 基于项目文档进行问答
    Ask(AskArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// 文档目录
    #[arg(short, long)]
    pub documents_path: Option<PathBuf>,

    /// 输出路径
    #[arg(short, long)]
    pub output_path: Option<PathBuf>,

    /// 在已有项目上重新运行
    #[arg(long)]
    pub project_id: Option<String>,

    /// 新项目的标题，默认取文档目录名
    #[arg(short, long)]
    pub title: Option<String>,

    /// 文档文件名匹配模式，可重复指定
    #[arg(long = "pattern")]
    pub patterns: Vec<String>,

    /// 重新运行前清空已有的派生产物
    #[arg(long)]
    pub clear_derived: bool,

    /// 失败即终止流水线的阶段，可重复指定（如 --abort-on hypothesis）
    #[arg(long = "abort-on")]
    pub abort_on: Vec<String>,

    #[command(flatten)]
    pub llm: LlmArgs,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    /// 项目ID
    pub project_id: String,

    /// 问题
    pub question: String,

    /// 返回的检索结果数量
    #[arg(long)]
    pub top_k: Option<usize>,

    #[command(flatten)]
    pub llm: LlmArgs,
}

#[derive(Args, Debug, Default)]
pub struct LlmArgs {
    /// LLM Provider (openai, gemini, anthropic, deepseek, openrouter, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// 高能效模型，用于常规阶段
    #[arg(long)]
    pub model_efficient: Option<String>,

    /// 高质量模型，用于长上下文以及efficient失效时的兜底
    #[arg(long)]
    pub model_powerful: Option<String>,

    /// 向量嵌入模型
    #[arg(long)]
    pub embedding_model: Option<String>,

    /// 最大tokens数
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    /// 最大并发数
    #[arg(long)]
    pub max_parallels: Option<usize>,
}

impl LlmArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(provider_str) = &self.llm_provider {
            if let Ok(provider) = provider_str.parse::<LLMProvider>() {
                config.llm.provider = provider;
            } else {
                tracing::warn!(
                    "⚠️ 警告: 未知的provider: {}，使用默认provider",
                    provider_str
                );
            }
        }
        if let Some(llm_api_base_url) = &self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url.clone();
        }
        if let Some(llm_api_key) = &self.llm_api_key {
            config.llm.api_key = llm_api_key.clone();
        }
        if let Some(model_efficient) = &self.model_efficient {
            config.llm.model_efficient = model_efficient.clone();
        }
        if let Some(model_powerful) = &self.model_powerful {
            config.llm.model_powerful = model_powerful.clone();
        }
        if let Some(embedding_model) = &self.embedding_model {
            config.llm.embedding_model = embedding_model.clone();
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }
        if let Some(max_parallels) = self.max_parallels {
            config.llm.max_parallels = max_parallels;
        }
    }
}

impl Cli {
    /// 加载配置文件并以CLI参数覆盖
    pub fn to_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(data_dir) = &self.data_dir {
            config.store.data_dir = data_dir.clone();
        }
        config.verbose = config.verbose || self.verbose;

        match &self.command {
            Command::Run(args) => {
                if let Some(documents_path) = &args.documents_path {
                    config.documents_path = documents_path.clone();
                }
                if let Some(output_path) = &args.output_path {
                    config.output_path = output_path.clone();
                }
                if !args.patterns.is_empty() {
                    config.document_patterns = args.patterns.clone();
                }
                if args.clear_derived {
                    config.pipeline.clear_derived_on_rerun = true;
                }
                for stage in &args.abort_on {
                    config
                        .pipeline
                        .failure_policy
                        .insert(stage.to_lowercase(), StageFailurePolicy::Abort);
                }
                args.llm.apply(&mut config);
            }
            Command::Ask(args) => {
                if let Some(top_k) = args.top_k {
                    config.retrieval.top_k = top_k;
                }
                args.llm.apply(&mut config);
            }
            Command::Status { .. } => {}
        }

        Ok(config)
    }
}
