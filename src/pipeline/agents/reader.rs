use async_trait::async_trait;

use crate::llm::backend::{BackendError, GenerativeBackend, generate_json};
use crate::pipeline::agents::types::{PaperMetadata, PaperSections, ReaderOutput};
use crate::pipeline::stage_agent::{PromptBuilder, PromptTemplate, StageAgent};
use crate::types::AgentName;
use crate::utils::text::truncate_chars;

/// 送入模型的原文长度上限（字符）
const MAX_INPUT_CHARS: usize = 15_000;
/// 兜底时保留为摘要的原文长度
const FALLBACK_ABSTRACT_CHARS: usize = 500;

/// 文档阅读者 - 从单篇文档中抽取章节、元数据和引用
#[derive(Default, Clone)]
pub struct ReaderAgent;

#[async_trait]
impl StageAgent for ReaderAgent {
    type Input = str;
    type Output = ReaderOutput;

    fn agent_name(&self) -> AgentName {
        AgentName::Reader
    }

    fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            system_prompt: "You are an expert reader of academic papers.".to_string(),
            opening_instruction:
                "Analyze this research paper and extract structured information: the text of each standard section, bibliographic metadata and the cited works."
                    .to_string(),
            closing_instruction:
                "Only fill a section when the paper actually contains it. Keep the authors' wording; do not invent metadata."
                    .to_string(),
            output_example: r#"{
  "sections": {
    "abstract": "...",
    "introduction": "...",
    "methods": "...",
    "results": "...",
    "discussion": "...",
    "conclusion": "..."
  },
  "metadata": {
    "title": "...",
    "authors": ["..."],
    "year": 2024,
    "keywords": ["..."]
  },
  "citations": ["..."]
}"#
            .to_string(),
        }
    }

    fn render_material(&self, input: &str) -> String {
        truncate_chars(input, MAX_INPUT_CHARS).to_string()
    }

    fn fallback(&self, input: &str) -> ReaderOutput {
        let excerpt = truncate_chars(input, FALLBACK_ABSTRACT_CHARS);
        ReaderOutput {
            sections: PaperSections {
                abstract_text: Some(excerpt.to_string()),
                ..Default::default()
            },
            metadata: PaperMetadata {
                title: Some("Extracted Document".to_string()),
                ..Default::default()
            },
            citations: Vec::new(),
        }
    }

    /// 空白文档不调用模型，直接返回占位结果
    async fn process(
        &self,
        backend: &dyn GenerativeBackend,
        input: &str,
    ) -> Result<ReaderOutput, BackendError> {
        if input.trim().is_empty() {
            tracing::debug!("文档内容为空，使用占位结构");
            return Ok(self.fallback(input));
        }

        let prompt = PromptBuilder::new(self.agent_name(), self.prompt_template())
            .build_json::<ReaderOutput>(&self.render_material(input));
        generate_json(backend, &prompt).await
    }
}
