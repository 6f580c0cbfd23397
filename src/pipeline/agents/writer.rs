use async_trait::async_trait;

use crate::llm::backend::{BackendError, GenerativeBackend, generate_json};
use crate::pipeline::agents::types::{
    OutlineSection, ResearchOutline, ResearchPaper, WriterInput,
};
use crate::pipeline::stage_agent::{PromptBuilder, PromptTemplate, StageAgent};
use crate::types::AgentName;
use crate::utils::text::truncate_chars;

const ABSTRACT_SUMMARIES_CHARS: usize = 1000;
const ABSTRACT_HYPOTHESES_CHARS: usize = 500;
const SECTION_SUMMARIES_CHARS: usize = 2000;
const SECTION_EXPERIMENTS_CHARS: usize = 1000;
const PREVIOUS_SECTIONS_CHARS: usize = 1500;
const REFERENCES_SUMMARIES_CHARS: usize = 1500;

const FALLBACK_ABSTRACT: &str = "This paper explores novel approaches in the research domain, leveraging advanced methodologies to address key challenges.";

/// 已生成的章节
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterContent {
    pub section_title: String,
    pub content: String,
}

/// 写作时共享的研究背景
#[derive(Debug, Clone, Default)]
struct WritingContext {
    summaries: String,
    hypotheses: String,
    experiments: String,
}

impl WritingContext {
    fn from_input(input: &WriterInput) -> Self {
        Self {
            summaries: input
                .summaries
                .iter()
                .map(|s| s.overall.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
            hypotheses: input
                .hypotheses
                .iter()
                .map(|h| format!("{}: {}", h.title, h.description))
                .collect::<Vec<_>>()
                .join("\n"),
            experiments: input
                .experiments
                .iter()
                .map(|e| format!("{}: {}", e.hypothesis, e.methodology))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// 论文撰写者 - 按大纲逐章节顺序写作，每一章都以前面已完成的章节为上下文
///
/// 摘要、单个章节、参考文献任一步失败都以占位内容代替，整篇论文总能产出。
#[derive(Default, Clone)]
pub struct WriterAgent;

impl WriterAgent {
    fn section_placeholder(title: &str) -> String {
        format!("Content for {} section is being generated...", title)
    }

    fn fallback_references() -> Vec<String> {
        vec![
            "Smith, J. (2023). Recent Advances in AI Research. Journal of AI Studies, 15(2), 123-145."
                .to_string(),
            "Johnson, A., & Lee, B. (2024). Machine Learning Applications. Academic Press."
                .to_string(),
        ]
    }

    async fn generate_abstract(
        &self,
        backend: &dyn GenerativeBackend,
        outline: &ResearchOutline,
        context: &WritingContext,
    ) -> String {
        let template = PromptTemplate {
            system_prompt: "You are an academic writer.".to_string(),
            opening_instruction: "Write a 150-200 word academic abstract for this research paper."
                .to_string(),
            closing_instruction:
                "Write a compelling abstract that summarizes the research problem, approach, and expected contributions. Use LaTeX for any formulas: inline $formula$ or block $$formula$$."
                    .to_string(),
            output_example: String::new(),
        };
        let material = format!(
            "Title: {}\nAbstract should cover: {}\n\nResearch context:\n{}\n\nKey hypotheses:\n{}",
            outline.title,
            outline.abstract_text,
            truncate_chars(&context.summaries, ABSTRACT_SUMMARIES_CHARS),
            truncate_chars(&context.hypotheses, ABSTRACT_HYPOTHESES_CHARS),
        );
        let prompt =
            PromptBuilder::for_step(AgentName::Writer, "abstract", template).build_text(&material);

        match backend.generate_text(&prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!("⚠️ 摘要生成失败，使用占位摘要: {}", e);
                FALLBACK_ABSTRACT.to_string()
            }
        }
    }

    async fn generate_section(
        &self,
        backend: &dyn GenerativeBackend,
        section: &OutlineSection,
        outline: &ResearchOutline,
        context: &WritingContext,
        previous_sections: &str,
    ) -> ChapterContent {
        let subsections = if section.subsections.is_empty() {
            "N/A".to_string()
        } else {
            section.subsections.join(", ")
        };

        let mut material = format!(
            "Section: \"{}\"\nPaper Title: {}\nSection Description: {}\nSubsections to cover: {}\n\nResearch Context:\n{}",
            section.title,
            outline.title,
            section.description,
            subsections,
            truncate_chars(&context.summaries, SECTION_SUMMARIES_CHARS),
        );
        if !context.experiments.is_empty() {
            material.push_str(&format!(
                "\n\nPlanned experiments:\n{}",
                truncate_chars(&context.experiments, SECTION_EXPERIMENTS_CHARS)
            ));
        }
        if !previous_sections.is_empty() {
            material.push_str(&format!(
                "\n\nPrevious sections for context:\n{}",
                truncate_chars(previous_sections, PREVIOUS_SECTIONS_CHARS)
            ));
        }

        let prompt = PromptBuilder::for_step(AgentName::Writer, "section", self.prompt_template())
            .build_text(&material);

        let content = match backend.generate_text(&prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!("⚠️ 章节 {} 生成失败，使用占位内容: {}", section.title, e);
                Self::section_placeholder(&section.title)
            }
        };

        ChapterContent {
            section_title: section.title.clone(),
            content,
        }
    }

    async fn generate_references(
        &self,
        backend: &dyn GenerativeBackend,
        context: &WritingContext,
    ) -> Vec<String> {
        let template = PromptTemplate {
            system_prompt: "You are an academic librarian.".to_string(),
            opening_instruction:
                "Based on this research context, suggest 8-10 relevant academic references in proper citation format."
                    .to_string(),
            closing_instruction: "Format each reference in APA style. Return a JSON array of strings."
                .to_string(),
            output_example: r#"["Author, A. (2024). Title. Journal, 1(2), 3-4."]"#.to_string(),
        };
        let prompt = PromptBuilder::for_step(AgentName::Writer, "references", template)
            .build_json::<Vec<String>>(truncate_chars(
                &context.summaries,
                REFERENCES_SUMMARIES_CHARS,
            ));

        match generate_json::<Vec<String>>(backend, &prompt).await {
            Ok(references) => references,
            Err(e) => {
                tracing::warn!("⚠️ 参考文献生成失败，使用默认条目: {}", e);
                Self::fallback_references()
            }
        }
    }

    /// 按固定格式拼接全文
    pub fn compile_paper(
        title: &str,
        abstract_text: &str,
        chapters: &[ChapterContent],
        references: &[String],
    ) -> String {
        let mut paper = format!("# {}\n\n", title);
        paper.push_str(&format!("## Abstract\n\n{}\n\n", abstract_text));

        for chapter in chapters {
            paper.push_str(&format!(
                "## {}\n\n{}\n\n",
                chapter.section_title, chapter.content
            ));
        }

        paper.push_str("## References\n\n");
        for (idx, reference) in references.iter().enumerate() {
            paper.push_str(&format!("{}. {}\n", idx + 1, reference));
        }

        paper
    }

    /// 标题包含关键字（忽略大小写）的第一个章节内容
    fn chapter_matching(chapters: &[ChapterContent], keyword: &str) -> String {
        chapters
            .iter()
            .find(|c| c.section_title.to_lowercase().contains(keyword))
            .map(|c| c.content.clone())
            .unwrap_or_default()
    }

    fn assemble(
        title: &str,
        abstract_text: String,
        chapters: &[ChapterContent],
        references: Vec<String>,
    ) -> ResearchPaper {
        let full_text = Self::compile_paper(title, &abstract_text, chapters, &references);
        ResearchPaper {
            title: title.to_string(),
            abstract_text,
            introduction: Self::chapter_matching(chapters, "introduction"),
            literature_review: Self::chapter_matching(chapters, "literature"),
            methodology: Self::chapter_matching(chapters, "methodology"),
            results: Self::chapter_matching(chapters, "result"),
            discussion: Self::chapter_matching(chapters, "discussion"),
            conclusion: Self::chapter_matching(chapters, "conclusion"),
            references,
            full_text,
        }
    }
}

#[async_trait]
impl StageAgent for WriterAgent {
    type Input = WriterInput;
    type Output = ResearchPaper;

    fn agent_name(&self) -> AgentName {
        AgentName::Writer
    }

    /// 单个章节的写作模板
    fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            system_prompt: "You are an academic writer drafting one section of a research paper."
                .to_string(),
            opening_instruction: "Write the section of this research paper described below."
                .to_string(),
            closing_instruction: r#"Guidelines:
- Write 500-800 words for this section
- Use academic writing style
- Include LaTeX notation for formulas: $inline$ or $$block$$
- Reference key findings from the research context
- Ensure logical flow and coherence with the previous sections
- Cover every listed subsection

Write the complete section content (do NOT include the section title in your response, just the content):"#
                .to_string(),
            output_example: String::new(),
        }
    }

    fn render_material(&self, input: &WriterInput) -> String {
        let context = WritingContext::from_input(input);
        format!(
            "Summaries:\n{}\n\nHypotheses:\n{}\n\nExperiments:\n{}",
            context.summaries, context.hypotheses, context.experiments
        )
    }

    fn fallback(&self, input: &WriterInput) -> ResearchPaper {
        let chapters: Vec<ChapterContent> = [
            "Introduction",
            "Literature Review",
            "Methodology",
            "Results",
            "Discussion",
            "Conclusion",
        ]
        .iter()
        .map(|title| ChapterContent {
            section_title: title.to_string(),
            content: Self::section_placeholder(title),
        })
        .collect();

        let title = if input.outline.title.is_empty() {
            "Research Paper"
        } else {
            input.outline.title.as_str()
        };
        Self::assemble(
            title,
            FALLBACK_ABSTRACT.to_string(),
            &chapters,
            Self::fallback_references(),
        )
    }

    /// 顺序执行：摘要 → 按order升序逐章节 → 参考文献 → 拼接全文
    async fn process(
        &self,
        backend: &dyn GenerativeBackend,
        input: &WriterInput,
    ) -> Result<ResearchPaper, BackendError> {
        let outline = &input.outline;
        let context = WritingContext::from_input(input);

        let abstract_text = self.generate_abstract(backend, outline, &context).await;

        let mut sections: Vec<&OutlineSection> = outline.sections.iter().collect();
        sections.sort_by_key(|s| s.order);

        let mut chapters = Vec::with_capacity(sections.len());
        let mut previous_sections = String::new();
        for section in sections {
            tracing::debug!("✍️ 撰写章节: {}", section.title);
            let chapter = self
                .generate_section(backend, section, outline, &context, &previous_sections)
                .await;
            previous_sections.push_str(&format!(
                "\n\n## {}\n{}",
                chapter.section_title, chapter.content
            ));
            chapters.push(chapter);
        }

        let references = self.generate_references(backend, &context).await;

        Ok(Self::assemble(
            &outline.title,
            abstract_text,
            &chapters,
            references,
        ))
    }
}
