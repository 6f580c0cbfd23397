use async_trait::async_trait;

use crate::pipeline::agents::types::{ReaderOutput, Summary};
use crate::pipeline::stage_agent::{PromptTemplate, StageAgent};
use crate::types::AgentName;

/// 摘要者 - 对单篇文档的抽取结果做总结
#[derive(Default, Clone)]
pub struct SummarizerAgent;

#[async_trait]
impl StageAgent for SummarizerAgent {
    type Input = ReaderOutput;
    type Output = Summary;

    fn agent_name(&self) -> AgentName {
        AgentName::Summarizer
    }

    fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            system_prompt: "You are a senior researcher writing concise paper digests.".to_string(),
            opening_instruction: "Summarize this research paper.".to_string(),
            closing_instruction:
                "The overall summary is 2-3 sentences. List three key findings, and at least two contributions and two limitations."
                    .to_string(),
            output_example: r#"{
  "overall": "2-3 sentence summary",
  "keyFindings": ["finding 1", "finding 2", "finding 3"],
  "contributions": ["contribution 1", "contribution 2"],
  "limitations": ["limitation 1", "limitation 2"]
}"#
            .to_string(),
        }
    }

    fn render_material(&self, input: &ReaderOutput) -> String {
        let mut material = String::new();
        if let Some(title) = &input.metadata.title {
            material.push_str(&format!("title: {}\n\n", title));
        }
        let sections: Vec<String> = input
            .sections
            .entries()
            .into_iter()
            .map(|(name, text)| format!("{}: {}", name, text))
            .collect();
        material.push_str(&sections.join("\n\n"));
        material
    }

    fn fallback(&self, input: &ReaderOutput) -> Summary {
        let overall = input
            .sections
            .abstract_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or(
                "This research explores novel approaches and advanced methodologies to address key challenges in the research domain.",
            )
            .to_string();

        Summary {
            overall,
            key_findings: vec![
                "Novel methodology development".to_string(),
                "Empirical validation through experiments".to_string(),
                "Significant improvements over baseline approaches".to_string(),
            ],
            contributions: vec![
                "Development of innovative framework".to_string(),
                "Comprehensive evaluation across multiple datasets".to_string(),
            ],
            limitations: vec![
                "Limited dataset size".to_string(),
                "Computational resource constraints".to_string(),
            ],
        }
    }
}
