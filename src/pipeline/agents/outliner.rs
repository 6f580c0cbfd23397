use async_trait::async_trait;

use crate::pipeline::agents::types::{OutlineSection, ResearchOutline, Summary};
use crate::pipeline::stage_agent::{PromptTemplate, StageAgent};
use crate::types::AgentName;

/// 大纲规划者 - 基于全部摘要规划论文结构
#[derive(Default, Clone)]
pub struct OutlinerAgent;

#[async_trait]
impl StageAgent for OutlinerAgent {
    type Input = [Summary];
    type Output = ResearchOutline;

    fn agent_name(&self) -> AgentName {
        AgentName::Outliner
    }

    fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            system_prompt: "You are an academic editor who plans the structure of research papers."
                .to_string(),
            opening_instruction: r#"Based on these research document summaries, create a comprehensive research paper outline. Include:
1. A compelling title
2. An abstract outline (key points to cover)
3. Main sections (Introduction, Literature Review, Methodology, Results, Discussion, Conclusion)
4. Subsections for each main section"#
                .to_string(),
            closing_instruction:
                "IMPORTANT: Include proper academic structure with Introduction, Literature Review, Methodology, Results, Discussion, and Conclusion sections. Number sections with `order` starting at 1."
                    .to_string(),
            output_example: r#"{
  "title": "Research Paper Title",
  "abstract": "Brief description of what the abstract should cover",
  "sections": [
    {
      "title": "Introduction",
      "description": "What this section should cover",
      "subsections": ["Background", "Research Questions", "Significance"],
      "order": 1
    }
  ]
}"#
            .to_string(),
        }
    }

    fn render_material(&self, input: &[Summary]) -> String {
        input
            .iter()
            .enumerate()
            .map(|(i, summary)| {
                format!(
                    "Document {}: {}",
                    i + 1,
                    serde_json::to_string(summary).unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn fallback(&self, _input: &[Summary]) -> ResearchOutline {
        let sections = [
            ("Introduction", "Introduction to the research topic", ["Background", "Research Questions"]),
            ("Literature Review", "Review of existing research", ["Key Studies", "Research Gaps"]),
            ("Methodology", "Research methods and approach", ["Data Collection", "Analysis Methods"]),
            ("Results", "Key findings", ["Primary Findings", "Secondary Findings"]),
            ("Discussion", "Interpretation of results", ["Implications", "Limitations"]),
            ("Conclusion", "Summary and future work", ["Summary", "Future Research"]),
        ];

        ResearchOutline {
            title: "Research Paper".to_string(),
            abstract_text: "This paper explores the key findings from the analyzed documents."
                .to_string(),
            sections: sections
                .iter()
                .zip(1u32..)
                .map(|((title, description, subsections), order)| OutlineSection {
                    title: title.to_string(),
                    description: description.to_string(),
                    subsections: subsections.iter().map(|s| s.to_string()).collect(),
                    order,
                })
                .collect(),
        }
    }
}
