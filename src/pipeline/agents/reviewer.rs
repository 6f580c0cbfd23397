use async_trait::async_trait;

use crate::llm::backend::{GenerativeBackend, generate_json};
use crate::pipeline::agents::types::{CompletenessCheck, ReviewFeedback, ReviewInput, ReviewReport};
use crate::pipeline::stage_agent::{PromptBuilder, PromptTemplate, StageAgent};
use crate::types::AgentName;
use crate::utils::text::truncate_chars;

const MAX_PAPER_CHARS: usize = 10_000;
const MAX_COMPLETENESS_CHARS: usize = 5_000;

/// 同行评审者 - 对照大纲评审论文全文
#[derive(Default, Clone)]
pub struct ReviewerAgent;

impl ReviewerAgent {
    /// 检查论文是否覆盖了全部必需章节，失败时返回"不完整"的结论而不是报错
    pub async fn validate_completeness(
        &self,
        backend: &dyn GenerativeBackend,
        paper_text: &str,
        required_sections: &[String],
    ) -> CompletenessCheck {
        let template = PromptTemplate {
            system_prompt: "You are a meticulous journal editor.".to_string(),
            opening_instruction: format!(
                "Check if this research paper includes all required sections: {}",
                required_sections.join(", ")
            ),
            closing_instruction:
                "Identify missing sections and any structural issues in the paper.".to_string(),
            output_example: r#"{
  "complete": true,
  "missingSections": [],
  "issues": ["Issue description"]
}"#
            .to_string(),
        };
        let prompt = PromptBuilder::for_step(AgentName::Reviewer, "completeness", template)
            .build_json::<CompletenessCheck>(truncate_chars(paper_text, MAX_COMPLETENESS_CHARS));

        match generate_json::<CompletenessCheck>(backend, &prompt).await {
            Ok(check) => check,
            Err(e) => {
                tracing::warn!("⚠️ 完整性检查失败: {}", e);
                CompletenessCheck {
                    complete: false,
                    missing_sections: Vec::new(),
                    issues: vec!["Validation check failed".to_string()],
                }
            }
        }
    }
}

#[async_trait]
impl StageAgent for ReviewerAgent {
    type Input = ReviewInput;
    type Output = ReviewReport;

    fn agent_name(&self) -> AgentName {
        AgentName::Reviewer
    }

    fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            system_prompt: "You are an expert academic reviewer.".to_string(),
            opening_instruction: r#"Evaluate this research paper comprehensively.
Evaluate:
1. Overall quality and coherence
2. Section-by-section analysis
3. Scientific rigor and methodology
4. Writing clarity and structure
5. Citations and references"#
                .to_string(),
            closing_instruction: "Be thorough, constructive, and specific in your feedback. Scores range from 0 to 100."
                .to_string(),
            output_example: r#"{
  "overallScore": 75,
  "summary": "Brief overall assessment",
  "sectionReviews": [
    {
      "section": "Introduction",
      "score": 80,
      "strengths": ["Strength 1", "Strength 2"],
      "weaknesses": ["Weakness 1"],
      "suggestions": ["Suggestion 1", "Suggestion 2"]
    }
  ],
  "criticalIssues": ["Issue 1", "Issue 2"],
  "recommendations": ["Recommendation 1", "Recommendation 2"]
}"#
            .to_string(),
        }
    }

    fn render_material(&self, input: &ReviewInput) -> String {
        format!(
            "Paper Content:\n{}\n\nExpected outline structure:\n{}",
            truncate_chars(&input.paper_text, MAX_PAPER_CHARS),
            serde_json::to_string_pretty(&input.outline).unwrap_or_default()
        )
    }

    fn fallback(&self, _input: &ReviewInput) -> ReviewReport {
        ReviewReport {
            overall_score: 70,
            summary: "Paper shows promise but needs refinement in several areas.".to_string(),
            section_reviews: vec![ReviewFeedback {
                section: "Overall".to_string(),
                score: 70,
                strengths: vec![
                    "Coherent structure".to_string(),
                    "Clear research direction".to_string(),
                ],
                weaknesses: vec!["Some sections need more depth".to_string()],
                suggestions: vec![
                    "Expand methodology".to_string(),
                    "Add more references".to_string(),
                ],
            }],
            critical_issues: vec!["Review unavailable - using default assessment".to_string()],
            recommendations: vec![
                "Review each section for completeness".to_string(),
                "Ensure all claims are supported by evidence".to_string(),
                "Check for logical flow and transitions".to_string(),
            ],
        }
    }
}
