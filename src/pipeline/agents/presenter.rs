use async_trait::async_trait;

use crate::pipeline::agents::types::{PresentationData, Slide};
use crate::pipeline::stage_agent::{PromptTemplate, StageAgent};
use crate::types::AgentName;
use crate::utils::text::truncate_chars;

const MAX_PAPER_CHARS: usize = 8_000;

/// 演示文稿生成者 - 将论文全文转为幻灯片
#[derive(Default, Clone)]
pub struct PresenterAgent;

fn slide(title: &str, bullets: &[&str], notes: &str) -> Slide {
    Slide {
        title: title.to_string(),
        bullets: bullets.iter().map(|b| b.to_string()).collect(),
        notes: notes.to_string(),
    }
}

#[async_trait]
impl StageAgent for PresenterAgent {
    type Input = str;
    type Output = PresentationData;

    fn agent_name(&self) -> AgentName {
        AgentName::Presenter
    }

    fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            system_prompt: "You are a scientific communicator preparing a conference talk."
                .to_string(),
            opening_instruction:
                "Create a presentation deck (8-12 slides) summarizing this research paper."
                    .to_string(),
            closing_instruction:
                "Each slide has a title, 3-5 concise bullet points and speaker notes.".to_string(),
            output_example: r#"{
  "title": "Presentation Title",
  "slides": [
    {
      "title": "Slide Title",
      "bullets": ["Point 1", "Point 2", "Point 3"],
      "notes": "Speaker notes for this slide"
    }
  ]
}"#
            .to_string(),
        }
    }

    fn render_material(&self, input: &str) -> String {
        truncate_chars(input, MAX_PAPER_CHARS).to_string()
    }

    fn fallback(&self, _input: &str) -> PresentationData {
        PresentationData {
            title: "Research Presentation".to_string(),
            slides: vec![
                slide(
                    "Overview",
                    &[
                        "AI-powered research analysis",
                        "Multi-document synthesis",
                        "Automated hypothesis generation",
                    ],
                    "Introduction to the research platform capabilities.",
                ),
                slide(
                    "Key Findings",
                    &[
                        "Finding 1: Summary pending",
                        "Finding 2: Summary pending",
                        "Finding 3: Summary pending",
                    ],
                    "Highlight the most significant discoveries.",
                ),
                slide(
                    "Methodology",
                    &[
                        "Document analysis using AI agents",
                        "Knowledge graph construction",
                        "Hypothesis validation",
                    ],
                    "Explain the systematic approach taken.",
                ),
                slide(
                    "Conclusions",
                    &[
                        "Successfully demonstrated feasibility",
                        "Identified areas for future work",
                        "Validated through experiments",
                    ],
                    "Summarize the impact and next steps.",
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::scripted::ScriptedBackend;

    #[tokio::test]
    async fn test_generates_slides() {
        let backend = ScriptedBackend::new().respond(
            "Stage: presenter",
            r#"{"title": "Talk", "slides": [{"title": "Intro", "bullets": ["a", "b"]}]}"#,
        );
        let deck = PresenterAgent.process(&backend, "# Paper").await.unwrap();
        assert_eq!(deck.title, "Talk");
        assert_eq!(deck.slides[0].bullets, vec!["a", "b"]);
        assert_eq!(deck.slides[0].notes, "");
    }

    #[test]
    fn test_fallback_deck() {
        let deck = PresenterAgent.fallback("");
        let titles: Vec<&str> = deck.slides.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Overview", "Key Findings", "Methodology", "Conclusions"]
        );
        assert!(deck.slides.iter().all(|s| s.bullets.len() == 3));
    }
}
