use async_trait::async_trait;

use crate::pipeline::agents::types::{ConceptGraph, Hypothesis};
use crate::pipeline::stage_agent::{PromptTemplate, StageAgent};
use crate::types::AgentName;

/// 假设生成者 - 基于概念图提出可检验的研究假设
#[derive(Default, Clone)]
pub struct HypothesisAgent;

#[async_trait]
impl StageAgent for HypothesisAgent {
    type Input = ConceptGraph;
    type Output = Vec<Hypothesis>;

    fn agent_name(&self) -> AgentName {
        AgentName::Hypothesis
    }

    fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            system_prompt: "You are a principal investigator proposing new research directions."
                .to_string(),
            opening_instruction:
                "Based on these research concepts, generate 5-6 novel research hypotheses that could advance the field."
                    .to_string(),
            closing_instruction:
                "Return a JSON array. Each hypothesis has scores (0-100) for testability, novelty and feasibility."
                    .to_string(),
            output_example: r#"[
  {
    "id": "1",
    "title": "Hypothesis title",
    "description": "Detailed description of the hypothesis",
    "testability": 85,
    "novelty": 90,
    "feasibility": 75,
    "category": "Machine Learning"
  }
]"#
            .to_string(),
        }
    }

    fn render_material(&self, input: &ConceptGraph) -> String {
        let concepts: Vec<&str> = input.nodes.iter().map(|n| n.label.as_str()).collect();
        format!("Research concepts: {}", concepts.join(", "))
    }

    fn fallback(&self, _input: &ConceptGraph) -> Vec<Hypothesis> {
        vec![Hypothesis {
            id: "1".to_string(),
            title: "Generated Hypothesis".to_string(),
            description: "Hypothesis generation failed".to_string(),
            testability: 50,
            novelty: 50,
            feasibility: 50,
            category: "General".to_string(),
        }]
    }
}
