use async_trait::async_trait;

use crate::pipeline::agents::types::{Experiment, Hypothesis};
use crate::pipeline::stage_agent::{PromptTemplate, StageAgent};
use crate::types::AgentName;

/// 参与实验设计的假设数量
pub const TOP_HYPOTHESES: usize = 3;

/// 实验设计者 - 为排名靠前的假设设计实验
#[derive(Default, Clone)]
pub struct ExperimentAgent;

fn top_hypotheses(hypotheses: &[Hypothesis]) -> &[Hypothesis] {
    &hypotheses[..hypotheses.len().min(TOP_HYPOTHESES)]
}

#[async_trait]
impl StageAgent for ExperimentAgent {
    type Input = [Hypothesis];
    type Output = Vec<Experiment>;

    fn agent_name(&self) -> AgentName {
        AgentName::Experiment
    }

    fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            system_prompt: "You are an experimental scientist designing rigorous studies.".to_string(),
            opening_instruction: "Design experiments for these hypotheses.".to_string(),
            closing_instruction:
                "Return a JSON array with one experiment per hypothesis, in the same order."
                    .to_string(),
            output_example: r#"[
  {
    "hypothesis": "Hypothesis title",
    "methodology": "Experimental design and approach",
    "resources": ["Resource 1", "Resource 2"],
    "timeline": "6 months",
    "expectedOutcomes": ["Outcome 1", "Outcome 2"]
  }
]"#
            .to_string(),
        }
    }

    fn render_material(&self, input: &[Hypothesis]) -> String {
        top_hypotheses(input)
            .iter()
            .enumerate()
            .map(|(i, h)| format!("{}. {}: {}", i + 1, h.title, h.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn fallback(&self, input: &[Hypothesis]) -> Vec<Experiment> {
        top_hypotheses(input)
            .iter()
            .map(|h| Experiment {
                hypothesis: h.title.clone(),
                methodology: "Experimental design pending".to_string(),
                resources: Vec::new(),
                timeline: "TBD".to_string(),
                expected_outcomes: Vec::new(),
            })
            .collect()
    }
}
