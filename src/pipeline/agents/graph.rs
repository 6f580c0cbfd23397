use async_trait::async_trait;

use crate::pipeline::agents::types::{ConceptGraph, ConceptNode, Summary};
use crate::pipeline::stage_agent::{PromptTemplate, StageAgent};
use crate::types::AgentName;

/// 概念图构建者 - 从全部摘要中提取概念及其关系
#[derive(Default, Clone)]
pub struct GraphAgent;

#[async_trait]
impl StageAgent for GraphAgent {
    type Input = [Summary];
    type Output = ConceptGraph;

    fn agent_name(&self) -> AgentName {
        AgentName::Graph
    }

    fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            system_prompt: "You are a knowledge engineer who maps research fields into concept graphs."
                .to_string(),
            opening_instruction:
                "Extract concepts and relationships from these research summaries to build a knowledge graph."
                    .to_string(),
            closing_instruction:
                "Create 8-12 nodes representing key concepts, with importance scores (0-100) and cluster assignments (0-3). Edges reference node ids."
                    .to_string(),
            output_example: r#"{
  "nodes": [
    {"id": "1", "label": "Machine Learning", "importance": 95, "cluster": 0},
    {"id": "2", "label": "Neural Networks", "importance": 88, "cluster": 0}
  ],
  "edges": [
    {"source": "1", "target": "2", "relationship": "uses"}
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
                    "Paper {}:\n{}\nKey Findings: {}",
                    i + 1,
                    summary.overall,
                    summary.key_findings.join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn fallback(&self, _input: &[Summary]) -> ConceptGraph {
        ConceptGraph {
            nodes: vec![ConceptNode {
                id: "1".to_string(),
                label: "Research Concept".to_string(),
                importance: 80,
                cluster: 0,
            }],
            edges: Vec::new(),
        }
    }
}
