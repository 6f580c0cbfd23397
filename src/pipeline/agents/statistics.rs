use async_trait::async_trait;

use crate::llm::backend::{BackendError, GenerativeBackend, generate_json};
use crate::pipeline::agents::types::{ReaderOutput, StatisticData, StatisticsResponse};
use crate::pipeline::stage_agent::{PromptBuilder, PromptTemplate, StageAgent};
use crate::types::AgentName;
use crate::utils::text::truncate_chars;

const MAX_INPUT_CHARS: usize = 20_000;

/// 统计数据抽取者 - 从文档正文中抽取量化结论和指标
#[derive(Default, Clone)]
pub struct StatisticsAgent;

impl StatisticsAgent {
    /// 将所有文档的章节正文拼接为统计抽取的输入
    pub fn collect_text(reader_outputs: &[ReaderOutput]) -> String {
        reader_outputs
            .iter()
            .map(|output| {
                output
                    .sections
                    .entries()
                    .into_iter()
                    .map(|(_, text)| text)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[async_trait]
impl StageAgent for StatisticsAgent {
    type Input = str;
    type Output = Vec<StatisticData>;

    fn agent_name(&self) -> AgentName {
        AgentName::Statistics
    }

    fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            system_prompt: "You are a data analyst auditing the quantitative claims of research papers."
                .to_string(),
            opening_instruction: r#"Analyze the following research document text and extract key statistical data points, quantitative claims, and performance metrics.
Focus on concrete numbers, percentages, and measured results. For each finding, provide:
1. category: Performance, Demographics, Financial, Efficiency, Accuracy or Other
2. label: a short descriptive label for the metric (e.g. "Accuracy", "Latency", "Sample Size")
3. value: the numerical value
4. unit: the unit of measurement (e.g. "%", "ms", "users", "USD"), omitted when unitless
5. context: the sentence or phrase where this statistic appears"#
                .to_string(),
            closing_instruction:
                "Return a JSON object with a \"statistics\" key containing an array of objects. Limit to the top 15 most significant statistics."
                    .to_string(),
            output_example: r#"{
  "statistics": [
    {"category": "Accuracy", "label": "Top-1 accuracy", "value": 92.4, "unit": "%", "context": "..."}
  ]
}"#
            .to_string(),
        }
    }

    fn render_material(&self, input: &str) -> String {
        truncate_chars(input, MAX_INPUT_CHARS).to_string()
    }

    fn fallback(&self, _input: &str) -> Vec<StatisticData> {
        Vec::new()
    }

    async fn process(
        &self,
        backend: &dyn GenerativeBackend,
        input: &str,
    ) -> Result<Vec<StatisticData>, BackendError> {
        let prompt = PromptBuilder::new(self.agent_name(), self.prompt_template())
            .build_json::<StatisticsResponse>(&self.render_material(input));
        let response: StatisticsResponse = generate_json(backend, &prompt).await?;
        Ok(response.into_statistics())
    }
}
