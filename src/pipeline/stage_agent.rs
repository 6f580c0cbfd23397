use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::llm::backend::{BackendError, GenerativeBackend, generate_json};
use crate::types::AgentName;

/// Prompt模板配置
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// 角色设定
    pub system_prompt: String,
    /// 开头的说明性指令
    pub opening_instruction: String,
    /// 结尾的强调性指令
    pub closing_instruction: String,
    /// 期望输出的JSON示例
    pub output_example: String,
}

/// 标准的阶段Prompt构建器
pub struct PromptBuilder {
    header: String,
    template: PromptTemplate,
}

impl PromptBuilder {
    pub fn new(agent: AgentName, template: PromptTemplate) -> Self {
        Self {
            header: stage_header(agent, None),
            template,
        }
    }

    /// 同一阶段内的子步骤，如writer的单个章节
    pub fn for_step(agent: AgentName, step: &str, template: PromptTemplate) -> Self {
        Self {
            header: stage_header(agent, Some(step)),
            template,
        }
    }

    /// 构建要求JSON输出的prompt，附带输出类型的JSON Schema
    pub fn build_json<T: JsonSchema>(&self, material: &str) -> String {
        let schema = schemars::schema_for!(T);
        let schema_text = serde_json::to_string_pretty(&schema).unwrap_or_default();

        let mut prompt = self.build_text(material);
        prompt.push_str("\n\n## Output format\nReturn JSON shaped like this example:\n");
        prompt.push_str(&self.template.output_example);
        prompt.push_str("\n\nThe JSON must validate against this JSON Schema:\n");
        prompt.push_str(&schema_text);
        prompt
    }

    /// 构建自由文本prompt
    pub fn build_text(&self, material: &str) -> String {
        let mut prompt = String::new();
        prompt.push_str(&self.header);
        prompt.push('\n');
        prompt.push_str(&self.template.system_prompt);
        prompt.push_str("\n\n");
        prompt.push_str(&self.template.opening_instruction);
        prompt.push_str("\n\n## Material\n");
        prompt.push_str(material);
        prompt.push_str("\n\n");
        prompt.push_str(&self.template.closing_instruction);
        prompt
    }
}

fn stage_header(agent: AgentName, step: Option<&str>) -> String {
    match step {
        Some(step) => format!("Stage: {}/{}", agent, step),
        None => format!("Stage: {}", agent),
    }
}

/// 流水线阶段智能体
///
/// 智能体只负责尝试生成结果（[`StageAgent::process`]）以及给出同类型的兜底值
/// （[`StageAgent::fallback`]），失败后采用兜底还是终止流水线由编排器的策略决定。
#[async_trait]
pub trait StageAgent: Send + Sync {
    /// 阶段输入
    type Input: ?Sized + Sync;
    /// 阶段输出 - 必须支持JSON序列化
    type Output: JsonSchema + DeserializeOwned + Serialize + Send + Sync + 'static;

    fn agent_name(&self) -> AgentName;

    fn prompt_template(&self) -> PromptTemplate;

    /// 将输入渲染为prompt中的材料部分
    fn render_material(&self, input: &Self::Input) -> String;

    /// 结构合法的兜底输出
    fn fallback(&self, input: &Self::Input) -> Self::Output;

    /// 默认实现：构建标准prompt，以JSON模式调用后端并解码
    async fn process(
        &self,
        backend: &dyn GenerativeBackend,
        input: &Self::Input,
    ) -> Result<Self::Output, BackendError> {
        let prompt = PromptBuilder::new(self.agent_name(), self.prompt_template())
            .build_json::<Self::Output>(&self.render_material(input));
        generate_json(backend, &prompt).await
    }
}
