use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use crate::config::PipelineConfig;
use crate::types::AgentName;

/// 阶段失败后的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StageFailurePolicy {
    /// 记录警告并使用阶段的兜底输出，流水线继续
    #[default]
    Degrade,
    /// 将阶段运行记录与项目标记为error并终止流水线
    Abort,
}

impl Display for StageFailurePolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StageFailurePolicy::Degrade => write!(f, "degrade"),
            StageFailurePolicy::Abort => write!(f, "abort"),
        }
    }
}

/// 流水线定义时确定的逐阶段失败策略
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelinePolicy {
    overrides: HashMap<AgentName, StageFailurePolicy>,
}

impl PipelinePolicy {
    /// 从配置构建，无法识别的阶段名记录警告后忽略
    pub fn from_config(config: &PipelineConfig) -> Self {
        let mut overrides = HashMap::new();
        for (name, policy) in &config.failure_policy {
            match name.parse::<AgentName>() {
                Ok(agent) => {
                    overrides.insert(agent, *policy);
                }
                Err(e) => tracing::warn!("⚠️ 忽略未知阶段的失败策略配置: {}", e),
            }
        }
        Self { overrides }
    }

    /// 覆盖单个阶段的策略
    pub fn with(mut self, agent: AgentName, policy: StageFailurePolicy) -> Self {
        self.overrides.insert(agent, policy);
        self
    }

    pub fn for_stage(&self, agent: AgentName) -> StageFailurePolicy {
        self.overrides.get(&agent).copied().unwrap_or_default()
    }
}
