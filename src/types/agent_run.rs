use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// 流水线中的阶段智能体，声明顺序即执行顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentName {
    Reader,
    Summarizer,
    Graph,
    Hypothesis,
    Outliner,
    Statistics,
    Experiment,
    Writer,
    Reviewer,
    Presenter,
}

impl AgentName {
    pub const ALL: [AgentName; 10] = [
        AgentName::Reader,
        AgentName::Summarizer,
        AgentName::Graph,
        AgentName::Hypothesis,
        AgentName::Outliner,
        AgentName::Statistics,
        AgentName::Experiment,
        AgentName::Writer,
        AgentName::Reviewer,
        AgentName::Presenter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentName::Reader => "reader",
            AgentName::Summarizer => "summarizer",
            AgentName::Graph => "graph",
            AgentName::Hypothesis => "hypothesis",
            AgentName::Outliner => "outliner",
            AgentName::Statistics => "statistics",
            AgentName::Experiment => "experiment",
            AgentName::Writer => "writer",
            AgentName::Reviewer => "reviewer",
            AgentName::Presenter => "presenter",
        }
    }
}

impl Display for AgentName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AgentName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentName::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown agent: {}", s))
    }
}

/// 单次阶段调用的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Error,
}

impl Display for RunStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Error => "error",
        };
        write!(f, "{}", str)
    }
}

/// 阶段运行记录
///
/// `output` 仅在 `status = completed` 时非空；同一 `(project_id, agent_name)`
/// 在多次流水线执行之间会累积多条记录，以 `sequence` 判断新旧。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentRun {
    pub id: String,
    pub project_id: String,
    pub agent_name: AgentName,
    pub status: RunStatus,
    /// 阶段输出的JSON序列化结果
    pub output: Option<String>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// 存储层分配的全局递增序号
    pub sequence: u64,
}

impl AgentRun {
    pub fn started(project_id: impl Into<String>, agent_name: AgentName, sequence: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            agent_name,
            status: RunStatus::Running,
            output: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
            sequence,
        }
    }

    pub fn complete(&mut self, output: String) {
        self.status = RunStatus::Completed;
        self.output = Some(output);
        self.error = None;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: String) {
        self.status = RunStatus::Error;
        self.output = None;
        self.error = Some(error);
        self.completed_at = Some(Utc::now());
    }

    /// 运行耗时（毫秒），未结束时为None
    pub fn duration_ms(&self) -> Option<i64> {
        self.completed_at
            .map(|completed| (completed - self.started_at).num_milliseconds())
    }
}
