use std::sync::atomic::{AtomicU8, Ordering};

use crate::types::AgentName;

/// 流水线进度检查点，对应固定的百分比
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    RunStarted,
    StageStarted(AgentName),
    StageFinished(AgentName),
}

impl Checkpoint {
    pub fn percent(&self) -> u8 {
        match self {
            Checkpoint::RunStarted => 0,
            Checkpoint::StageStarted(agent) => stage_percents(*agent).0,
            Checkpoint::StageFinished(agent) => stage_percents(*agent).1,
        }
    }
}

/// （开始，结束）百分比
fn stage_percents(agent: AgentName) -> (u8, u8) {
    match agent {
        AgentName::Reader => (10, 20),
        AgentName::Summarizer => (30, 40),
        AgentName::Graph => (50, 60),
        AgentName::Hypothesis => (70, 80),
        AgentName::Outliner => (82, 85),
        AgentName::Statistics => (86, 87),
        AgentName::Experiment => (88, 90),
        AgentName::Writer => (92, 95),
        AgentName::Reviewer => (96, 97),
        AgentName::Presenter => (98, 100),
    }
}

/// 单次运行内的进度记录器，只接受不小于当前值的进度
#[derive(Debug, Default)]
pub struct ProgressTracker {
    current: AtomicU8,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 推进到检查点，返回需要写入的新进度；未前进时返回None
    pub fn advance(&self, checkpoint: Checkpoint) -> Option<u8> {
        let target = checkpoint.percent();
        let previous = self.current.fetch_max(target, Ordering::SeqCst);
        (target > previous).then_some(target)
    }

    pub fn current(&self) -> u8 {
        self.current.load(Ordering::SeqCst)
    }
}
