use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// 项目级互斥：同一项目同一时刻只允许一个流水线运行
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    active: Arc<Mutex<HashSet<String>>>,
}

/// 持有期间项目处于运行中，drop时释放
#[derive(Debug)]
pub struct RunToken {
    project_id: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试占用项目，已被占用时返回None
    pub fn try_acquire(&self, project_id: &str) -> Option<RunToken> {
        let mut active = self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !active.insert(project_id.to_string()) {
            return None;
        }
        Some(RunToken {
            project_id: project_id.to_string(),
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_running(&self, project_id: &str) -> bool {
        self.active
            .lock()
            .map(|active| active.contains(project_id))
            .unwrap_or(false)
    }
}

impl RunToken {
    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}

impl Drop for RunToken {
    fn drop(&mut self) {
        let mut active = self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        active.remove(&self.project_id);
    }
}
