use std::sync::Arc;

use crate::config::Config;
use crate::llm::backend::GenerativeBackend;
use crate::pipeline::guard::RunGuard;
use crate::pipeline::policy::PipelinePolicy;
use crate::store::Store;

/// 流水线运行所需的全部服务，进程启动时构建一次
#[derive(Clone)]
pub struct PipelineContext {
    /// 配置
    pub config: Config,
    /// 生成式后端
    pub backend: Arc<dyn GenerativeBackend>,
    /// 持久化层
    pub store: Arc<dyn Store>,
    /// 项目级互斥
    pub run_guard: RunGuard,
    /// 逐阶段失败策略
    pub policy: PipelinePolicy,
}

impl PipelineContext {
    pub fn new(
        config: Config,
        backend: Arc<dyn GenerativeBackend>,
        store: Arc<dyn Store>,
    ) -> Self {
        let policy = PipelinePolicy::from_config(&config.pipeline);
        Self {
            config,
            backend,
            store,
            run_guard: RunGuard::new(),
            policy,
        }
    }

    /// 替换失败策略
    pub fn with_policy(mut self, policy: PipelinePolicy) -> Self {
        self.policy = policy;
        self
    }
}
