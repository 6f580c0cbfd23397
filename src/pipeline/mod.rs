//! 研究流水线：按固定顺序驱动十个阶段，记录运行、推进进度并持久化产物

pub mod agents;
pub mod context;
pub mod guard;
pub mod orchestrator;
pub mod policy;
pub mod progress;
pub mod stage_agent;
pub mod timing;

pub use context::PipelineContext;
pub use orchestrator::{PipelineError, PipelineOrchestrator, PipelineOutcome};
pub use policy::{PipelinePolicy, StageFailurePolicy};

use tokio::task::JoinHandle;

/// 运行项目的研究流水线
pub async fn run_pipeline(
    ctx: &PipelineContext,
    project_id: &str,
) -> Result<PipelineOutcome, PipelineError> {
    PipelineOrchestrator::new(ctx, project_id).run().await
}

/// 在后台任务中运行流水线，调用方可以不等待结果
pub fn spawn_pipeline(
    ctx: PipelineContext,
    project_id: impl Into<String>,
) -> JoinHandle<Result<PipelineOutcome, PipelineError>> {
    let project_id = project_id.into();
    tokio::spawn(async move { run_pipeline(&ctx, &project_id).await })
}

// Include tests
#[cfg(test)]
mod tests;
