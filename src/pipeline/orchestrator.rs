use std::future::Future;
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;

use crate::llm::backend::BackendError;
use crate::pipeline::agents::{
    ExperimentAgent, GraphAgent, HypothesisAgent, OutlinerAgent, PresentationData,
    PresenterAgent, ReaderAgent, ResearchOutline, ResearchPaper, ReviewInput, ReviewReport,
    ReviewerAgent, StatisticsAgent, SummarizerAgent, WriterAgent, WriterInput,
};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::policy::StageFailurePolicy;
use crate::pipeline::progress::{Checkpoint, ProgressTracker};
use crate::pipeline::stage_agent::StageAgent;
use crate::pipeline::timing::TimingScope;
use crate::store::StoreError;
use crate::types::{
    AgentName, ConceptNodeRecord, HypothesisRecord, OutlineRecord, PresentationRecord,
    ProjectStatus, StatisticRecord,
};

/// 流水线错误
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("a pipeline is already running for project {0}")]
    AlreadyRunning(String),

    #[error("project {0} has no documents")]
    NoDocuments(String),

    /// 策略为Abort的阶段执行失败
    #[error("stage {agent} failed: {source}")]
    StageFailed {
        agent: AgentName,
        #[source]
        source: BackendError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to serialize stage output: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// 一次成功运行的最终产物
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub project_id: String,
    pub outline: ResearchOutline,
    pub paper: ResearchPaper,
    pub review: ReviewReport,
    pub presentation: PresentationData,
}

/// 单个项目的一次流水线运行
pub struct PipelineOrchestrator<'a> {
    ctx: &'a PipelineContext,
    project_id: String,
    progress: ProgressTracker,
    timing: Mutex<TimingScope>,
}

impl<'a> PipelineOrchestrator<'a> {
    pub fn new(ctx: &'a PipelineContext, project_id: &str) -> Self {
        Self {
            ctx,
            project_id: project_id.to_string(),
            progress: ProgressTracker::new(),
            timing: Mutex::new(TimingScope::new()),
        }
    }

    /// 执行完整流水线
    ///
    /// 项目不存在时不做任何写入；同一项目已在运行时立即返回 [`PipelineError::AlreadyRunning`]。
    /// 其余任何错误都会先将项目置为 `error`（进度保留），再向上传递。
    pub async fn run(self) -> Result<PipelineOutcome, PipelineError> {
        let project_id = self.project_id.clone();

        if self.ctx.store.get_project(&project_id).await?.is_none() {
            return Err(PipelineError::ProjectNotFound(project_id));
        }

        let _token = self
            .ctx
            .run_guard
            .try_acquire(&project_id)
            .ok_or_else(|| PipelineError::AlreadyRunning(project_id.clone()))?;

        tracing::info!("🚀 开始执行研究流水线，项目: {}", project_id);

        match self.execute().await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::error!("❌ 流水线执行失败，项目 {}: {}", project_id, e);
                if let Err(store_err) = self
                    .ctx
                    .store
                    .update_project_status(&project_id, ProjectStatus::Error, None)
                    .await
                {
                    tracing::warn!("⚠️ 无法将项目标记为error: {}", store_err);
                }
                Err(e)
            }
        }
    }

    async fn execute(&self) -> Result<PipelineOutcome, PipelineError> {
        let store = &self.ctx.store;
        let project_id = self.project_id.as_str();

        self.progress.advance(Checkpoint::RunStarted);
        store
            .update_project_status(project_id, ProjectStatus::Processing, Some(0))
            .await?;

        if self.ctx.config.pipeline.clear_derived_on_rerun {
            tracing::info!("🧹 清理项目的历史派生产物");
            store.clear_derived(project_id).await?;
        }

        let documents = store.list_documents(project_id).await?;
        if documents.is_empty() {
            return Err(PipelineError::NoDocuments(project_id.to_string()));
        }
        tracing::info!("📂 共 {} 篇文档", documents.len());

        let reader_outputs = self
            .run_stage(AgentName::Reader, async {
                let mut outputs = Vec::with_capacity(documents.len());
                for document in &documents {
                    tracing::debug!("📖 阅读文档: {}", document.file_name);
                    outputs.push(
                        self.invoke(&ReaderAgent, document.extracted_text.as_str())
                            .await?,
                    );
                }
                Ok(outputs)
            })
            .await?;

        let summaries = self
            .run_stage(AgentName::Summarizer, async {
                let mut summaries = Vec::with_capacity(reader_outputs.len());
                for output in &reader_outputs {
                    summaries.push(self.invoke(&SummarizerAgent, output).await?);
                }
                Ok(summaries)
            })
            .await?;

        let graph = self
            .run_stage(AgentName::Graph, self.invoke(&GraphAgent, summaries.as_slice()))
            .await?;
        for node in &graph.nodes {
            store
                .create_concept_node(ConceptNodeRecord::new(
                    project_id,
                    &node.label,
                    node.importance,
                    node.cluster,
                ))
                .await?;
        }

        let hypotheses = self
            .run_stage(AgentName::Hypothesis, self.invoke(&HypothesisAgent, &graph))
            .await?;
        for hypothesis in &hypotheses {
            store
                .create_hypothesis(HypothesisRecord::new(
                    project_id,
                    &hypothesis.title,
                    &hypothesis.description,
                    (
                        hypothesis.testability,
                        hypothesis.novelty,
                        hypothesis.feasibility,
                    ),
                    &hypothesis.category,
                ))
                .await?;
        }

        let outline = self
            .run_stage(
                AgentName::Outliner,
                self.invoke(&OutlinerAgent, summaries.as_slice()),
            )
            .await?;
        store
            .create_outline(OutlineRecord::new(
                project_id,
                &outline.title,
                &outline.abstract_text,
                serde_json::to_string(&outline.sections)?,
            ))
            .await?;

        let statistics_text = StatisticsAgent::collect_text(&reader_outputs);
        let statistics = self
            .run_stage(
                AgentName::Statistics,
                self.invoke(&StatisticsAgent, statistics_text.as_str()),
            )
            .await?;
        for statistic in statistics.iter().filter(|s| s.value.is_finite()) {
            store
                .create_statistic(StatisticRecord::new(
                    project_id,
                    &statistic.category,
                    &statistic.label,
                    statistic.value,
                    statistic.unit.clone(),
                    &statistic.context,
                ))
                .await?;
        }

        let experiments = self
            .run_stage(
                AgentName::Experiment,
                self.invoke(&ExperimentAgent, hypotheses.as_slice()),
            )
            .await?;

        let writer_input = WriterInput {
            outline: outline.clone(),
            summaries,
            hypotheses,
            experiments,
        };
        let paper = self
            .run_stage(AgentName::Writer, self.invoke(&WriterAgent, &writer_input))
            .await?;

        let review_input = ReviewInput {
            paper_text: paper.full_text.clone(),
            outline: outline.clone(),
        };
        let review = self
            .run_stage(AgentName::Reviewer, self.invoke(&ReviewerAgent, &review_input))
            .await?;

        let presentation = self
            .run_stage(
                AgentName::Presenter,
                self.invoke(&PresenterAgent, paper.full_text.as_str()),
            )
            .await?;
        store
            .create_presentation(PresentationRecord::new(
                project_id,
                &presentation.title,
                serde_json::to_string(&presentation.slides)?,
            ))
            .await?;

        store
            .update_project_status(project_id, ProjectStatus::Completed, Some(100))
            .await?;

        if let Ok(timing) = self.timing.lock() {
            tracing::info!("🎉 流水线执行完成\n{}", timing.generate_timing_report());
        }

        Ok(PipelineOutcome {
            project_id: project_id.to_string(),
            outline,
            paper,
            review,
            presentation,
        })
    }

    /// 调用阶段智能体，失败时按该阶段的策略降级或终止
    async fn invoke<A>(&self, agent: &A, input: &A::Input) -> Result<A::Output, PipelineError>
    where
        A: StageAgent,
    {
        let agent_name = agent.agent_name();
        match agent.process(self.ctx.backend.as_ref(), input).await {
            Ok(output) => Ok(output),
            Err(e) => match self.ctx.policy.for_stage(agent_name) {
                StageFailurePolicy::Degrade => {
                    tracing::warn!("⚠️ {} 智能体执行失败，使用兜底结果: {}", agent_name, e);
                    Ok(agent.fallback(input))
                }
                StageFailurePolicy::Abort => Err(PipelineError::StageFailed {
                    agent: agent_name,
                    source: e,
                }),
            },
        }
    }

    /// 以一条运行记录包裹一个阶段：推进进度、创建running记录、执行、记录结果
    async fn run_stage<T, F>(&self, agent: AgentName, stage: F) -> Result<T, PipelineError>
    where
        T: Serialize,
        F: Future<Output = Result<T, PipelineError>>,
    {
        let store = &self.ctx.store;
        let project_id = self.project_id.as_str();

        self.checkpoint(Checkpoint::StageStarted(agent)).await?;
        let run = store.create_agent_run(project_id, agent).await?;
        tracing::info!("🤖 执行 {} 智能体分析...", agent);

        self.start_phase(agent);
        let result = stage.await;
        self.end_phase(agent);

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                if let Err(store_err) = store
                    .fail_agent_run(project_id, &run.id, e.to_string())
                    .await
                {
                    tracing::warn!("⚠️ 无法记录 {} 阶段的失败: {}", agent, store_err);
                }
                return Err(e);
            }
        };

        let serialized = serde_json::to_string(&output)?;
        let run_id = store
            .find_latest_running_run(project_id, agent)
            .await?
            .map(|latest| latest.id)
            .unwrap_or(run.id);
        store
            .complete_agent_run(project_id, &run_id, serialized)
            .await?;
        tracing::info!("✓ {} 分析完成", agent);

        self.checkpoint(Checkpoint::StageFinished(agent)).await?;
        Ok(output)
    }

    /// 100% 只随 `completed` 状态一起写入
    async fn checkpoint(&self, checkpoint: Checkpoint) -> Result<(), PipelineError> {
        if let Some(progress) = self.progress.advance(checkpoint) {
            if progress < 100 {
                self.ctx
                    .store
                    .update_project_progress(&self.project_id, progress)
                    .await?;
            }
        }
        Ok(())
    }

    fn start_phase(&self, agent: AgentName) {
        if let Ok(mut timing) = self.timing.lock() {
            timing.start_phase(agent.as_str());
        }
    }

    fn end_phase(&self, agent: AgentName) {
        if let Ok(mut timing) = self.timing.lock() {
            if let Some(duration) = timing.end_phase(agent.as_str()) {
                tracing::debug!("⏱️ {} 耗时 {:.2}秒", agent, duration.as_secs_f64());
            }
        }
    }
}
