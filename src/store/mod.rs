//! 持久化层：项目、文档、阶段运行记录以及流水线派生产物

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{
    AgentName, AgentRun, ConceptNodeRecord, Document, HypothesisRecord, OutlineRecord,
    PresentationRecord, Project, ProjectStatus, StatisticRecord,
};

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::{MemoryStore, ProjectSnapshot};

/// 持久化错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    pub fn project_not_found(id: &str) -> Self {
        StoreError::NotFound {
            entity: "project",
            id: id.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// 持久化接口，同一项目的写入由实现方串行化
#[async_trait]
pub trait Store: Send + Sync {
    // 项目
    async fn create_project(&self, project: Project) -> StoreResult<Project>;
    async fn get_project(&self, project_id: &str) -> StoreResult<Option<Project>>;
    async fn list_projects(&self) -> StoreResult<Vec<Project>>;
    /// 更新状态，`progress` 为None时保留原值
    async fn update_project_status(
        &self,
        project_id: &str,
        status: ProjectStatus,
        progress: Option<u8>,
    ) -> StoreResult<Project>;
    async fn update_project_progress(&self, project_id: &str, progress: u8)
    -> StoreResult<Project>;

    // 文档
    async fn add_document(&self, document: Document) -> StoreResult<Document>;
    async fn list_documents(&self, project_id: &str) -> StoreResult<Vec<Document>>;

    // 阶段运行记录
    /// 以 `running` 状态创建一条新记录，并分配全局递增序号
    async fn create_agent_run(&self, project_id: &str, agent: AgentName)
    -> StoreResult<AgentRun>;
    /// 查找 `(project, agent)` 下序号最大的 `running` 记录
    async fn find_latest_running_run(
        &self,
        project_id: &str,
        agent: AgentName,
    ) -> StoreResult<Option<AgentRun>>;
    async fn complete_agent_run(
        &self,
        project_id: &str,
        run_id: &str,
        output: String,
    ) -> StoreResult<AgentRun>;
    async fn fail_agent_run(
        &self,
        project_id: &str,
        run_id: &str,
        error: String,
    ) -> StoreResult<AgentRun>;
    /// 按序号升序返回项目的全部运行记录
    async fn list_agent_runs(&self, project_id: &str) -> StoreResult<Vec<AgentRun>>;
    /// 每个阶段序号最大的 `completed` 记录，按阶段顺序返回
    async fn latest_completed_runs(&self, project_id: &str) -> StoreResult<Vec<AgentRun>>;

    // 派生产物
    async fn create_concept_node(&self, node: ConceptNodeRecord)
    -> StoreResult<ConceptNodeRecord>;
    async fn list_concept_nodes(&self, project_id: &str) -> StoreResult<Vec<ConceptNodeRecord>>;
    async fn create_hypothesis(&self, hypothesis: HypothesisRecord)
    -> StoreResult<HypothesisRecord>;
    async fn list_hypotheses(&self, project_id: &str) -> StoreResult<Vec<HypothesisRecord>>;
    async fn create_statistic(&self, statistic: StatisticRecord) -> StoreResult<StatisticRecord>;
    async fn list_statistics(&self, project_id: &str) -> StoreResult<Vec<StatisticRecord>>;
    async fn create_outline(&self, outline: OutlineRecord) -> StoreResult<OutlineRecord>;
    async fn list_outlines(&self, project_id: &str) -> StoreResult<Vec<OutlineRecord>>;
    async fn create_presentation(
        &self,
        presentation: PresentationRecord,
    ) -> StoreResult<PresentationRecord>;
    async fn list_presentations(&self, project_id: &str)
    -> StoreResult<Vec<PresentationRecord>>;

    /// 清空项目的概念、假设、统计、大纲与幻灯片，运行记录保留
    async fn clear_derived(&self, project_id: &str) -> StoreResult<()>;
}
