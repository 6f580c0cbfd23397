use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use super::{Store, StoreError, StoreResult};
use crate::types::{
    AgentName, AgentRun, ConceptNodeRecord, Document, HypothesisRecord, OutlineRecord,
    PresentationRecord, Project, ProjectStatus, RunStatus, StatisticRecord,
};

/// 单个项目的全部持久化数据
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    pub project: Project,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub agent_runs: Vec<AgentRun>,
    #[serde(default)]
    pub concept_nodes: Vec<ConceptNodeRecord>,
    #[serde(default)]
    pub hypotheses: Vec<HypothesisRecord>,
    #[serde(default)]
    pub statistics: Vec<StatisticRecord>,
    #[serde(default)]
    pub outlines: Vec<OutlineRecord>,
    #[serde(default)]
    pub presentations: Vec<PresentationRecord>,
}

impl ProjectSnapshot {
    fn new(project: Project) -> Self {
        Self {
            project,
            documents: Vec::new(),
            agent_runs: Vec::new(),
            concept_nodes: Vec::new(),
            hypotheses: Vec::new(),
            statistics: Vec::new(),
            outlines: Vec::new(),
            presentations: Vec::new(),
        }
    }

    fn max_sequence(&self) -> u64 {
        self.agent_runs
            .iter()
            .map(|run| run.sequence)
            .max()
            .unwrap_or(0)
    }

    fn agent_run_mut(&mut self, run_id: &str) -> StoreResult<&mut AgentRun> {
        self.agent_runs
            .iter_mut()
            .find(|run| run.id == run_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "agent run",
                id: run_id.to_string(),
            })
    }
}

/// 进程内存储，按项目保存快照
#[derive(Debug, Default)]
pub struct MemoryStore {
    projects: RwLock<HashMap<String, ProjectSnapshot>>,
    sequence: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 导出项目快照
    pub async fn snapshot(&self, project_id: &str) -> Option<ProjectSnapshot> {
        self.projects.read().await.get(project_id).cloned()
    }

    /// 载入项目快照（覆盖同id的项目），序号计数器前移到快照中的最大值
    pub async fn restore(&self, snapshot: ProjectSnapshot) {
        self.sequence
            .fetch_max(snapshot.max_sequence(), Ordering::SeqCst);
        self.projects
            .write()
            .await
            .insert(snapshot.project.id.clone(), snapshot);
    }

    /// 移除整个项目
    pub(crate) async fn discard(&self, project_id: &str) {
        self.projects.write().await.remove(project_id);
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn read_project<T>(
        &self,
        project_id: &str,
        f: impl FnOnce(&ProjectSnapshot) -> T,
    ) -> StoreResult<T> {
        let projects = self.projects.read().await;
        projects
            .get(project_id)
            .map(f)
            .ok_or_else(|| StoreError::project_not_found(project_id))
    }

    async fn write_project<T>(
        &self,
        project_id: &str,
        f: impl FnOnce(&mut ProjectSnapshot) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut projects = self.projects.write().await;
        let snapshot = projects
            .get_mut(project_id)
            .ok_or_else(|| StoreError::project_not_found(project_id))?;
        f(snapshot)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_project(&self, project: Project) -> StoreResult<Project> {
        let mut projects = self.projects.write().await;
        projects.insert(project.id.clone(), ProjectSnapshot::new(project.clone()));
        Ok(project)
    }

    async fn get_project(&self, project_id: &str) -> StoreResult<Option<Project>> {
        let projects = self.projects.read().await;
        Ok(projects.get(project_id).map(|s| s.project.clone()))
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let projects = self.projects.read().await;
        let mut list: Vec<Project> = projects.values().map(|s| s.project.clone()).collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    async fn update_project_status(
        &self,
        project_id: &str,
        status: ProjectStatus,
        progress: Option<u8>,
    ) -> StoreResult<Project> {
        self.write_project(project_id, |snapshot| {
            snapshot.project.status = status;
            if let Some(progress) = progress {
                snapshot.project.progress = progress.min(100);
            }
            snapshot.project.updated_at = Utc::now();
            Ok(snapshot.project.clone())
        })
        .await
    }

    async fn update_project_progress(
        &self,
        project_id: &str,
        progress: u8,
    ) -> StoreResult<Project> {
        self.write_project(project_id, |snapshot| {
            snapshot.project.progress = progress.min(100);
            snapshot.project.updated_at = Utc::now();
            Ok(snapshot.project.clone())
        })
        .await
    }

    async fn add_document(&self, document: Document) -> StoreResult<Document> {
        let project_id = document.project_id.clone();
        self.write_project(&project_id, |snapshot| {
            snapshot.documents.push(document.clone());
            Ok(document)
        })
        .await
    }

    async fn list_documents(&self, project_id: &str) -> StoreResult<Vec<Document>> {
        self.read_project(project_id, |s| s.documents.clone()).await
    }

    async fn create_agent_run(
        &self,
        project_id: &str,
        agent: AgentName,
    ) -> StoreResult<AgentRun> {
        let mut projects = self.projects.write().await;
        let snapshot = projects
            .get_mut(project_id)
            .ok_or_else(|| StoreError::project_not_found(project_id))?;
        let run = AgentRun::started(project_id, agent, self.next_sequence());
        snapshot.agent_runs.push(run.clone());
        Ok(run)
    }

    async fn find_latest_running_run(
        &self,
        project_id: &str,
        agent: AgentName,
    ) -> StoreResult<Option<AgentRun>> {
        self.read_project(project_id, |s| {
            s.agent_runs
                .iter()
                .filter(|run| run.agent_name == agent && run.status == RunStatus::Running)
                .max_by_key(|run| run.sequence)
                .cloned()
        })
        .await
    }

    async fn complete_agent_run(
        &self,
        project_id: &str,
        run_id: &str,
        output: String,
    ) -> StoreResult<AgentRun> {
        self.write_project(project_id, |snapshot| {
            let run = snapshot.agent_run_mut(run_id)?;
            run.complete(output);
            Ok(run.clone())
        })
        .await
    }

    async fn fail_agent_run(
        &self,
        project_id: &str,
        run_id: &str,
        error: String,
    ) -> StoreResult<AgentRun> {
        self.write_project(project_id, |snapshot| {
            let run = snapshot.agent_run_mut(run_id)?;
            run.fail(error);
            Ok(run.clone())
        })
        .await
    }

    async fn list_agent_runs(&self, project_id: &str) -> StoreResult<Vec<AgentRun>> {
        self.read_project(project_id, |s| {
            let mut runs = s.agent_runs.clone();
            runs.sort_by_key(|run| run.sequence);
            runs
        })
        .await
    }

    async fn latest_completed_runs(&self, project_id: &str) -> StoreResult<Vec<AgentRun>> {
        self.read_project(project_id, |s| {
            AgentName::ALL
                .iter()
                .filter_map(|agent| {
                    s.agent_runs
                        .iter()
                        .filter(|run| {
                            run.agent_name == *agent && run.status == RunStatus::Completed
                        })
                        .max_by_key(|run| run.sequence)
                        .cloned()
                })
                .collect()
        })
        .await
    }

    async fn create_concept_node(
        &self,
        node: ConceptNodeRecord,
    ) -> StoreResult<ConceptNodeRecord> {
        let project_id = node.project_id.clone();
        self.write_project(&project_id, |snapshot| {
            snapshot.concept_nodes.push(node.clone());
            Ok(node)
        })
        .await
    }

    async fn list_concept_nodes(&self, project_id: &str) -> StoreResult<Vec<ConceptNodeRecord>> {
        self.read_project(project_id, |s| s.concept_nodes.clone())
            .await
    }

    async fn create_hypothesis(
        &self,
        hypothesis: HypothesisRecord,
    ) -> StoreResult<HypothesisRecord> {
        let project_id = hypothesis.project_id.clone();
        self.write_project(&project_id, |snapshot| {
            snapshot.hypotheses.push(hypothesis.clone());
            Ok(hypothesis)
        })
        .await
    }

    async fn list_hypotheses(&self, project_id: &str) -> StoreResult<Vec<HypothesisRecord>> {
        self.read_project(project_id, |s| s.hypotheses.clone()).await
    }

    async fn create_statistic(&self, statistic: StatisticRecord) -> StoreResult<StatisticRecord> {
        let project_id = statistic.project_id.clone();
        self.write_project(&project_id, |snapshot| {
            snapshot.statistics.push(statistic.clone());
            Ok(statistic)
        })
        .await
    }

    async fn list_statistics(&self, project_id: &str) -> StoreResult<Vec<StatisticRecord>> {
        self.read_project(project_id, |s| s.statistics.clone()).await
    }

    async fn create_outline(&self, outline: OutlineRecord) -> StoreResult<OutlineRecord> {
        let project_id = outline.project_id.clone();
        self.write_project(&project_id, |snapshot| {
            snapshot.outlines.push(outline.clone());
            Ok(outline)
        })
        .await
    }

    async fn list_outlines(&self, project_id: &str) -> StoreResult<Vec<OutlineRecord>> {
        self.read_project(project_id, |s| s.outlines.clone()).await
    }

    async fn create_presentation(
        &self,
        presentation: PresentationRecord,
    ) -> StoreResult<PresentationRecord> {
        let project_id = presentation.project_id.clone();
        self.write_project(&project_id, |snapshot| {
            snapshot.presentations.push(presentation.clone());
            Ok(presentation)
        })
        .await
    }

    async fn list_presentations(
        &self,
        project_id: &str,
    ) -> StoreResult<Vec<PresentationRecord>> {
        self.read_project(project_id, |s| s.presentations.clone())
            .await
    }

    async fn clear_derived(&self, project_id: &str) -> StoreResult<()> {
        self.write_project(project_id, |snapshot| {
            snapshot.concept_nodes.clear();
            snapshot.hypotheses.clear();
            snapshot.statistics.clear();
            snapshot.outlines.clear();
            snapshot.presentations.clear();
            Ok(())
        })
        .await
    }
}
