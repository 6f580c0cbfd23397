use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use super::{MemoryStore, ProjectSnapshot, Store, StoreResult};
use crate::types::{
    AgentName, AgentRun, ConceptNodeRecord, Document, HypothesisRecord, OutlineRecord,
    PresentationRecord, Project, ProjectStatus, StatisticRecord,
};

/// 以JSON文件落盘的存储，每个项目一个文件：`<data_dir>/projects/<id>.json`
///
/// 读操作直接走内存；每次写操作之后把该项目的完整快照写回磁盘。
pub struct JsonFileStore {
    projects_dir: PathBuf,
    inner: MemoryStore,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// 打开数据目录并载入全部项目快照
    pub async fn open(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let projects_dir = data_dir.as_ref().join("projects");
        fs::create_dir_all(&projects_dir).await?;

        let inner = MemoryStore::new();
        let mut loaded = 0usize;
        let mut entries = fs::read_dir(&projects_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            let content = fs::read_to_string(&path).await?;
            match serde_json::from_str::<ProjectSnapshot>(&content) {
                Ok(snapshot) => {
                    inner.restore(snapshot).await;
                    loaded += 1;
                }
                Err(e) => {
                    tracing::warn!("⚠️ 跳过无法解析的项目文件 {}: {}", path.display(), e);
                }
            }
        }

        tracing::debug!(
            "📂 已从 {} 载入 {} 个项目",
            projects_dir.display(),
            loaded
        );

        Ok(Self {
            projects_dir,
            inner,
            write_lock: Mutex::new(()),
        })
    }

    fn snapshot_path(&self, project_id: &str) -> PathBuf {
        self.projects_dir.join(format!("{}.json", project_id))
    }

    async fn persist(&self, project_id: &str) -> StoreResult<()> {
        let Some(snapshot) = self.inner.snapshot(project_id).await else {
            return Ok(());
        };

        let content = serde_json::to_string_pretty(&snapshot)?;
        let path = self.snapshot_path(project_id);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    /// 串行执行写操作并落盘，避免旧快照覆盖新快照
    ///
    /// 落盘失败时内存回到写操作之前的状态，读到的数据始终与磁盘一致。
    async fn persisting<T>(
        &self,
        project_id: &str,
        operation: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.snapshot(project_id).await;
        let result = operation.await?;

        if let Err(e) = self.persist(project_id).await {
            tracing::warn!("⚠️ 项目 {} 落盘失败，回滚内存中的修改: {}", project_id, e);
            match before {
                Some(snapshot) => self.inner.restore(snapshot).await,
                None => self.inner.discard(project_id).await,
            }
            return Err(e);
        }
        Ok(result)
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn create_project(&self, project: Project) -> StoreResult<Project> {
        let project_id = project.id.clone();
        self.persisting(&project_id, self.inner.create_project(project))
            .await
    }

    async fn get_project(&self, project_id: &str) -> StoreResult<Option<Project>> {
        self.inner.get_project(project_id).await
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        self.inner.list_projects().await
    }

    async fn update_project_status(
        &self,
        project_id: &str,
        status: ProjectStatus,
        progress: Option<u8>,
    ) -> StoreResult<Project> {
        self.persisting(
            project_id,
            self.inner.update_project_status(project_id, status, progress),
        )
        .await
    }

    async fn update_project_progress(
        &self,
        project_id: &str,
        progress: u8,
    ) -> StoreResult<Project> {
        self.persisting(
            project_id,
            self.inner.update_project_progress(project_id, progress),
        )
        .await
    }

    async fn add_document(&self, document: Document) -> StoreResult<Document> {
        let project_id = document.project_id.clone();
        self.persisting(&project_id, self.inner.add_document(document))
            .await
    }

    async fn list_documents(&self, project_id: &str) -> StoreResult<Vec<Document>> {
        self.inner.list_documents(project_id).await
    }

    async fn create_agent_run(
        &self,
        project_id: &str,
        agent: AgentName,
    ) -> StoreResult<AgentRun> {
        self.persisting(project_id, self.inner.create_agent_run(project_id, agent))
            .await
    }

    async fn find_latest_running_run(
        &self,
        project_id: &str,
        agent: AgentName,
    ) -> StoreResult<Option<AgentRun>> {
        self.inner.find_latest_running_run(project_id, agent).await
    }

    async fn complete_agent_run(
        &self,
        project_id: &str,
        run_id: &str,
        output: String,
    ) -> StoreResult<AgentRun> {
        self.persisting(
            project_id,
            self.inner.complete_agent_run(project_id, run_id, output),
        )
        .await
    }

    async fn fail_agent_run(
        &self,
        project_id: &str,
        run_id: &str,
        error: String,
    ) -> StoreResult<AgentRun> {
        self.persisting(
            project_id,
            self.inner.fail_agent_run(project_id, run_id, error),
        )
        .await
    }

    async fn list_agent_runs(&self, project_id: &str) -> StoreResult<Vec<AgentRun>> {
        self.inner.list_agent_runs(project_id).await
    }

    async fn latest_completed_runs(&self, project_id: &str) -> StoreResult<Vec<AgentRun>> {
        self.inner.latest_completed_runs(project_id).await
    }

    async fn create_concept_node(
        &self,
        node: ConceptNodeRecord,
    ) -> StoreResult<ConceptNodeRecord> {
        let project_id = node.project_id.clone();
        self.persisting(&project_id, self.inner.create_concept_node(node))
            .await
    }

    async fn list_concept_nodes(&self, project_id: &str) -> StoreResult<Vec<ConceptNodeRecord>> {
        self.inner.list_concept_nodes(project_id).await
    }

    async fn create_hypothesis(
        &self,
        hypothesis: HypothesisRecord,
    ) -> StoreResult<HypothesisRecord> {
        let project_id = hypothesis.project_id.clone();
        self.persisting(&project_id, self.inner.create_hypothesis(hypothesis))
            .await
    }

    async fn list_hypotheses(&self, project_id: &str) -> StoreResult<Vec<HypothesisRecord>> {
        self.inner.list_hypotheses(project_id).await
    }

    async fn create_statistic(&self, statistic: StatisticRecord) -> StoreResult<StatisticRecord> {
        let project_id = statistic.project_id.clone();
        self.persisting(&project_id, self.inner.create_statistic(statistic))
            .await
    }

    async fn list_statistics(&self, project_id: &str) -> StoreResult<Vec<StatisticRecord>> {
        self.inner.list_statistics(project_id).await
    }

    async fn create_outline(&self, outline: OutlineRecord) -> StoreResult<OutlineRecord> {
        let project_id = outline.project_id.clone();
        self.persisting(&project_id, self.inner.create_outline(outline))
            .await
    }

    async fn list_outlines(&self, project_id: &str) -> StoreResult<Vec<OutlineRecord>> {
        self.inner.list_outlines(project_id).await
    }

    async fn create_presentation(
        &self,
        presentation: PresentationRecord,
    ) -> StoreResult<PresentationRecord> {
        let project_id = presentation.project_id.clone();
        self.persisting(&project_id, self.inner.create_presentation(presentation))
            .await
    }

    async fn list_presentations(
        &self,
        project_id: &str,
    ) -> StoreResult<Vec<PresentationRecord>> {
        self.inner.list_presentations(project_id).await
    }

    async fn clear_derived(&self, project_id: &str) -> StoreResult<()> {
        self.persisting(project_id, self.inner.clear_derived(project_id))
            .await
    }
}
