#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::config::Config;
    use crate::llm::backend::{BackendError, GenerativeBackend};
    use crate::llm::scripted::ScriptedBackend;
    use crate::pipeline::{
        PipelineContext, PipelineError, PipelinePolicy, StageFailurePolicy, run_pipeline,
        spawn_pipeline,
    };
    use crate::store::{MemoryStore, Store, StoreError, StoreResult};
    use crate::types::{
        AgentName, AgentRun, ConceptNodeRecord, Document, HypothesisRecord, OutlineRecord,
        PresentationRecord, Project, ProjectStatus, RunStatus, StatisticRecord,
    };

    const READER_REPLY: &str = r#"{"sections": {"abstract": "Sleep improves recall.", "results": "Recall improved by 23% after sleep."}, "metadata": {"title": "Sleep", "authors": ["A. Author"], "year": "2023", "keywords": ["sleep"]}, "citations": ["Walker 2009"]}"#;
    const SUMMARY_REPLY: &str = r#"{"overall": "Sleep consolidates memory.", "keyFindings": ["Recall +23%"], "contributions": ["Controlled study"], "limitations": ["Small sample"]}"#;
    const GRAPH_REPLY: &str = r#"{"nodes": [{"id": 1, "label": "Sleep", "importance": 90, "cluster": 0}, {"id": 2, "label": "Memory", "importance": "80", "cluster": 1}], "edges": [{"source": 1, "target": 2, "relationship": "consolidates"}]}"#;
    const HYPOTHESIS_REPLY: &str = r#"[{"id": "1", "title": "Sleep boosts recall", "description": "Slow-wave sleep predicts recall", "testability": 85, "novelty": 70, "feasibility": 80, "category": "Neuroscience"}]"#;
    const OUTLINE_REPLY: &str = r#"{"title": "Sleep and Memory", "abstract": "Consolidation", "sections": [{"title": "Results", "description": "Findings", "subsections": [], "order": 2}, {"title": "Introduction", "description": "Background", "subsections": ["Background"], "order": 1}]}"#;
    const STATISTICS_REPLY: &str = r#"{"statistics": [{"category": "Performance", "label": "Recall gain", "value": "23%", "unit": "%", "context": "Recall improved by 23%"}, {"category": "Other", "label": "Unclear", "value": "n/a", "context": "?"}]}"#;
    const EXPERIMENT_REPLY: &str = r#"[{"hypothesis": "Sleep boosts recall", "methodology": "Randomized crossover", "resources": ["EEG"], "timeline": "6 months", "expectedOutcomes": ["Higher recall"]}]"#;
    const REVIEW_REPLY: &str = r#"{"overallScore": 81, "summary": "Good", "sectionReviews": [], "criticalIssues": [], "recommendations": ["More data"]}"#;
    const PRESENTER_REPLY: &str = r#"{"title": "Sleep Talk", "slides": [{"title": "Intro", "bullets": ["Sleep"], "notes": "Hi"}]}"#;

    /// 在 `base` 的规则之后追加每个阶段的正常响应
    fn research_backend(base: ScriptedBackend) -> ScriptedBackend {
        base.respond("Stage: reader", READER_REPLY)
            .respond("Stage: summarizer", SUMMARY_REPLY)
            .respond("Stage: graph", GRAPH_REPLY)
            .respond("Stage: hypothesis", HYPOTHESIS_REPLY)
            .respond("Stage: outliner", OUTLINE_REPLY)
            .respond("Stage: statistics", STATISTICS_REPLY)
            .respond("Stage: experiment", EXPERIMENT_REPLY)
            .respond("Stage: writer/abstract", "We study sleep.")
            .respond("Stage: writer/references", r#"["Walker, M. (2009). Sleep. Nature."]"#)
            .respond("Stage: writer/section", "Section body.")
            .respond("Stage: reviewer", REVIEW_REPLY)
            .respond("Stage: presenter", PRESENTER_REPLY)
    }

    async fn project_with_documents(store: &dyn Store, texts: &[&str]) -> Project {
        let project = store
            .create_project(Project::new("Sleep research", ""))
            .await
            .unwrap();
        for (i, text) in texts.iter().enumerate() {
            store
                .add_document(Document::new(&project.id, format!("doc{}.txt", i), *text))
                .await
                .unwrap();
        }
        project
    }

    fn context(
        backend: Arc<dyn GenerativeBackend>,
        store: Arc<MemoryStore>,
        config: Config,
    ) -> PipelineContext {
        PipelineContext::new(config, backend, store)
    }

    #[tokio::test]
    async fn test_successful_run_completes_every_stage() {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(research_backend(ScriptedBackend::new()));
        let ctx = context(backend.clone(), store.clone(), Config::default());
        let project =
            project_with_documents(store.as_ref(), &["Sleep paper one.", "Sleep paper two."])
                .await;

        let outcome = run_pipeline(&ctx, &project.id).await.unwrap();

        let project = store.get_project(&project.id).await.unwrap().unwrap();
        assert_eq!(project.status, ProjectStatus::Completed);
        assert_eq!(project.progress, 100);

        let runs = store.list_agent_runs(&project.id).await.unwrap();
        let agents: Vec<AgentName> = runs.iter().map(|r| r.agent_name).collect();
        assert_eq!(agents, AgentName::ALL.to_vec());
        assert!(runs.iter().all(|r| r.status == RunStatus::Completed));
        assert!(runs.iter().all(|r| r.output.is_some() && r.error.is_none()));

        // 每篇文档各调用一次reader和summarizer
        assert_eq!(backend.count_prompts_containing("Stage: reader"), 2);
        assert_eq!(backend.count_prompts_containing("Stage: summarizer"), 2);

        assert_eq!(store.list_concept_nodes(&project.id).await.unwrap().len(), 2);
        assert_eq!(store.list_hypotheses(&project.id).await.unwrap().len(), 1);
        // 无法解析为数字的统计值不落库
        let statistics = store.list_statistics(&project.id).await.unwrap();
        assert_eq!(statistics.len(), 1);
        assert_eq!(statistics[0].value, 23.0);
        let outlines = store.list_outlines(&project.id).await.unwrap();
        assert_eq!(outlines.len(), 1);
        assert!(outlines[0].sections.contains("Introduction"));
        assert_eq!(store.list_presentations(&project.id).await.unwrap().len(), 1);

        assert_eq!(outcome.paper.title, "Sleep and Memory");
        assert_eq!(outcome.paper.introduction, "Section body.");
        assert!(outcome.paper.full_text.find("## Introduction") < outcome.paper.full_text.find("## Results"));
        assert_eq!(outcome.review.overall_score, 81);
        assert_eq!(outcome.presentation.title, "Sleep Talk");
    }

    /// 每次生成调用时读取项目进度
    struct ProgressObserver {
        inner: ScriptedBackend,
        store: Arc<MemoryStore>,
        project_id: Mutex<String>,
        observed: Mutex<Vec<(u8, ProjectStatus)>>,
    }

    #[async_trait]
    impl GenerativeBackend for ProgressObserver {
        async fn generate_text(&self, prompt: &str) -> Result<String, BackendError> {
            let project_id = self.project_id.lock().unwrap().clone();
            if let Ok(Some(project)) = self.store.get_project(&project_id).await {
                self.observed
                    .lock()
                    .unwrap()
                    .push((project.progress, project.status));
            }
            self.inner.generate_text(prompt).await
        }
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_100_only_when_completed() {
        let store = Arc::new(MemoryStore::new());
        let observer = Arc::new(ProgressObserver {
            inner: research_backend(ScriptedBackend::new()),
            store: store.clone(),
            project_id: Mutex::new(String::new()),
            observed: Mutex::new(Vec::new()),
        });
        let ctx = context(observer.clone(), store.clone(), Config::default());
        let project = project_with_documents(store.as_ref(), &["Sleep paper."]).await;
        *observer.project_id.lock().unwrap() = project.id.clone();

        run_pipeline(&ctx, &project.id).await.unwrap();

        let observed = observer.observed.lock().unwrap().clone();
        assert!(!observed.is_empty());
        assert_eq!(observed[0].0, 10);
        assert!(observed.windows(2).all(|pair| pair[0].0 <= pair[1].0));
        assert!(
            observed
                .iter()
                .all(|(progress, status)| *progress < 100 && *status == ProjectStatus::Processing)
        );
        // presenter 调用时进度为98
        assert_eq!(observed.last().map(|o| o.0), Some(98));
    }

    #[tokio::test]
    async fn test_rerun_accumulates_runs_and_artifacts() {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(research_backend(ScriptedBackend::new()));
        let ctx = context(backend, store.clone(), Config::default());
        let project = project_with_documents(store.as_ref(), &["Sleep paper."]).await;

        run_pipeline(&ctx, &project.id).await.unwrap();
        let first_runs = store.list_agent_runs(&project.id).await.unwrap();
        run_pipeline(&ctx, &project.id).await.unwrap();
        let all_runs = store.list_agent_runs(&project.id).await.unwrap();

        assert_eq!(all_runs.len(), 20);
        // 第一次运行的completed记录原样保留
        for run in &first_runs {
            assert!(all_runs.contains(run));
        }
        assert_eq!(store.list_concept_nodes(&project.id).await.unwrap().len(), 4);
        assert_eq!(store.list_hypotheses(&project.id).await.unwrap().len(), 2);

        let latest = store.latest_completed_runs(&project.id).await.unwrap();
        assert_eq!(latest.len(), 10);
        assert!(latest.iter().all(|run| !first_runs.contains(run)));
    }

    #[tokio::test]
    async fn test_clear_derived_on_rerun_keeps_only_latest_artifacts() {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(research_backend(ScriptedBackend::new()));
        let mut config = Config::default();
        config.pipeline.clear_derived_on_rerun = true;
        let ctx = context(backend, store.clone(), config);
        let project = project_with_documents(store.as_ref(), &["Sleep paper."]).await;

        run_pipeline(&ctx, &project.id).await.unwrap();
        run_pipeline(&ctx, &project.id).await.unwrap();

        assert_eq!(store.list_concept_nodes(&project.id).await.unwrap().len(), 2);
        assert_eq!(store.list_outlines(&project.id).await.unwrap().len(), 1);
        // 运行记录从不删除
        assert_eq!(store.list_agent_runs(&project.id).await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_hypothesis_abort_keeps_earlier_artifacts() {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(research_backend(ScriptedBackend::new().fail(
            "Stage: hypothesis",
            BackendError::Backend("safety block".to_string()),
        )));
        let ctx = context(backend.clone(), store.clone(), Config::default())
            .with_policy(PipelinePolicy::default().with(AgentName::Hypothesis, StageFailurePolicy::Abort));
        let project = project_with_documents(store.as_ref(), &["Sleep paper."]).await;

        let err = run_pipeline(&ctx, &project.id).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StageFailed {
                agent: AgentName::Hypothesis,
                ..
            }
        ));

        let project = store.get_project(&project.id).await.unwrap().unwrap();
        assert_eq!(project.status, ProjectStatus::Error);
        assert_eq!(project.progress, 70);

        // 已完成阶段的产物不回滚
        assert_eq!(store.list_concept_nodes(&project.id).await.unwrap().len(), 2);
        assert!(store.list_hypotheses(&project.id).await.unwrap().is_empty());

        let runs = store.list_agent_runs(&project.id).await.unwrap();
        let statuses: Vec<(AgentName, RunStatus)> =
            runs.iter().map(|r| (r.agent_name, r.status)).collect();
        assert_eq!(
            statuses,
            vec![
                (AgentName::Reader, RunStatus::Completed),
                (AgentName::Summarizer, RunStatus::Completed),
                (AgentName::Graph, RunStatus::Completed),
                (AgentName::Hypothesis, RunStatus::Error),
            ]
        );
        assert!(runs[3].output.is_none());
        assert!(runs[3].error.as_deref().unwrap().contains("safety block"));
        assert_eq!(backend.count_prompts_containing("Stage: outliner"), 0);
    }

    #[tokio::test]
    async fn test_hypothesis_failure_degrades_by_default() {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(research_backend(
            ScriptedBackend::new().fail("Stage: hypothesis", BackendError::EmptyResponse),
        ));
        let ctx = context(backend, store.clone(), Config::default());
        let project = project_with_documents(store.as_ref(), &["Sleep paper."]).await;

        run_pipeline(&ctx, &project.id).await.unwrap();

        let hypotheses = store.list_hypotheses(&project.id).await.unwrap();
        assert_eq!(hypotheses.len(), 1);
        assert_eq!(hypotheses[0].title, "Generated Hypothesis");
        assert_eq!(
            store.get_project(&project.id).await.unwrap().unwrap().status,
            ProjectStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_every_stage_failing_still_completes_with_fallbacks() {
        let store = Arc::new(MemoryStore::new());
        let backend: Arc<dyn GenerativeBackend> = Arc::new(ScriptedBackend::new());
        let ctx = context(backend, store.clone(), Config::default());
        let project = project_with_documents(store.as_ref(), &["Sleep paper."]).await;

        let outcome = run_pipeline(&ctx, &project.id).await.unwrap();

        assert_eq!(outcome.outline.sections.len(), 6);
        assert!(outcome.paper.full_text.contains("## Conclusion"));
        assert_eq!(outcome.review.overall_score, 70);
        assert_eq!(outcome.presentation.slides.len(), 4);
        let runs = store.list_agent_runs(&project.id).await.unwrap();
        assert!(runs.iter().all(|r| r.status == RunStatus::Completed));
    }

    #[tokio::test]
    async fn test_empty_document_reaches_completed() {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(research_backend(
            ScriptedBackend::new().fail("Stage: reader", BackendError::EmptyResponse),
        ));
        let ctx = context(backend.clone(), store.clone(), Config::default())
            .with_policy(PipelinePolicy::default().with(AgentName::Reader, StageFailurePolicy::Abort));
        let project = project_with_documents(store.as_ref(), &[""]).await;

        run_pipeline(&ctx, &project.id).await.unwrap();

        assert_eq!(backend.count_prompts_containing("Stage: reader"), 0);
        let project = store.get_project(&project.id).await.unwrap().unwrap();
        assert_eq!(project.status, ProjectStatus::Completed);

        let reader_run = store
            .list_agent_runs(&project.id)
            .await
            .unwrap()
            .into_iter()
            .find(|r| r.agent_name == AgentName::Reader)
            .unwrap();
        let output: serde_json::Value =
            serde_json::from_str(reader_run.output.as_deref().unwrap()).unwrap();
        assert!(output[0]["sections"].is_object());
        assert!(output[0]["metadata"].is_object());
    }

    #[tokio::test]
    async fn test_zero_section_outline_still_produces_paper() {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(research_backend(ScriptedBackend::new().respond(
            "Stage: outliner",
            r#"{"title": "Empty Outline", "abstract": "Nothing", "sections": []}"#,
        )));
        let ctx = context(backend, store.clone(), Config::default());
        let project = project_with_documents(store.as_ref(), &["Sleep paper."]).await;

        let outcome = run_pipeline(&ctx, &project.id).await.unwrap();

        assert!(
            outcome
                .paper
                .full_text
                .starts_with("# Empty Outline\n\n## Abstract\n\n")
        );
        assert!(outcome.paper.introduction.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_run_is_rejected_without_writes() {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(research_backend(ScriptedBackend::new()));
        let ctx = context(backend, store.clone(), Config::default());
        let project = project_with_documents(store.as_ref(), &["Sleep paper."]).await;

        let _token = ctx.run_guard.try_acquire(&project.id).unwrap();
        let err = run_pipeline(&ctx, &project.id).await.unwrap_err();

        assert!(matches!(err, PipelineError::AlreadyRunning(_)));
        let unchanged = store.get_project(&project.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, ProjectStatus::Idle);
        assert!(store.list_agent_runs(&project.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_project_without_documents_errors() {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(research_backend(ScriptedBackend::new()));
        let ctx = context(backend, store.clone(), Config::default());
        let project = project_with_documents(store.as_ref(), &[]).await;

        let err = run_pipeline(&ctx, &project.id).await.unwrap_err();

        assert!(matches!(err, PipelineError::NoDocuments(_)));
        assert_eq!(
            store.get_project(&project.id).await.unwrap().unwrap().status,
            ProjectStatus::Error
        );
        // 运行结束后互斥令牌已释放
        assert!(!ctx.run_guard.is_running(&project.id));
    }

    #[tokio::test]
    async fn test_missing_project() {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(ScriptedBackend::new());
        let ctx = context(backend, store.clone(), Config::default());

        let err = run_pipeline(&ctx, "missing").await.unwrap_err();

        assert!(matches!(err, PipelineError::ProjectNotFound(id) if id == "missing"));
        assert!(store.list_projects().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_spawned_pipeline_result_is_observable() {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(research_backend(ScriptedBackend::new()));
        let ctx = context(backend, store.clone(), Config::default());
        let project = project_with_documents(store.as_ref(), &["Sleep paper."]).await;

        let handle = spawn_pipeline(ctx.clone(), project.id.clone());
        let outcome = handle.await.unwrap().unwrap();

        assert_eq!(outcome.project_id, project.id);
        assert!(!ctx.run_guard.is_running(&project.id));
    }

    /// 在指定阶段创建运行记录时报错，其余操作转发给内存存储
    struct FailingRunStore {
        inner: Arc<MemoryStore>,
        failing_agent: AgentName,
    }

    #[async_trait]
    impl Store for FailingRunStore {
        async fn create_project(&self, project: Project) -> StoreResult<Project> {
            self.inner.create_project(project).await
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
            self.inner
                .update_project_status(project_id, status, progress)
                .await
        }
        async fn update_project_progress(
            &self,
            project_id: &str,
            progress: u8,
        ) -> StoreResult<Project> {
            self.inner.update_project_progress(project_id, progress).await
        }
        async fn add_document(&self, document: Document) -> StoreResult<Document> {
            self.inner.add_document(document).await
        }
        async fn list_documents(&self, project_id: &str) -> StoreResult<Vec<Document>> {
            self.inner.list_documents(project_id).await
        }
        async fn create_agent_run(
            &self,
            project_id: &str,
            agent: AgentName,
        ) -> StoreResult<AgentRun> {
            if agent == self.failing_agent {
                return Err(StoreError::Io(std::io::Error::other("disk full")));
            }
            self.inner.create_agent_run(project_id, agent).await
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
            self.inner.complete_agent_run(project_id, run_id, output).await
        }
        async fn fail_agent_run(
            &self,
            project_id: &str,
            run_id: &str,
            error: String,
        ) -> StoreResult<AgentRun> {
            self.inner.fail_agent_run(project_id, run_id, error).await
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
            self.inner.create_concept_node(node).await
        }
        async fn list_concept_nodes(
            &self,
            project_id: &str,
        ) -> StoreResult<Vec<ConceptNodeRecord>> {
            self.inner.list_concept_nodes(project_id).await
        }
        async fn create_hypothesis(
            &self,
            hypothesis: HypothesisRecord,
        ) -> StoreResult<HypothesisRecord> {
            self.inner.create_hypothesis(hypothesis).await
        }
        async fn list_hypotheses(&self, project_id: &str) -> StoreResult<Vec<HypothesisRecord>> {
            self.inner.list_hypotheses(project_id).await
        }
        async fn create_statistic(
            &self,
            statistic: StatisticRecord,
        ) -> StoreResult<StatisticRecord> {
            self.inner.create_statistic(statistic).await
        }
        async fn list_statistics(&self, project_id: &str) -> StoreResult<Vec<StatisticRecord>> {
            self.inner.list_statistics(project_id).await
        }
        async fn create_outline(&self, outline: OutlineRecord) -> StoreResult<OutlineRecord> {
            self.inner.create_outline(outline).await
        }
        async fn list_outlines(&self, project_id: &str) -> StoreResult<Vec<OutlineRecord>> {
            self.inner.list_outlines(project_id).await
        }
        async fn create_presentation(
            &self,
            presentation: PresentationRecord,
        ) -> StoreResult<PresentationRecord> {
            self.inner.create_presentation(presentation).await
        }
        async fn list_presentations(
            &self,
            project_id: &str,
        ) -> StoreResult<Vec<PresentationRecord>> {
            self.inner.list_presentations(project_id).await
        }
        async fn clear_derived(&self, project_id: &str) -> StoreResult<()> {
            self.inner.clear_derived(project_id).await
        }
    }

    #[tokio::test]
    async fn test_store_failure_aborts_run_and_keeps_earlier_artifacts() {
        let memory = Arc::new(MemoryStore::new());
        let store = Arc::new(FailingRunStore {
            inner: memory.clone(),
            failing_agent: AgentName::Outliner,
        });
        let backend = Arc::new(research_backend(ScriptedBackend::new()));
        let ctx = PipelineContext::new(Config::default(), backend.clone(), store);
        let project = project_with_documents(memory.as_ref(), &["Sleep paper."]).await;

        let err = run_pipeline(&ctx, &project.id).await.unwrap_err();
        assert!(matches!(err, PipelineError::Store(StoreError::Io(_))));

        // 失败阶段及之后的阶段都不会调用模型
        for stage in ["outliner", "statistics", "experiment", "writer", "reviewer", "presenter"] {
            assert_eq!(
                backend.count_prompts_containing(&format!("Stage: {}", stage)),
                0,
                "{} should not run",
                stage
            );
        }

        let project = memory.get_project(&project.id).await.unwrap().unwrap();
        assert_eq!(project.status, ProjectStatus::Error);
        assert_eq!(project.progress, 82);

        let runs = memory.list_agent_runs(&project.id).await.unwrap();
        let agents: Vec<AgentName> = runs.iter().map(|r| r.agent_name).collect();
        assert_eq!(
            agents,
            vec![
                AgentName::Reader,
                AgentName::Summarizer,
                AgentName::Graph,
                AgentName::Hypothesis,
            ]
        );
        assert!(runs.iter().all(|r| r.status == RunStatus::Completed));
        assert_eq!(memory.list_concept_nodes(&project.id).await.unwrap().len(), 2);
        assert_eq!(memory.list_hypotheses(&project.id).await.unwrap().len(), 1);
        assert!(memory.list_outlines(&project.id).await.unwrap().is_empty());
        assert!(!ctx.run_guard.is_running(&project.id));
    }
}
