//! 将项目最近一次完成的阶段产物写入输出目录

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::pipeline::agents::ResearchPaper;
use crate::store::Store;
use crate::types::{AgentName, AgentRun};

pub trait Outlet {
    /// 保存产物，返回写入的文件路径
    async fn save(&self, store: &dyn Store, project_id: &str) -> Result<Vec<PathBuf>>;
}

/// 产物写入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    /// 论文全文（markdown）
    PaperMarkdown,
    /// 阶段输出原样格式化为JSON
    PrettyJson,
}

/// 阶段 → 输出文件的映射
pub struct ArtifactTree {
    structure: Vec<(AgentName, String, ArtifactFormat)>,
}

impl ArtifactTree {
    pub fn new() -> Self {
        Self {
            structure: vec![
                (AgentName::Writer, "paper.md".to_string(), ArtifactFormat::PaperMarkdown),
                (AgentName::Outliner, "outline.json".to_string(), ArtifactFormat::PrettyJson),
                (AgentName::Graph, "concept_graph.json".to_string(), ArtifactFormat::PrettyJson),
                (AgentName::Reviewer, "review.json".to_string(), ArtifactFormat::PrettyJson),
                (
                    AgentName::Presenter,
                    "presentation.json".to_string(),
                    ArtifactFormat::PrettyJson,
                ),
            ],
        }
    }

    pub fn insert(&mut self, agent: AgentName, relative_path: &str, format: ArtifactFormat) {
        self.structure.retain(|(existing, _, _)| *existing != agent);
        self.structure
            .push((agent, relative_path.to_string(), format));
    }
}

impl Default for ArtifactTree {
    fn default() -> Self {
        Self::new()
    }
}

pub struct DiskOutlet {
    output_dir: PathBuf,
    tree: ArtifactTree,
}

impl DiskOutlet {
    pub fn new(output_dir: impl Into<PathBuf>, tree: ArtifactTree) -> Self {
        Self {
            output_dir: output_dir.into(),
            tree,
        }
    }
}

fn render(run: &AgentRun, format: ArtifactFormat) -> Result<Option<String>> {
    let Some(output) = run.output.as_deref() else {
        return Ok(None);
    };
    let rendered = match format {
        ArtifactFormat::PaperMarkdown => {
            let paper: ResearchPaper =
                serde_json::from_str(output).context("无法解析论文输出")?;
            paper.full_text
        }
        ArtifactFormat::PrettyJson => {
            let value: serde_json::Value =
                serde_json::from_str(output).context("无法解析阶段输出")?;
            serde_json::to_string_pretty(&value)?
        }
    };
    Ok(Some(rendered))
}

impl Outlet for DiskOutlet {
    async fn save(&self, store: &dyn Store, project_id: &str) -> Result<Vec<PathBuf>> {
        tracing::info!("🖊️ 产物存储中...");
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("无法创建输出目录: {}", self.output_dir.display()))?;

        let latest = store.latest_completed_runs(project_id).await?;
        let mut written = Vec::new();

        for (agent, relative_path, format) in &self.tree.structure {
            let Some(run) = latest.iter().find(|run| run.agent_name == *agent) else {
                tracing::warn!("⚠️ 未找到 {} 阶段的完成记录，跳过 {}", agent, relative_path);
                continue;
            };
            let Some(content) = render(run, *format)? else {
                continue;
            };

            let output_file_path = self.output_dir.join(relative_path);
            if let Some(parent_dir) = output_file_path.parent() {
                tokio::fs::create_dir_all(parent_dir).await?;
            }
            tokio::fs::write(&output_file_path, content).await?;
            tracing::info!("💾 已保存: {}", output_file_path.display());
            written.push(output_file_path);
        }

        tracing::info!("💾 产物保存完成，输出目录: {}", self.output_dir.display());
        Ok(written)
    }
}
