//! 子命令的执行逻辑

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::chat::ResearchChat;
use crate::cli::{AskArgs, RunArgs};
use crate::config::Config;
use crate::ingest::ingest_directory;
use crate::llm::client::LLMClient;
use crate::outlet::{ArtifactTree, DiskOutlet, Outlet};
use crate::pipeline::{PipelineContext, run_pipeline};
use crate::retrieval::Retriever;
use crate::store::Store;
use crate::types::Project;

/// 导入文档、运行流水线并输出产物
pub async fn run(config: Config, args: &RunArgs, store: Arc<dyn Store>) -> Result<()> {
    let project = match &args.project_id {
        Some(project_id) => store
            .get_project(project_id)
            .await?
            .with_context(|| format!("项目不存在: {}", project_id))?,
        None => {
            let title = args
                .title
                .clone()
                .unwrap_or_else(|| default_title(&config.documents_path));
            let project = store.create_project(Project::new(title, "")).await?;
            println!("🆕 已创建项目: {} ({})", project.title, project.id);
            project
        }
    };

    ingest_directory(
        store.as_ref(),
        &project.id,
        &config.documents_path,
        &config.document_patterns,
    )
    .await?;

    let llm_client = Arc::new(LLMClient::new(config.llm.clone())?);
    llm_client.check_connection().await?;

    let output_path = config.output_path.clone();
    let ctx = PipelineContext::new(config, llm_client, Arc::clone(&store));
    let outcome = run_pipeline(&ctx, &project.id).await?;

    let outlet = DiskOutlet::new(output_path, ArtifactTree::default());
    let written = outlet.save(store.as_ref(), &project.id).await?;

    println!("\n🎉 流水线执行完成");
    println!("   项目: {}", outcome.project_id);
    println!("   论文: {}", outcome.paper.title);
    println!("   评审得分: {}", outcome.review.overall_score);
    println!("   幻灯片: {} 页", outcome.presentation.slides.len());
    for path in written {
        println!("   💾 {}", path.display());
    }
    Ok(())
}

/// 打印项目状态与各阶段运行记录
pub async fn status(project_id: &str, store: Arc<dyn Store>) -> Result<()> {
    let project = store
        .get_project(project_id)
        .await?
        .with_context(|| format!("项目不存在: {}", project_id))?;

    println!("📁 {} ({})", project.title, project.id);
    println!("   状态: {}  进度: {}%", project.status, project.progress);

    let runs = store.list_agent_runs(project_id).await?;
    if runs.is_empty() {
        println!("   尚无运行记录");
        return Ok(());
    }

    println!("\n{:<12} {:<10} {:>10}  错误", "阶段", "状态", "耗时(ms)");
    for run in runs {
        let duration = run
            .duration_ms()
            .map(|ms| ms.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<12} {:<10} {:>10}  {}",
            run.agent_name.as_str(),
            run.status.to_string(),
            duration,
            run.error.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

/// 对项目文档进行检索问答
pub async fn ask(config: Config, args: &AskArgs, store: Arc<dyn Store>) -> Result<()> {
    let documents = store.list_documents(&args.project_id).await?;
    let llm_client = Arc::new(LLMClient::new(config.llm.clone())?);

    let retriever = Arc::new(Retriever::new(
        llm_client.clone(),
        config.retrieval.clone(),
        config.llm.max_parallels,
    ));
    if config.llm.provider.supports_embeddings() {
        if let Err(e) = retriever.index(&args.project_id, &documents).await {
            tracing::warn!("⚠️ 建立检索索引失败，将使用阶段输出作为上下文: {}", e);
        }
    } else {
        tracing::info!(
            "provider {} 不支持向量嵌入，使用阶段输出作为上下文",
            config.llm.provider
        );
    }

    let chat = ResearchChat::new(llm_client, retriever, store);
    let answer = chat.ask(&args.project_id, &args.question, &[]).await?;

    println!("{}", answer.answer);
    if !answer.sources.is_empty() {
        println!("\n📚 来源:");
        for (i, source) in answer.sources.iter().enumerate() {
            println!(
                "   [Source {}] {} (相似度 {:.2})",
                i + 1,
                source.source,
                source.similarity
            );
        }
    }
    Ok(())
}

fn default_title(documents_path: &Path) -> String {
    documents_path
        .canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(documents_path)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "Research Project".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_title_from_directory_name() {
        assert_eq!(default_title(Path::new("/does/not/exist/sleep-papers")), "sleep-papers");
        assert_eq!(default_title(Path::new("/")), "Research Project");
    }
}
