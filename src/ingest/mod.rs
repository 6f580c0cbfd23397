//! 文档导入：从目录中收集文本文档并写入项目

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::Pattern;
use walkdir::WalkDir;

use crate::store::Store;
use crate::types::Document;

/// 目录遍历深度上限
const MAX_DEPTH: usize = 5;

/// 递归收集文件名匹配任一模式的文件，按路径排序；隐藏文件与隐藏目录被忽略
pub fn collect_document_paths(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        anyhow::bail!("文档目录不存在: {}", root.display());
    }

    let patterns = patterns
        .iter()
        .map(|p| Pattern::new(p).with_context(|| format!("无效的文档匹配模式: {}", p)))
        .collect::<Result<Vec<_>>>()?;

    let mut paths = Vec::new();
    let walker = WalkDir::new(root)
        .max_depth(MAX_DEPTH)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.path()));
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        if patterns.iter().any(|pattern| pattern.matches(&file_name)) {
            paths.push(entry.path().to_path_buf());
        }
    }

    paths.sort();
    Ok(paths)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// 导入目录下的文档，内容与项目中已有文档相同（按MD5判断）的文件被跳过
pub async fn ingest_directory(
    store: &dyn Store,
    project_id: &str,
    root: &Path,
    patterns: &[String],
) -> Result<Vec<Document>> {
    let paths = collect_document_paths(root, patterns)?;
    let mut known_hashes: Vec<String> = store
        .list_documents(project_id)
        .await?
        .into_iter()
        .map(|document| document.content_hash)
        .collect();

    let mut added = Vec::new();
    for path in paths {
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("无法读取文档: {}", path.display()))?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let file_name = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .to_string();

        let document = Document::new(project_id, file_name, text);
        if known_hashes.contains(&document.content_hash) {
            tracing::debug!("跳过重复文档: {}", document.file_name);
            continue;
        }
        known_hashes.push(document.content_hash.clone());
        added.push(store.add_document(document).await?);
    }

    tracing::info!("📄 导入 {} 篇文档", added.len());
    Ok(added)
}
