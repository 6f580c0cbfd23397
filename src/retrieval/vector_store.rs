use std::collections::HashMap;

use tokio::sync::RwLock;

/// 已向量化的文本块
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedChunk {
    /// `{document_id}-chunk-{i}`
    pub id: String,
    pub document_id: String,
    /// 来源文档的展示标题
    pub source: String,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// 按项目隔离的内存向量库
#[derive(Debug, Default)]
pub struct VectorStore {
    chunks: RwLock<HashMap<String, Vec<IndexedChunk>>>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用新的块集合替换项目原有的全部块
    pub async fn replace_project(&self, project_id: &str, chunks: Vec<IndexedChunk>) {
        self.chunks
            .write()
            .await
            .insert(project_id.to_string(), chunks);
    }

    pub async fn delete_project(&self, project_id: &str) {
        self.chunks.write().await.remove(project_id);
    }

    pub async fn chunk_count(&self, project_id: &str) -> usize {
        self.chunks
            .read()
            .await
            .get(project_id)
            .map(|chunks| chunks.len())
            .unwrap_or(0)
    }

    /// 与查询向量的相似度不低于 `min_similarity` 的块，按相似度降序取前 `top_k` 个
    pub async fn nearest(
        &self,
        project_id: &str,
        query: &[f32],
        top_k: usize,
        min_similarity: f32,
    ) -> Vec<(IndexedChunk, f32)> {
        let guard = self.chunks.read().await;
        let Some(chunks) = guard.get(project_id) else {
            return Vec::new();
        };

        let mut scored: Vec<(IndexedChunk, f32)> = chunks
            .iter()
            .map(|chunk| (chunk, cosine_similarity(query, &chunk.embedding)))
            .filter(|(_, similarity)| *similarity >= min_similarity)
            .map(|(chunk, similarity)| (chunk.clone(), similarity))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);
        scored
    }
}

/// 余弦相似度，维度不一致或存在零向量时为0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut mag_a = 0.0f32;
    let mut mag_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }

    let denom = mag_a.sqrt() * mag_b.sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}
