//! 文档检索：切块、向量化与余弦相似度排序，供研究问答使用

pub mod chunker;
pub mod vector_store;

use std::sync::Arc;

use serde::Serialize;

use crate::config::RetrievalConfig;
use crate::llm::backend::{BackendError, Embedder};
use crate::types::Document;
use crate::utils::threads::do_parallel_with_limit;

pub use chunker::chunk_words;
pub use vector_store::{IndexedChunk, VectorStore, cosine_similarity};

/// 检索命中
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub chunk_id: String,
    pub document_id: String,
    pub source: String,
    pub content: String,
    pub similarity: f32,
}

/// 项目文档的检索服务
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: VectorStore,
    config: RetrievalConfig,
    max_parallels: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, config: RetrievalConfig, max_parallels: usize) -> Self {
        Self {
            embedder,
            store: VectorStore::new(),
            config,
            max_parallels,
        }
    }

    /// 重建项目索引，返回索引的块数量
    ///
    /// 先清空项目已有的块；任一块向量化失败时整体失败，项目索引保持为空。
    pub async fn index(&self, project_id: &str, documents: &[Document]) -> Result<usize, BackendError> {
        self.store.delete_project(project_id).await;

        let pending: Vec<(String, String, String, String)> = documents
            .iter()
            .flat_map(|document| {
                chunk_words(
                    &document.extracted_text,
                    self.config.chunk_size,
                    self.config.chunk_overlap,
                )
                .into_iter()
                .enumerate()
                .map(move |(i, content)| {
                    (
                        format!("{}-chunk-{}", document.id, i),
                        document.id.clone(),
                        document.display_title().to_string(),
                        content,
                    )
                })
            })
            .collect();

        tracing::info!(
            "🔍 为项目 {} 建立检索索引：{} 篇文档，{} 个文本块",
            project_id,
            documents.len(),
            pending.len()
        );

        let embedding_futures: Vec<_> = pending
            .into_iter()
            .map(|(id, document_id, source, content)| {
                let embedder = Arc::clone(&self.embedder);
                Box::pin(async move {
                    let embedding = embedder.embed(&content).await?;
                    Ok::<IndexedChunk, BackendError>(IndexedChunk {
                        id,
                        document_id,
                        source,
                        content,
                        embedding,
                    })
                })
            })
            .collect();

        let chunks = do_parallel_with_limit(embedding_futures, self.max_parallels)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        let count = chunks.len();
        self.store.replace_project(project_id, chunks).await;
        Ok(count)
    }

    /// 检索与问题最相似的块，项目没有任何块时直接返回空结果
    pub async fn search(
        &self,
        project_id: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, BackendError> {
        if self.store.chunk_count(project_id).await == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let hits = self
            .store
            .nearest(
                project_id,
                &query_embedding,
                top_k,
                self.config.min_similarity,
            )
            .await
            .into_iter()
            .map(|(chunk, similarity)| SearchHit {
                chunk_id: chunk.id,
                document_id: chunk.document_id,
                source: chunk.source,
                content: chunk.content,
                similarity,
            })
            .collect();
        Ok(hits)
    }

    /// 使用配置中的默认数量检索
    pub async fn search_default(
        &self,
        project_id: &str,
        query: &str,
    ) -> Result<Vec<SearchHit>, BackendError> {
        self.search(project_id, query, self.config.top_k).await
    }

    pub async fn chunk_count(&self, project_id: &str) -> usize {
        self.store.chunk_count(project_id).await
    }
}
