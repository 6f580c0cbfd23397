//! 流水线派生出的持久化产物。派生记录只追加，重复运行会累积。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 概念图节点
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConceptNodeRecord {
    pub id: String,
    pub project_id: String,
    pub label: String,
    /// 重要性（0-100）
    pub importance: u32,
    pub cluster: u32,
    pub created_at: DateTime<Utc>,
}

impl ConceptNodeRecord {
    pub fn new(project_id: &str, label: &str, importance: u32, cluster: u32) -> Self {
        Self {
            id: new_id(),
            project_id: project_id.to_string(),
            label: label.to_string(),
            importance,
            cluster,
            created_at: Utc::now(),
        }
    }
}

/// 研究假设
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HypothesisRecord {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: String,
    pub testability: u32,
    pub novelty: u32,
    pub feasibility: u32,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

impl HypothesisRecord {
    pub fn new(
        project_id: &str,
        title: &str,
        description: &str,
        scores: (u32, u32, u32),
        category: &str,
    ) -> Self {
        let (testability, novelty, feasibility) = scores;
        Self {
            id: new_id(),
            project_id: project_id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            testability,
            novelty,
            feasibility,
            category: category.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// 从文档中抽取的统计数据点
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatisticRecord {
    pub id: String,
    pub project_id: String,
    pub category: String,
    pub label: String,
    pub value: f64,
    pub unit: Option<String>,
    /// 数据出处的原文片段
    pub context: String,
    pub created_at: DateTime<Utc>,
}

impl StatisticRecord {
    pub fn new(
        project_id: &str,
        category: &str,
        label: &str,
        value: f64,
        unit: Option<String>,
        context: &str,
    ) -> Self {
        Self {
            id: new_id(),
            project_id: project_id.to_string(),
            category: category.to_string(),
            label: label.to_string(),
            value,
            unit,
            context: context.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// 论文大纲，`sections` 为章节列表的JSON
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutlineRecord {
    pub id: String,
    pub project_id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub sections: String,
    pub created_at: DateTime<Utc>,
}

impl OutlineRecord {
    pub fn new(project_id: &str, title: &str, abstract_text: &str, sections: String) -> Self {
        Self {
            id: new_id(),
            project_id: project_id.to_string(),
            title: title.to_string(),
            abstract_text: abstract_text.to_string(),
            sections,
            created_at: Utc::now(),
        }
    }
}

/// 幻灯片，`slides` 为幻灯片列表的JSON
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresentationRecord {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub slides: String,
    pub created_at: DateTime<Utc>,
}

impl PresentationRecord {
    pub fn new(project_id: &str, title: &str, slides: String) -> Self {
        Self {
            id: new_id(),
            project_id: project_id.to_string(),
            title: title.to_string(),
            slides,
            created_at: Utc::now(),
        }
    }
}
