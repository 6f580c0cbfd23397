//! 各阶段的输入输出类型。字段在JSON中使用camelCase，缺失字段取默认值，
//! 以保证阶段间传递的数据在结构上始终完整。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::utils::lenient;

/// 论文各章节的原文抽取
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PaperSections {
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub introduction: Option<String>,
    pub methods: Option<String>,
    pub results: Option<String>,
    pub discussion: Option<String>,
    pub conclusion: Option<String>,
}

impl PaperSections {
    /// 按论文顺序返回非空章节（章节名，内容）
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("abstract", &self.abstract_text),
            ("introduction", &self.introduction),
            ("methods", &self.methods),
            ("results", &self.results),
            ("discussion", &self.discussion),
            ("conclusion", &self.conclusion),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_deref()
                .filter(|text| !text.trim().is_empty())
                .map(|text| (name, text))
        })
        .collect()
    }
}

/// 论文元数据
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PaperMetadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    #[serde(deserialize_with = "lenient::optional_integer")]
    pub year: Option<i64>,
    pub keywords: Vec<String>,
}

/// reader阶段输出：单篇文档的结构化抽取
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ReaderOutput {
    pub sections: PaperSections,
    pub metadata: PaperMetadata,
    pub citations: Vec<String>,
}

/// summarizer阶段输出
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Summary {
    /// 2-3句的整体概述
    pub overall: String,
    pub key_findings: Vec<String>,
    pub contributions: Vec<String>,
    pub limitations: Vec<String>,
}

/// 概念节点
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ConceptNode {
    #[serde(deserialize_with = "lenient::string_or_number")]
    pub id: String,
    pub label: String,
    /// 重要性（0-100）
    #[serde(deserialize_with = "lenient::score")]
    pub importance: u32,
    /// 聚类编号（0-3）
    #[serde(deserialize_with = "lenient::score")]
    pub cluster: u32,
}

/// 概念之间的关系
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ConceptEdge {
    #[serde(deserialize_with = "lenient::string_or_number")]
    pub source: String,
    #[serde(deserialize_with = "lenient::string_or_number")]
    pub target: String,
    pub relationship: String,
}

/// graph阶段输出：概念图
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ConceptGraph {
    pub nodes: Vec<ConceptNode>,
    pub edges: Vec<ConceptEdge>,
}

/// hypothesis阶段输出的单条假设
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Hypothesis {
    #[serde(deserialize_with = "lenient::string_or_number")]
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(deserialize_with = "lenient::score")]
    pub testability: u32,
    #[serde(deserialize_with = "lenient::score")]
    pub novelty: u32,
    #[serde(deserialize_with = "lenient::score")]
    pub feasibility: u32,
    pub category: String,
}

/// 大纲中的章节
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct OutlineSection {
    pub title: String,
    pub description: String,
    pub subsections: Vec<String>,
    /// 升序排列决定写作顺序
    #[serde(deserialize_with = "lenient::score")]
    pub order: u32,
}

/// outliner阶段输出：论文大纲
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ResearchOutline {
    pub title: String,
    /// 摘要需要覆盖的要点
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub sections: Vec<OutlineSection>,
}

/// statistics阶段输出的单个数据点
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct StatisticData {
    /// Performance、Demographics、Financial、Efficiency、Accuracy或Other
    pub category: String,
    pub label: String,
    /// 数值，接受 `"95%"` 这类字符串，无法解析时为NaN
    #[serde(deserialize_with = "lenient::number_or_numeric_string")]
    pub value: f64,
    pub unit: Option<String>,
    /// 原文中出现该数据的句子
    pub context: String,
}

/// statistics阶段的模型响应，兼容带 `statistics` 外壳和裸数组两种形式
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum StatisticsResponse {
    Envelope {
        #[serde(default)]
        statistics: Vec<StatisticData>,
    },
    Bare(Vec<StatisticData>),
}

impl StatisticsResponse {
    pub fn into_statistics(self) -> Vec<StatisticData> {
        match self {
            StatisticsResponse::Envelope { statistics } => statistics,
            StatisticsResponse::Bare(statistics) => statistics,
        }
    }
}

/// experiment阶段输出的单个实验设计
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Experiment {
    pub hypothesis: String,
    pub methodology: String,
    pub resources: Vec<String>,
    pub timeline: String,
    pub expected_outcomes: Vec<String>,
}

/// writer阶段的输入
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WriterInput {
    pub outline: ResearchOutline,
    pub summaries: Vec<Summary>,
    pub hypotheses: Vec<Hypothesis>,
    pub experiments: Vec<Experiment>,
}

/// writer阶段输出：完整论文
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ResearchPaper {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub introduction: String,
    pub literature_review: String,
    pub methodology: String,
    pub results: String,
    pub discussion: String,
    pub conclusion: String,
    pub references: Vec<String>,
    /// 拼接后的全文（markdown）
    pub full_text: String,
}

/// 单章节评审意见
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ReviewFeedback {
    pub section: String,
    #[serde(deserialize_with = "lenient::score")]
    pub score: u32,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
}

/// reviewer阶段输出：评审报告
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ReviewReport {
    #[serde(deserialize_with = "lenient::score")]
    pub overall_score: u32,
    pub summary: String,
    pub section_reviews: Vec<ReviewFeedback>,
    pub critical_issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// reviewer阶段的输入
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    pub paper_text: String,
    pub outline: ResearchOutline,
}

/// 论文完整性检查结果
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CompletenessCheck {
    pub complete: bool,
    pub missing_sections: Vec<String>,
    pub issues: Vec<String>,
}

/// 单页幻灯片
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Slide {
    pub title: String,
    pub bullets: Vec<String>,
    /// 演讲者备注
    pub notes: String,
}

/// presenter阶段输出：幻灯片
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PresentationData {
    pub title: String,
    pub slides: Vec<Slide>,
}
