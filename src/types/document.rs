use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// 已上传并完成文本抽取的研究文档，对流水线只读
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub project_id: String,
    pub file_name: String,
    /// 抽取出的纯文本，可能为空字符串
    #[serde(default)]
    pub extracted_text: String,
    /// 文本内容的MD5
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(
        project_id: impl Into<String>,
        file_name: impl Into<String>,
        extracted_text: impl Into<String>,
    ) -> Self {
        let extracted_text = extracted_text.into();
        let content_hash = hash_content(&extracted_text);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            file_name: file_name.into(),
            extracted_text,
            content_hash,
            created_at: Utc::now(),
        }
    }

    /// 便于展示的文档标题（去掉扩展名的文件名）
    pub fn display_title(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .filter(|stem| !stem.is_empty())
            .unwrap_or(&self.file_name)
    }
}

pub fn hash_content(content: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
