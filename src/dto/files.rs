use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub filename: String,
    pub original_name: String,
    pub url: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredFiles {
    pub count: usize,
    pub files: Vec<StoredFile>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileCheck {
    pub exists: bool,
}
