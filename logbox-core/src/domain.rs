// logbox_core/src/domain.rs
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use time::OffsetDateTime;

/// Persisted metadata for one acquired log bundle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(rename = "log_id")]
    pub id: String,
    #[serde(rename = "file_path")]
    pub archive_path: PathBuf,
    #[serde(rename = "extract_path")]
    pub extract_root: PathBuf,
    #[serde(rename = "download_time", with = "time::serde::rfc3339")]
    pub acquired_at: OffsetDateTime,
    pub archive_size: u64,
    pub archive_blake3: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLogSummary {
    pub id: String,
    pub boxname: String,
    pub createat: String,
    pub description: String,
}

/// What a successful acquisition left on disk.
#[derive(Clone, Debug)]
pub struct Acquired {
    pub archive_path: PathBuf,
    pub extract_root: PathBuf,
    pub archive_size: u64,
    pub archive_blake3: String,
    pub entries: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTreeNode {
    pub name: String,
    /// Relative to the extraction root, always `/`-separated.
    pub path: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    Directory { children: Vec<FileTreeNode> },
    File { size: u64 },
}

impl FileTreeNode {
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    pub fn children(&self) -> &[FileTreeNode] {
        match &self.kind {
            NodeKind::Directory { children } => children,
            NodeKind::File { .. } => &[],
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Json,
    Text,
    Xml,
    Yaml,
    Html,
    Binary,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: ContentType,
    pub size: u64,
}
