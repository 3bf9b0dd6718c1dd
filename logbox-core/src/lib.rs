#![forbid(unsafe_code)]

pub mod config;
pub mod domain;
pub mod error;

pub mod util {
    pub mod hash_forward;
    pub mod sanitize;
}

pub mod read {
    pub mod extract;
}

pub mod browse {
    pub mod content;
    pub mod tree;
}

pub mod pipeline;
pub mod records;
pub mod remote;
pub mod service;
pub mod store;

// Re-exports: stable API surface
pub use config::{LogboxConfig, RemoteConfig, StorageLayout};
pub use domain::{ContentType, FileContent, FileTreeNode, LogRecord, NodeKind, RemoteLogSummary};
pub use error::{ErrorKind, LogboxError, Result};
pub use records::{RecordStore, SqlRecordStore};
pub use remote::{LogSource, RemoteClient};
pub use service::LogService;
pub use store::{ArchiveStore, validate_log_id};
