use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::browse::{content, tree};
use crate::config::LogboxConfig;
use crate::domain::{FileContent, FileTreeNode, LogRecord, RemoteLogSummary};
use crate::error::{LogboxError, Result};
use crate::pipeline;
use crate::records::{RecordStore, SqlRecordStore};
use crate::remote::{LogSource, RemoteClient};
use crate::store::ArchiveStore;

/// Incoming entries older than the download timeout plus this are abandoned.
const STALE_GRACE: Duration = Duration::from_secs(600);

/// Everything the front ends need: remote search, acquisition and
/// browsing of acquired logs.
#[derive(Clone)]
pub struct LogService {
    store: ArchiveStore,
    source: Arc<dyn LogSource>,
    records: Arc<dyn RecordStore>,
}

impl LogService {
    pub fn new(
        store: ArchiveStore,
        source: Arc<dyn LogSource>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            store,
            source,
            records,
        }
    }

    /// Open storage, clear leftovers from interrupted runs and connect the
    /// remote client and record store. Several processes may share one
    /// storage root, so only entries older than any live download are swept.
    pub async fn from_config(cfg: &LogboxConfig) -> Result<Self> {
        let store = ArchiveStore::open(&cfg.storage)?;
        store.sweep_incoming(cfg.remote.fetch_timeout + STALE_GRACE)?;
        if let Some(parent) = cfg.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let records = SqlRecordStore::open(&cfg.database_path).await?;
        let source = RemoteClient::new(cfg.remote.clone())?;
        info!(db = %cfg.database_path.display(), remote = %cfg.remote.base_url, "log service ready");
        Ok(Self::new(store, Arc::new(source), Arc::new(records)))
    }

    pub async fn search(&self, keyword: &str) -> Result<Vec<RemoteLogSummary>> {
        self.source.search(keyword.trim()).await
    }

    /// Download and unpack `id`, then record it. Re-acquiring replaces the
    /// previous copy and its record.
    pub async fn acquire(&self, id: &str) -> Result<LogRecord> {
        self.acquire_holding(id, ()).await
    }

    /// [`acquire`](Self::acquire) with an exclusion token that stays alive
    /// until the on-disk work for `id` is done.
    pub async fn acquire_holding<G>(&self, id: &str, guard: G) -> Result<LogRecord>
    where
        G: Send + 'static,
    {
        let done = pipeline::acquire_holding(&self.store, self.source.as_ref(), id, guard).await?;
        let record = LogRecord {
            id: id.to_string(),
            archive_path: done.archive_path,
            extract_root: done.extract_root,
            acquired_at: now_seconds()?,
            archive_size: done.archive_size,
            archive_blake3: done.archive_blake3,
        };
        if let Err(e) = self.records.upsert(&record).await {
            warn!(log_id = id, error = %e, "files kept but record could not be stored");
            return Err(e);
        }
        Ok(record)
    }

    pub async fn records(&self) -> Result<Vec<LogRecord>> {
        self.records.list().await
    }

    /// Ids that could never have been acquired are simply not found.
    pub async fn record(&self, id: &str) -> Result<LogRecord> {
        self.records
            .get(id)
            .await?
            .ok_or_else(|| LogboxError::NotFound("Log not found".into()))
    }

    pub async fn tree(&self, id: &str) -> Result<Vec<FileTreeNode>> {
        let root = self.record(id).await?.extract_root;
        tokio::task::spawn_blocking(move || tree::list_tree(&root)).await?
    }

    pub async fn read_file(&self, id: &str, rel: &str) -> Result<FileContent> {
        if rel.is_empty() {
            return Err(LogboxError::InvalidInput("File path is required".into()));
        }
        let root = self.record(id).await?.extract_root;
        let rel = rel.to_string();
        tokio::task::spawn_blocking(move || content::read_file(&root, &rel)).await?
    }

    /// Forget `id` and delete its files.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.delete_holding(id, ()).await
    }

    pub async fn delete_holding<G>(&self, id: &str, guard: G) -> Result<()>
    where
        G: Send + 'static,
    {
        if !self.records.delete(id).await? {
            return Err(LogboxError::NotFound("Log not found".into()));
        }
        let store = self.store.clone();
        let owned = id.to_string();
        tokio::task::spawn_blocking(move || {
            let res = store.remove(&owned);
            drop(guard);
            res
        })
        .await??;
        Ok(())
    }
}

/// Records keep whole seconds; trim now so returned and stored values agree.
fn now_seconds() -> Result<OffsetDateTime> {
    let secs = OffsetDateTime::now_utc().unix_timestamp();
    OffsetDateTime::from_unix_timestamp(secs).map_err(|e| LogboxError::Internal(e.to_string()))
}
