use std::path::{Path, PathBuf};

use async_trait::async_trait;
use libsql::{Builder, Connection, Database, Row, params};
use time::OffsetDateTime;
use tracing::debug;

use crate::domain::LogRecord;
use crate::error::{LogboxError, Result};

/// Persistence for acquired-log metadata.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or replace the record for `rec.id`.
    async fn upsert(&self, rec: &LogRecord) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<LogRecord>>;

    /// All records, most recently acquired first.
    async fn list(&self) -> Result<Vec<LogRecord>>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: &str) -> Result<bool>;
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        log_id TEXT UNIQUE NOT NULL,
        file_path TEXT NOT NULL,
        extract_path TEXT NOT NULL,
        download_time INTEGER NOT NULL,
        archive_size INTEGER NOT NULL DEFAULT 0,
        archive_blake3 TEXT NOT NULL DEFAULT ''
    )";

const COLUMNS: &str =
    "log_id, file_path, extract_path, download_time, archive_size, archive_blake3";

/// libsql-backed record store: one flat `logs` table.
pub struct SqlRecordStore {
    _db: Database,
    conn: Connection,
}

impl SqlRecordStore {
    pub async fn open(path: &Path) -> Result<Self> {
        let db = Builder::new_local(path).build().await?;
        Self::init(db).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::init(db).await
    }

    async fn init(db: Database) -> Result<Self> {
        let conn = db.connect()?;
        conn.execute(SCHEMA, ()).await?;
        Ok(Self { _db: db, conn })
    }
}

#[async_trait]
impl RecordStore for SqlRecordStore {
    async fn upsert(&self, rec: &LogRecord) -> Result<()> {
        let sql = format!("INSERT OR REPLACE INTO logs ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)");
        self.conn
            .execute(
                &sql,
                params![
                    rec.id.as_str(),
                    rec.archive_path.to_string_lossy().into_owned(),
                    rec.extract_root.to_string_lossy().into_owned(),
                    rec.acquired_at.unix_timestamp(),
                    rec.archive_size as i64,
                    rec.archive_blake3.as_str(),
                ],
            )
            .await?;
        debug!(log_id = %rec.id, "record stored");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<LogRecord>> {
        let sql = format!("SELECT {COLUMNS} FROM logs WHERE log_id = ?1");
        let mut rows = self.conn.query(&sql, params![id]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(record_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<LogRecord>> {
        let sql = format!("SELECT {COLUMNS} FROM logs ORDER BY download_time DESC, log_id ASC");
        let mut rows = self.conn.query(&sql, ()).await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(record_from_row(&row)?);
        }
        Ok(out)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM logs WHERE log_id = ?1", params![id])
            .await?;
        Ok(affected > 0)
    }
}

fn record_from_row(row: &Row) -> Result<LogRecord> {
    let ts: i64 = row.get(3)?;
    let acquired_at = OffsetDateTime::from_unix_timestamp(ts)
        .map_err(|e| LogboxError::Internal(format!("bad download_time {ts}: {e}")))?;
    let size: i64 = row.get(4)?;
    Ok(LogRecord {
        id: row.get(0)?,
        archive_path: PathBuf::from(row.get::<String>(1)?),
        extract_root: PathBuf::from(row.get::<String>(2)?),
        acquired_at,
        archive_size: size.max(0) as u64,
        archive_blake3: row.get(5)?,
    })
}
