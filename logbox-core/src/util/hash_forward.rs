use std::path::Path;

use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// File sink that hashes and counts every byte on its way to disk.
pub struct HashingForward {
    inner: File,
    hasher: blake3::Hasher,
    pub counted: u64,
}

impl HashingForward {
    pub async fn create(path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            inner: File::create(path).await?,
            hasher: blake3::Hasher::new(),
            counted: 0,
        })
    }

    pub async fn write_chunk(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.hasher.update(buf);
        self.counted += buf.len() as u64;
        self.inner.write_all(buf).await
    }

    /// Flush to disk and return `(bytes written, blake3 hex digest)`.
    pub async fn finish(mut self) -> std::io::Result<(u64, String)> {
        self.inner.flush().await?;
        self.inner.sync_all().await?;
        Ok((self.counted, self.hasher.finalize().to_hex().to_string()))
    }
}
