use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::Acquired;
use crate::error::{LogboxError, Result};
use crate::read::extract;
use crate::remote::LogSource;
use crate::store::{ArchiveStore, remove_dir_if_exists, validate_log_id};

/// Download, validate and unpack the bundle for `id`.
///
/// The archive lands in the store's incoming area first and is only moved
/// into place once extraction succeeded, so a failed run never disturbs a
/// previously acquired copy and leaves nothing behind besides what the
/// cleanup could not remove.
pub async fn acquire(store: &ArchiveStore, source: &dyn LogSource, id: &str) -> Result<Acquired> {
    acquire_holding(store, source, id, ()).await
}

/// Like [`acquire`], with a caller-held exclusion token for `id`.
///
/// `guard` is handed to the blocking unpack step and dropped only when that
/// step has finished with the incoming and staging paths, even if the
/// calling future is cancelled in the meantime.
pub async fn acquire_holding<G>(
    store: &ArchiveStore,
    source: &dyn LogSource,
    id: &str,
    guard: G,
) -> Result<Acquired>
where
    G: Send + 'static,
{
    let id = validate_log_id(id)?;
    info!(log_id = id, "acquisition started");

    let result = run(store, source, id, guard).await;
    match &result {
        Ok(done) => info!(
            log_id = id,
            bytes = done.archive_size,
            entries = done.entries,
            "acquisition finished"
        ),
        Err(e) => warn!(log_id = id, error = %e, "acquisition failed"),
    }
    result
}

async fn run<G>(store: &ArchiveStore, source: &dyn LogSource, id: &str, guard: G) -> Result<Acquired>
where
    G: Send + 'static,
{
    let incoming = store.incoming_path(id);

    let fetched = match source.fetch(id, &incoming).await {
        Ok(f) if f.bytes == 0 => Err(LogboxError::EmptyDownload),
        other => other,
    };
    let fetched = match fetched {
        Ok(f) => f,
        Err(e) => {
            store.discard_incoming(id);
            return Err(e);
        }
    };

    let paths = Relocation {
        incoming,
        staging: store.staging_root(id),
        retired: store.retired_root(id),
        archive_path: store.archive_path(id),
        extract_root: store.extract_root(id),
    };
    let archive_path = paths.archive_path.clone();
    let extract_root = paths.extract_root.clone();
    let store = store.clone();
    let owned_id = id.to_string();
    let entries = tokio::task::spawn_blocking(move || {
        let res = unpack(&paths);
        if res.is_err() {
            store.discard_incoming(&owned_id);
        }
        drop(guard);
        res
    })
    .await??;

    Ok(Acquired {
        archive_path,
        extract_root,
        archive_size: fetched.bytes,
        archive_blake3: fetched.blake3,
        entries,
    })
}

struct Relocation {
    incoming: PathBuf,
    staging: PathBuf,
    retired: PathBuf,
    archive_path: PathBuf,
    extract_root: PathBuf,
}

fn unpack(p: &Relocation) -> Result<usize> {
    extract::verify(&p.incoming)?;
    remove_dir_if_exists(&p.staging)?;
    let entries = extract::extract(&p.incoming, &p.staging)?;
    if entries == 0 || dir_is_empty(&p.staging)? {
        return Err(LogboxError::CorruptArchive(
            "archive extracted to nothing".into(),
        ));
    }
    relocate(p)?;
    Ok(entries)
}

/// Swap the staged tree and the download into place. The previous tree is
/// set aside first and put back if either move fails.
fn relocate(p: &Relocation) -> Result<()> {
    remove_dir_if_exists(&p.retired)?;
    let had_previous = match fs::rename(&p.extract_root, &p.retired) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => return Err(e.into()),
    };

    let swapped = fs::rename(&p.staging, &p.extract_root)
        .and_then(|()| fs::rename(&p.incoming, &p.archive_path));
    if let Err(e) = swapped {
        if let Err(undo) = restore(p, had_previous) {
            warn!(
                extract_root = %p.extract_root.display(),
                error = %undo,
                "could not restore previous extraction"
            );
        }
        return Err(e.into());
    }

    if had_previous {
        if let Err(e) = remove_dir_if_exists(&p.retired) {
            warn!(path = %p.retired.display(), error = %e, "failed to drop replaced extraction");
        }
    }
    Ok(())
}

fn restore(p: &Relocation, had_previous: bool) -> io::Result<()> {
    remove_dir_if_exists(&p.extract_root)?;
    if had_previous {
        fs::rename(&p.retired, &p.extract_root)?;
    }
    Ok(())
}

fn dir_is_empty(dir: &Path) -> Result<bool> {
    Ok(fs::read_dir(dir)?.next().is_none())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::browse::tree::{count_files, list_tree};
    use crate::config::StorageLayout;
    use crate::domain::RemoteLogSummary;
    use crate::read::extract::tests::zip_bytes;
    use crate::remote::Fetched;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// In-memory stand-in for the remote authority.
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub(crate) bundles: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl FakeSource {
        pub(crate) fn with(id: &str, body: Vec<u8>) -> Self {
            let src = Self::default();
            src.put(id, body);
            src
        }

        pub(crate) fn put(&self, id: &str, body: Vec<u8>) {
            self.bundles.lock().unwrap().insert(id.to_string(), body);
        }
    }

    #[async_trait]
    impl LogSource for FakeSource {
        async fn search(&self, keyword: &str) -> Result<Vec<RemoteLogSummary>> {
            let mut ids: Vec<String> = self.bundles.lock().unwrap().keys().cloned().collect();
            ids.sort();
            Ok(ids
                .into_iter()
                .filter(|id| id.contains(keyword))
                .map(|id| RemoteLogSummary {
                    id,
                    boxname: String::new(),
                    createat: String::new(),
                    description: String::new(),
                })
                .collect())
        }

        async fn fetch(&self, id: &str, dest: &Path) -> Result<Fetched> {
            let body = self
                .bundles
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or_else(|| LogboxError::RemoteNotFound(id.to_string()))?;
            fs::write(dest, &body)?;
            Ok(Fetched {
                bytes: body.len() as u64,
                blake3: blake3::hash(&body).to_hex().to_string(),
            })
        }
    }

    fn store_in(root: &Path) -> ArchiveStore {
        ArchiveStore::open(&StorageLayout::under(root)).unwrap()
    }

    fn entry_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn acquired_tree_matches_archive_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let body = zip_bytes(&[
            ("a/b.txt", b"hello"),
            ("a/c/d.log", b"x"),
            ("c.json", br#"{"x":1}"#),
        ]);
        let src = FakeSource::with("abc123", body.clone());

        let done = acquire(&store, &src, "abc123").await.unwrap();
        assert_eq!(done.archive_path, store.archive_path("abc123"));
        assert_eq!(done.extract_root, store.extract_root("abc123"));
        assert_eq!(done.archive_size, body.len() as u64);
        assert_eq!(fs::read(&done.archive_path).unwrap(), body);

        let tree = list_tree(&done.extract_root).unwrap();
        assert_eq!(count_files(&tree), 3);
        assert!(entry_names(&tmp.path().join("incoming")).is_empty());
    }

    #[tokio::test]
    async fn empty_download_leaves_no_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let src = FakeSource::with("empty", Vec::new());

        let err = acquire(&store, &src, "empty").await.unwrap_err();
        assert!(matches!(err, LogboxError::EmptyDownload));
        assert!(entry_names(store.archive_dir()).is_empty());
        assert!(entry_names(store.extract_dir()).is_empty());
        assert!(entry_names(&tmp.path().join("incoming")).is_empty());
    }

    #[tokio::test]
    async fn non_archive_payload_is_corrupt_and_cleaned_up() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let src = FakeSource::with("html", b"<html>login required</html>".to_vec());

        let err = acquire(&store, &src, "html").await.unwrap_err();
        assert!(matches!(err, LogboxError::CorruptArchive(_)));
        assert!(entry_names(store.archive_dir()).is_empty());
        assert!(entry_names(store.extract_dir()).is_empty());
        assert!(entry_names(&tmp.path().join("incoming")).is_empty());
    }

    #[tokio::test]
    async fn traversal_entry_fails_without_touching_previous_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let src = FakeSource::with("box", zip_bytes(&[("ok.txt", b"v1")]));
        acquire(&store, &src, "box").await.unwrap();

        src.put("box", zip_bytes(&[("ok.txt", b"v2"), ("../../escape.txt", b"x")]));
        let err = acquire(&store, &src, "box").await.unwrap_err();
        assert!(matches!(err, LogboxError::CorruptArchive(_)));

        let kept = fs::read(store.extract_root("box").join("ok.txt")).unwrap();
        assert_eq!(kept, b"v1");
        assert!(!tmp.path().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn reacquire_replaces_extracted_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let src = FakeSource::with("box", zip_bytes(&[("old.txt", b"1")]));
        acquire(&store, &src, "box").await.unwrap();

        src.put("box", zip_bytes(&[("new.txt", b"2")]));
        let done = acquire(&store, &src, "box").await.unwrap();
        assert_eq!(entry_names(&done.extract_root), ["new.txt"]);
    }

    #[tokio::test]
    async fn remote_not_found_is_distinct() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let src = FakeSource::default();

        let err = acquire(&store, &src, "expired").await.unwrap_err();
        assert!(matches!(err, LogboxError::RemoteNotFound(ref id) if id == "expired"));
    }

    #[tokio::test]
    async fn unsafe_identifier_is_rejected_before_fetching() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let src = FakeSource::with("../x", zip_bytes(&[("a", b"a")]));

        let err = acquire(&store, &src, "../x").await.unwrap_err();
        assert!(matches!(err, LogboxError::InvalidInput(_)));
    }

    struct OnDrop<F: FnOnce()>(Option<F>);

    impl<F: FnOnce()> Drop for OnDrop<F> {
        fn drop(&mut self) {
            if let Some(f) = self.0.take() {
                f();
            }
        }
    }

    /// Guard whose drop records whether `check` held at that moment.
    fn checking_guard(
        check: impl FnOnce() -> bool + Send + 'static,
    ) -> (Arc<AtomicBool>, impl Send + 'static) {
        let seen = Arc::new(AtomicBool::new(false));
        let flag = seen.clone();
        (seen, OnDrop(Some(move || flag.store(check(), Ordering::SeqCst))))
    }

    #[tokio::test]
    async fn guard_is_released_after_relocation() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let src = FakeSource::with("box", zip_bytes(&[("a.txt", b"a")]));

        let (root, staging) = (store.extract_root("box"), store.staging_root("box"));
        let (seen, guard) = checking_guard(move || root.is_dir() && !staging.exists());
        acquire_holding(&store, &src, "box", guard).await.unwrap();
        assert!(seen.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn guard_is_released_after_failed_unpack_is_cleaned() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let src = FakeSource::with("box", b"definitely not a zip".to_vec());

        let (incoming, staging) = (store.incoming_path("box"), store.staging_root("box"));
        let (seen, guard) = checking_guard(move || !incoming.exists() && !staging.exists());
        acquire_holding(&store, &src, "box", guard).await.unwrap_err();
        assert!(seen.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn failed_relocation_leaves_no_orphan_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let src = FakeSource::with("box", zip_bytes(&[("ok.txt", b"v1")]));
        // a directory where the archive should go makes the final move fail
        fs::create_dir_all(store.archive_path("box").join("blocker")).unwrap();

        let err = acquire(&store, &src, "box").await.unwrap_err();
        assert!(matches!(err, LogboxError::Io(_)));
        assert!(!store.extract_root("box").exists());
        assert!(entry_names(&tmp.path().join("incoming")).is_empty());
    }

    #[tokio::test]
    async fn failed_relocation_restores_previous_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let src = FakeSource::with("box", zip_bytes(&[("ok.txt", b"v1")]));
        acquire(&store, &src, "box").await.unwrap();

        fs::remove_file(store.archive_path("box")).unwrap();
        fs::create_dir_all(store.archive_path("box").join("blocker")).unwrap();
        src.put("box", zip_bytes(&[("ok.txt", b"v2")]));

        acquire(&store, &src, "box").await.unwrap_err();
        let kept = fs::read(store.extract_root("box").join("ok.txt")).unwrap();
        assert_eq!(kept, b"v1");
        assert!(entry_names(&tmp.path().join("incoming")).is_empty());
    }
}
