use std::fs::{self, File};
use std::io;
use std::path::Path;

use tracing::debug;
use zip::ZipArchive;

use crate::error::{LogboxError, Result};
use crate::util::sanitize::safe_join;

/// Open `archive` as a zip container and return its entry count.
/// An unreadable or empty container is a `CorruptArchive`.
pub fn verify(archive: &Path) -> Result<usize> {
    let f = File::open(archive)?;
    let zip = ZipArchive::new(f).map_err(|e| LogboxError::CorruptArchive(e.to_string()))?;
    if zip.is_empty() {
        return Err(LogboxError::CorruptArchive("archive has no entries".into()));
    }
    debug!(archive = %archive.display(), entries = zip.len(), "archive verified");
    Ok(zip.len())
}

/// Unpack every entry of `archive` under `dest` and return how many
/// entries were written. Entry names that would resolve outside `dest`
/// abort the extraction.
pub fn extract(archive: &Path, dest: &Path) -> Result<usize> {
    let f = File::open(archive)?;
    let mut zip = ZipArchive::new(f).map_err(|e| LogboxError::CorruptArchive(e.to_string()))?;
    fs::create_dir_all(dest)?;

    let mut written = 0usize;
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| LogboxError::CorruptArchive(e.to_string()))?;
        let outp = safe_join(dest, entry.name()).map_err(|_| {
            LogboxError::CorruptArchive(format!("entry escapes extraction root: {}", entry.name()))
        })?;
        if outp == dest {
            continue;
        }

        if entry.is_dir() {
            fs::create_dir_all(&outp)?;
        } else {
            if let Some(parent) = outp.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&outp)?;
            io::copy(&mut entry, &mut out).map_err(|e| match e.kind() {
                io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
                    LogboxError::CorruptArchive(format!("{}: {e}", entry.name()))
                }
                _ => LogboxError::Io(e),
            })?;
        }
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    /// Build an in-memory zip; names ending in `/` become directory entries.
    pub(crate) fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut w = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let opts = SimpleFileOptions::default();
        for (name, body) in entries {
            if name.ends_with('/') {
                w.add_directory(*name, opts).unwrap();
            } else {
                w.start_file(*name, opts).unwrap();
                w.write_all(body).unwrap();
            }
        }
        w.finish().unwrap().into_inner()
    }

    #[test]
    fn verify_counts_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("ok.zip");
        fs::write(&p, zip_bytes(&[("a/b.txt", b"hello"), ("c.json", b"{}")])).unwrap();
        assert_eq!(verify(&p).unwrap(), 2);
    }

    #[test]
    fn verify_rejects_garbage_and_empty_archives() {
        let tmp = tempfile::tempdir().unwrap();
        let garbage = tmp.path().join("garbage.zip");
        fs::write(&garbage, b"<html>expired</html>").unwrap();
        assert!(matches!(verify(&garbage), Err(LogboxError::CorruptArchive(_))));

        let empty = tmp.path().join("empty.zip");
        fs::write(&empty, zip_bytes(&[])).unwrap();
        assert!(matches!(verify(&empty), Err(LogboxError::CorruptArchive(_))));
    }

    #[test]
    fn extracts_nested_files_and_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("ok.zip");
        fs::write(
            &p,
            zip_bytes(&[("logs/", b""), ("logs/app.log", b"line\n"), ("top.txt", b"t")]),
        )
        .unwrap();
        let dest = tmp.path().join("out");

        assert_eq!(extract(&p, &dest).unwrap(), 3);
        assert_eq!(fs::read(dest.join("logs/app.log")).unwrap(), b"line\n");
        assert_eq!(fs::read(dest.join("top.txt")).unwrap(), b"t");
    }

    #[test]
    fn refuses_entries_escaping_the_root() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("evil.zip");
        fs::write(&p, zip_bytes(&[("ok.txt", b"fine"), ("../evil.txt", b"pwned")])).unwrap();
        let dest = tmp.path().join("out");

        let err = extract(&p, &dest).unwrap_err();
        assert!(matches!(err, LogboxError::CorruptArchive(_)));
        assert!(!tmp.path().join("evil.txt").exists());
    }
}
