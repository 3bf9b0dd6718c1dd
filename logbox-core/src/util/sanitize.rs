use std::path::{Component, Path, PathBuf};

use crate::error::{LogboxError, Result};

/// Join an untrusted relative path onto `root`, refusing anything that
/// could land outside of it lexically (absolute paths, `..`, drive prefixes).
pub fn safe_join(root: &Path, rel: &str) -> Result<PathBuf> {
    let normalized = rel.replace('\\', "/");
    if normalized.contains('\0') {
        return Err(LogboxError::Forbidden(format!("unsafe path: {rel}")));
    }
    let mut out = root.to_path_buf();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(LogboxError::Forbidden(format!("unsafe path: {rel}")));
            }
        }
    }
    Ok(out)
}

/// Resolve `rel` under `root` and confirm the real (symlink-free) target
/// still sits inside the real root. The target must exist.
pub fn resolve_within(root: &Path, rel: &str) -> Result<PathBuf> {
    let joined = safe_join(root, rel)?;
    let root_canon = root
        .canonicalize()
        .map_err(|_| LogboxError::NotFound(format!("{} does not exist", root.display())))?;
    let target_canon = joined
        .canonicalize()
        .map_err(|_| LogboxError::NotFound(format!("file does not exist: {rel}")))?;
    if !target_canon.starts_with(&root_canon) {
        return Err(LogboxError::Forbidden(format!("path escapes log root: {rel}")));
    }
    Ok(target_canon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_plain_relative_paths() {
        let root = Path::new("/srv/logs/abc");
        assert_eq!(
            safe_join(root, "a/./b.txt").unwrap(),
            PathBuf::from("/srv/logs/abc/a/b.txt")
        );
        assert_eq!(
            safe_join(root, "a\\b.txt").unwrap(),
            PathBuf::from("/srv/logs/abc/a/b.txt")
        );
    }

    #[test]
    fn rejects_escaping_paths() {
        let root = Path::new("/srv/logs/abc");
        for bad in ["../x", "a/../../x", "/etc/passwd", "..\\x", "a\0b"] {
            assert!(
                matches!(safe_join(root, bad), Err(LogboxError::Forbidden(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn resolve_rejects_symlink_escape() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret"), b"x").unwrap();
        let root = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret"), root.path().join("link"))
            .unwrap();

        let err = resolve_within(root.path(), "link").unwrap_err();
        assert!(matches!(err, LogboxError::Forbidden(_)));
    }

    #[test]
    fn resolve_reports_missing_target() {
        let root = tempfile::tempdir().unwrap();
        let err = resolve_within(root.path(), "nope.txt").unwrap_err();
        assert!(matches!(err, LogboxError::NotFound(_)));
    }
}
