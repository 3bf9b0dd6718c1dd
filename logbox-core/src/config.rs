use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_REMOTE_URL: &str = "https://hlogs.lazycat.cloud";
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Connection settings for the remote log-hosting authority.
#[derive(Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub search_timeout: Duration,
    pub fetch_timeout: Duration,
}

impl RemoteConfig {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

// Hand-written so the password never ends up in logs.
impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("search_timeout", &self.search_timeout)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish()
    }
}

/// Directories owned by the archive store.
#[derive(Clone, Debug)]
pub struct StorageLayout {
    pub archive_dir: PathBuf,
    pub extract_dir: PathBuf,
    /// Scratch space for in-flight downloads and staging extractions.
    pub incoming_dir: PathBuf,
}

impl StorageLayout {
    pub fn under(root: &Path) -> Self {
        Self {
            archive_dir: root.join("zips"),
            extract_dir: root.join("extracted"),
            incoming_dir: root.join("incoming"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LogboxConfig {
    pub remote: RemoteConfig,
    pub storage: StorageLayout,
    pub database_path: PathBuf,
}
