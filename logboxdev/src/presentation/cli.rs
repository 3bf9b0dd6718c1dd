use clap::{Args, Parser, Subcommand};
use logbox_core::config::DEFAULT_REMOTE_URL;
use logbox_core::{LogboxConfig, RemoteConfig, StorageLayout};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about = "logboxdev: fetch and inspect diagnostic log bundles", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Same knobs and environment variables as the server.
#[derive(Args)]
pub struct ConfigArgs {
    #[arg(long, global = true, env = "LOGBOX_REMOTE_URL", default_value = DEFAULT_REMOTE_URL)]
    pub remote_url: String,

    #[arg(long, global = true, env = "LOGBOX_REMOTE_USER")]
    pub remote_user: Option<String>,

    #[arg(long, global = true, env = "LOGBOX_REMOTE_PASSWORD", hide_env_values = true)]
    pub remote_password: Option<String>,

    #[arg(long, global = true, env = "LOGBOX_STORAGE_DIR", default_value = "storage")]
    pub storage_dir: PathBuf,

    #[arg(long, global = true, env = "LOGBOX_DB", default_value = "logs.db")]
    pub db: PathBuf,

    #[arg(long, global = true, default_value_t = 10)]
    pub search_timeout_secs: u64,

    /// Download timeout in seconds
    #[arg(long, global = true, default_value_t = 300)]
    pub fetch_timeout_secs: u64,
}

impl ConfigArgs {
    pub fn has_credentials(&self) -> bool {
        self.remote_user.is_some() && self.remote_password.is_some()
    }

    pub fn to_config(&self) -> LogboxConfig {
        let mut remote = RemoteConfig::new(
            self.remote_url.clone(),
            self.remote_user.clone().unwrap_or_default(),
            self.remote_password.clone().unwrap_or_default(),
        );
        remote.search_timeout = Duration::from_secs(self.search_timeout_secs);
        remote.fetch_timeout = Duration::from_secs(self.fetch_timeout_secs);
        LogboxConfig {
            remote,
            storage: StorageLayout::under(&self.storage_dir),
            database_path: self.db.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search the remote service for log bundles
    Search {
        /// Empty lists everything
        #[arg(default_value = "")]
        keyword: String,
    },
    /// Download and unpack a log bundle
    Fetch { id: String },
    /// List acquired logs, newest first
    Ls,
    /// Print one acquired log's record as JSON
    Show { id: String },
    /// Print the file tree of an acquired log
    Tree { id: String },
    /// Print one file of an acquired log
    Cat {
        id: String,
        path: String,
        /// Print the classification line before the content
        #[arg(long)]
        meta: bool,
    },
    /// Delete an acquired log and its files
    Rm { id: String },
}

impl Commands {
    pub fn needs_remote(&self) -> bool {
        matches!(self, Commands::Search { .. } | Commands::Fetch { .. })
    }
}
