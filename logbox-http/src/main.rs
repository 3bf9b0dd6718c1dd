use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use logbox_core::config::DEFAULT_REMOTE_URL;
use logbox_core::{LogService, LogboxConfig, RemoteConfig, StorageLayout};
use logbox_http::{AppState, logging, router};
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about = "logbox HTTP server", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "LOGBOX_LISTEN", default_value = "0.0.0.0:5000")]
    listen: SocketAddr,

    /// Base URL of the remote log-hosting service
    #[arg(long, env = "LOGBOX_REMOTE_URL", default_value = DEFAULT_REMOTE_URL)]
    remote_url: String,

    #[arg(long, env = "LOGBOX_REMOTE_USER")]
    remote_user: String,

    #[arg(long, env = "LOGBOX_REMOTE_PASSWORD", hide_env_values = true)]
    remote_password: String,

    /// Root for downloaded archives and extracted trees
    #[arg(long, env = "LOGBOX_STORAGE_DIR", default_value = "storage")]
    storage_dir: PathBuf,

    /// SQLite database holding log records
    #[arg(long, env = "LOGBOX_DB", default_value = "logs.db")]
    db: PathBuf,

    #[arg(long, default_value_t = 10)]
    search_timeout_secs: u64,

    #[arg(long, default_value_t = 300)]
    fetch_timeout_secs: u64,
}

impl Args {
    fn config(&self) -> LogboxConfig {
        let mut remote = RemoteConfig::new(
            self.remote_url.clone(),
            self.remote_user.clone(),
            self.remote_password.clone(),
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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();
    let args = Args::parse();

    let service = LogService::from_config(&args.config())
        .await
        .context("failed to initialise log service")?;
    let app = router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!(addr = %args.listen, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not install ctrl-c handler");
        std::future::pending::<()>().await;
    }
}
