pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use anyhow::{Context, bail};
use clap::Parser;
use logbox_core::LogService;
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    if cli.command.needs_remote() && !cli.config.has_credentials() {
        bail!("remote credentials missing: set LOGBOX_REMOTE_USER and LOGBOX_REMOTE_PASSWORD");
    }
    let svc = LogService::from_config(&cli.config.to_config())
        .await
        .context("failed to open log storage")?;

    let res = match cli.command {
        Commands::Search { keyword } => handlers::handle_search(&svc, &keyword).await,
        Commands::Fetch { id } => handlers::handle_fetch(&svc, &id).await,
        Commands::Ls => handlers::handle_ls(&svc).await,
        Commands::Show { id } => handlers::handle_show(&svc, &id).await,
        Commands::Tree { id } => handlers::handle_tree(&svc, &id).await,
        Commands::Cat { id, path, meta } => handlers::handle_cat(&svc, &id, &path, meta).await,
        Commands::Rm { id } => handlers::handle_rm(&svc, &id).await,
    };
    Ok(res?)
}

// Diagnostics go to stderr so command output stays pipeable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
