//! docrelay entry point.

mod app;
mod config;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting docrelay");

    let path = config::resolve_path(std::env::args_os().nth(1))?;
    let config = config::Config::load(&path)?;
    tracing::info!(path = %path.display(), mode = ?config.mode, "configuration loaded");

    // Passes run strictly one after another; a single thread is enough.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(app::run(config))?;

    tracing::info!("docrelay stopped");
    Ok(())
}
