use std::error::Error;

use api::Pipeline;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod cli;
mod shutdown;

use cli::{Args, Commands, ServeArgs};
use shutdown::install_shutdown_handler;

async fn run_serve(args: ServeArgs) -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let config = args.into_config();
    tracing::info!(
        role = %config.role,
        bind = %config.bind,
        workers = config.workers,
        db = %config.db.endpoint,
        "Starting pipeline"
    );

    let shutdown = install_shutdown_handler();
    let pipeline = Pipeline::start(&config).await?;

    let listener = TcpListener::bind(config.bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, pipeline.router())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("HTTP server stopped, draining services");
    pipeline.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Serve(serve_args) => run_serve(serve_args).await,
    }
}
