use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use file_catalog::{
    api,
    cli::{self, Cli, Command},
    config::Config,
    object_store,
    storage::Database,
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            init_tracing();
            serve().await
        }
        Command::Configure { output } => cli::configure::run(&output),
        Command::DbUrl { action } => {
            println!("{}", cli::run_db_url(&action)?);
            Ok(())
        }
    }
}

fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

async fn serve() -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "file-catalog starting");

    let config = Config::load()?;

    let db = Database::open(&config.server.data_dir)?;
    info!(data_dir = %config.server.data_dir, "Metadata database opened");

    let object_store = object_store::build(&config.storage, &config.server.public_url).await?;
    match config.storage.provider {
        file_catalog::config::StorageProvider::Local => info!(
            upload_dir = %config.storage.upload_dir,
            "Using local storage provider"
        ),
        provider => info!(%provider, "Using remote storage provider"),
    }

    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        object_store,
    });

    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    info!(address = %config.server.bind_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
