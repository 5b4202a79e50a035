use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use shopfront_api::config::AppConfig;
use shopfront_api::database::{self, PgStore};
use shopfront_api::media::LocalMediaStore;
use shopfront_api::{app, AppState};

#[derive(Parser)]
#[command(name = "shopfront-api")]
#[command(about = "Storefront backend API - accounts, catalogue and news")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on, overrides PORT")]
        port: Option<u16>,
    },

    #[command(about = "Apply database migrations and exit")]
    Migrate,

    #[command(about = "Create an administrator account")]
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shopfront_api=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    tracing::info!("Starting shopfront-api in {:?} mode", config.environment);

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Commands::Migrate => {
            let store = PgStore::connect(&config.database).await.context("connecting to database")?;
            store.migrate().await.context("applying migrations")?;
            store.close().await;
            Ok(())
        }
        Commands::CreateAdmin { username, email, password } => {
            config.validate()?;
            let store = database::open(&config.database).await.context("opening store")?;
            let media = Arc::new(LocalMediaStore::new(&config.media));
            let state = AppState::new(config, store, media)?;

            let account = state
                .accounts
                .create_admin(&username, &email, &password)
                .await
                .map_err(|e| match e {
                    shopfront_api::services::ServiceError::InvalidInput(envelope) => {
                        anyhow::anyhow!("{}: {}", envelope.summary, envelope.problems.join("; "))
                    }
                    other => anyhow::anyhow!(other),
                })?;

            println!("Created administrator #{} ({})", account.get("id").cloned().unwrap_or_default(), email);
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    config.validate()?;

    let store = database::open(&config.database).await.context("opening store")?;
    let media = Arc::new(LocalMediaStore::new(&config.media));
    tokio::fs::create_dir_all(media.dir())
        .await
        .with_context(|| format!("creating media directory {}", media.dir().display()))?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, store, media)?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("shopfront-api listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
