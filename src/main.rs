use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use school_admin_api::config::{self, AppConfig};
use school_admin_api::database::DatabaseManager;
use school_admin_api::models::Role;
use school_admin_api::services::NewAccount;
use school_admin_api::{app, AppState};

#[derive(Parser)]
#[command(name = "school-admin-api")]
#[command(about = "School administration REST API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Run the HTTP server (default)")]
    Serve,

    #[command(about = "Create or update the postgres tables and indexes")]
    Migrate,

    #[command(about = "Create an admin login account")]
    CreateAdmin {
        #[arg(long, help = "Display name")]
        name: String,
        #[arg(long, help = "Login email")]
        email: String,
        #[arg(long, help = "Initial password")]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL and JWT_SECRET
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")))
        .init();

    let cli = Cli::parse();
    let config = config::config().clone();

    if config.security.jwt_secret.trim().is_empty() {
        bail!("JWT_SECRET must be set in {:?} mode", config.environment);
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate => {
            let store = DatabaseManager::connect_postgres(&config.database).await?;
            store.migrate().await?;
            Ok(())
        }
        Command::CreateAdmin { name, email, password } => {
            let store = DatabaseManager::connect(&config.database).await?;
            let state = AppState::new(config, store)?;
            let user = state
                .accounts()
                .register(NewAccount::new(name, email, password, Role::Admin))
                .await?;
            println!("Created admin {} <{}>", user.meta.id, user.email);
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting school admin API in {:?} mode", config.environment);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let store = DatabaseManager::connect(&config.database)
        .await
        .context("failed to open document store")?;
    let state = AppState::new(config, store)?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
