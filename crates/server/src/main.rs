use clap::Parser;
use parlor_db::Repository;
use parlor_server::{ServerState, server::build_app};
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;

/// The messaging and WebRTC-signaling server.
#[derive(Parser)]
#[command(name = "parlor-server", about = "Chat, contacts, and signaling relay")]
struct Cli {
    /// Log level (trace, debug, info, warn, error); overridden by RUST_LOG.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long)]
    bind: Option<String>,

    /// SQLite connection URL (overrides config value).
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    parlor_common::logging::init_telemetry(&cli.log_level, cli.json_logs);
    info!(version = env!("CARGO_PKG_VERSION"), "parlor-server starting");

    let mut config = parlor_config::discover_and_load();
    if let Some(bind) = cli.bind {
        config.listen_addr = bind;
    }
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    let pool = SqlitePoolOptions::new()
        .connect(&config.database_url)
        .await?;
    parlor_db::run_migrations(&pool).await?;

    let repo = Repository::new(pool);
    let state = ServerState::new(repo, &config);
    let app = build_app(state);

    parlor_server::server::serve(&config.listen_addr, app).await
}
