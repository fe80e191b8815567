//! MCP database server
//!
//! Serves the gateway over stdio against a SQLite database.

use {
    anyhow::{Context, Result},
    clap::Parser,
    dbmcp::{
        config::{Configuration, CONFIG_PATH_ENV, PROFILE_ENV},
        logging,
        store::SqliteStore,
        McpServer,
    },
    std::{path::PathBuf, sync::Arc},
};

#[derive(Debug, Parser)]
#[command(name = "dbmcp-server", version, about = "Governed database access over MCP (stdio)")]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "MCP_DATABASE_PATH", default_value = "database.db")]
    database: PathBuf,

    /// TOML configuration file
    #[arg(long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Configuration profile to use
    #[arg(long = "env", env = PROFILE_ENV)]
    profile: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Configuration::load(cli.config.as_deref(), cli.profile.as_deref())
        .context("Failed to load configuration")?;

    // Logs go to stderr; stdout belongs to the protocol
    logging::init_tracing(&config.log_level);
    logging::log_server_startup(&cli.database.display().to_string());

    let store = SqliteStore::open(&cli.database)
        .with_context(|| format!("Failed to open database {}", cli.database.display()))?;
    store
        .set_busy_timeout(config.query_timeout)
        .await
        .context("Failed to apply query timeout")?;

    let server = McpServer::new(config, Arc::new(store));
    server.serve_stdio().await?;

    Ok(())
}
