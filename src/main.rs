use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use makond::{
    config::ServiceConfig,
    mentor::{CompletionService, MentorClient},
    rest,
    storage::Storage,
    AppContext,
};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "makond",
    about = "MAKON learning platform — progress & rewards service",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// REST API server port
    #[arg(long, env = "MAKOND_PORT")]
    port: Option<u16>,

    /// Data directory for the SQLite database and config.toml
    #[arg(long, env = "MAKOND_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "MAKOND_LOG")]
    log: Option<String>,

    /// Bind address for the REST server (default: 127.0.0.1; use 0.0.0.0 for LAN access)
    #[arg(long, env = "MAKOND_BIND")]
    bind_address: Option<String>,

    /// Emit JSON log lines (structured for log aggregators)
    #[arg(long)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST server (default when no subcommand given).
    ///
    /// Examples:
    ///   makond serve
    ///   makond
    Serve,
    /// Manage local user accounts.
    ///
    /// The hosted auth provider owns sign-up; these commands mirror its
    /// accounts locally for wallet provisioning and bearer tokens.
    ///
    /// Examples:
    ///   makond user add --balance 50000
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Provision a user and print its id and bearer token.
    Add {
        /// Opening wallet balance in UZS minor units.
        #[arg(long, default_value_t = 0)]
        balance: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Arc::new(ServiceConfig::new(
        args.port,
        args.data_dir,
        args.log,
        args.bind_address,
        args.log_json,
    ));

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => run_serve(config).await,
        Command::User { action } => match action {
            UserAction::Add { balance } => run_user_add(&config, balance).await,
        },
    }
}

fn init_logging(config: &ServiceConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log).unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).compact().init();
    }
}

async fn run_serve(config: Arc<ServiceConfig>) -> Result<()> {
    init_logging(&config);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %config.data_dir.display(),
        "makond starting"
    );

    let storage = Arc::new(
        Storage::new_with_slow_query(&config.data_dir, config.slow_query_ms)
            .await
            .context("open storage")?,
    );
    let mentor: Arc<dyn CompletionService> = Arc::new(MentorClient::new(&config.mentor));

    let ctx = Arc::new(AppContext {
        config,
        storage,
        mentor,
        started_at: std::time::Instant::now(),
    });

    rest::start_rest_server(ctx).await
}

async fn run_user_add(config: &ServiceConfig, balance: i64) -> Result<()> {
    let storage = Storage::new(&config.data_dir).await.context("open storage")?;
    let user = storage.create_user(balance).await?;
    let token = storage.issue_token(&user.id).await?;
    println!("user id: {}", user.id);
    println!("token:   {token}");
    Ok(())
}
