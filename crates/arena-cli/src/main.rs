mod cli;
mod commands;
mod render;
mod runtime;

use std::path::Path;
use std::process::ExitCode;

use arena_common::{ArenaError, ConfigError};
use arena_config::ArenaConfig;
use arena_sync::SyncSession;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::{Args, Command};

fn load_config(path: Option<&str>) -> (ArenaConfig, Option<ConfigError>) {
    let loaded = match path {
        Some(path) => arena_config::load_config_from(Path::new(path)),
        None => arena_config::load_config(),
    };
    match loaded {
        Ok(config) => (config, None),
        Err(e) => (ArenaConfig::default(), Some(e)),
    }
}

fn init_logging(args: &Args, config: &ArenaConfig) {
    let fallback = config.logging.level.directive();
    let directive = args.log_level.as_deref().unwrap_or(fallback);
    let filter = EnvFilter::from_default_env().add_directive(
        directive
            .parse()
            .unwrap_or_else(|_| LevelFilter::INFO.into()),
    );
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(args: Args, config: ArenaConfig) -> Result<(), ArenaError> {
    let identity = runtime::identity(args.user_id, args.token)?;
    let clients = runtime::clients(&config, &identity)?;
    let mut sync = runtime::sync_config(&config, &identity);
    if args.command != Command::Watch {
        // Only `watch` keeps the inbox on screen.
        sync.notifications_enabled = false;
    }

    let mut session = SyncSession::start(identity, clients.api, clients.writer, sync).await;
    let result = match args.command {
        Command::Watch => commands::watch(&mut session).await,
        Command::Host => commands::host(&session).await,
        Command::Join { ref code } => commands::join(&session, code).await,
        Command::Community => commands::community(&session).await,
        Command::Chat { ref friend_id } => commands::chat(&mut session, friend_id).await,
    };
    session.stop().await;
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = cli::parse();
    let (config, config_error) = load_config(args.config.as_deref());
    init_logging(&args, &config);

    tracing::info!("Arena v{} starting...", env!("CARGO_PKG_VERSION"));
    if let Some(e) = config_error {
        tracing::warn!("Config load failed, using defaults: {e}");
    }

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
