mod cache_commands;
mod check_command;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    anyhow::bail,
    clap::{Parser, Subcommand},
    courier_config::{Severity, validate},
    courier_engine::Engine,
    courier_telegram::{Script, TelegramTransport, build_bot, parse_mode, start_polling},
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "courier", about = "courier: scripted Telegram media delivery")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and ~/.config/courier/).
    #[arg(long, short, global = true, env = "COURIER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (default when no subcommand is provided).
    Run,
    /// Validate the configuration and report errors/warnings.
    Check,
    /// Inspect or reset the file id cache.
    Cache {
        #[command(subcommand)]
        action: cache_commands::CacheAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = cli.config.as_deref();
    match cli.command {
        None | Some(Commands::Run) => run(config).await,
        Some(Commands::Check) => check_command::check(config),
        Some(Commands::Cache { action }) => cache_commands::handle_cache(action, config).await,
    }
}

async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "courier starting");

    let (config, path) = courier_config::load(config_path)?;
    match path {
        Some(ref path) => info!(path = %path.display(), "config loaded"),
        None => warn!("no config file found, using defaults"),
    }

    let diagnostics = validate(&config);
    let mut errors = 0;
    for d in &diagnostics {
        match d.severity {
            Severity::Error => {
                errors += 1;
                error!(path = %d.path, "{}", d.message);
            },
            Severity::Warning => warn!(path = %d.path, "{}", d.message),
        }
    }
    if errors > 0 {
        bail!("configuration has {errors} error(s); run `courier check` for details");
    }

    let script = Script::compile(&config)?;
    let bot = build_bot(&config.telegram)?;
    let transport = Arc::new(TelegramTransport::new(
        bot.clone(),
        config.telegram.parse_mode.map(parse_mode),
    ));
    let engine = Arc::new(Engine::open(&config.engine, transport).await);

    let cancel = start_polling(bot, engine, script, &config.telegram).await?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("shutdown requested");
        },
        () = cancel.cancelled() => warn!("polling loop exited"),
    }
    cancel.cancel();

    info!("courier stopped");
    Ok(())
}
