use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use throttle_bot::channels::Notifier;
use throttle_bot::config::file::config_file_path;
use throttle_bot::dispatch::{ActionLogMiddleware, ErrorReportMiddleware, PrivateChatMiddleware};
use throttle_bot::{Config, Dispatcher, SharedHandler, TelegramChannel, ThrottleRegistry};

/// Capacity of the queue between the poller and the dispatcher
const UPDATE_QUEUE: usize = 256;

/// Throttle Bot - Telegram bot with per-user flood control
#[derive(Parser)]
#[command(name = "throttle-bot", version, about)]
struct Cli {
    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Process updates from group chats too
    #[arg(long, env = "THROTTLE_BOT_ALLOW_GROUPS")]
    allow_groups: bool,

    /// Keep updates queued while the bot was offline
    #[arg(long)]
    keep_pending: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the config file location and the effective settings
    ShowConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,throttle_bot=info",
        1 => "info,throttle_bot=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;

    if let Some(token) = cli.token {
        config.telegram.token = Some(token);
    }
    if cli.allow_groups {
        config.telegram.private_only = false;
    }
    if cli.keep_pending {
        config.telegram.drop_pending_updates = false;
    }

    if let Some(Command::ShowConfig) = cli.command {
        show_config(&config);
        return Ok(());
    }

    let Some(token) = config.telegram.token.clone() else {
        anyhow::bail!(
            "no bot token: pass --token, set TELEGRAM_BOT_TOKEN or add [telegram] token to the config file"
        );
    };

    let channel = TelegramChannel::new(token);
    channel
        .connect(
            config.telegram.drop_pending_updates,
            &SharedHandler::commands(),
        )
        .await?;
    let notifier: Arc<dyn Notifier> = Arc::new(channel.clone());

    let registry = ThrottleRegistry::new(&config.throttle);
    let reaper = registry.gate.spawn_reaper(config.throttle.reap_interval);
    let throttle = registry.middleware(
        Arc::clone(&notifier),
        &config.throttle,
        config.texts.clone(),
    );
    let feedback = throttle.feedback().clone();

    let handler = Arc::new(SharedHandler::new(
        Arc::clone(&notifier),
        config.texts.greeting.clone(),
    ));

    let mut dispatcher = Dispatcher::new(handler);
    if config.telegram.private_only {
        dispatcher = dispatcher.layer(Arc::new(PrivateChatMiddleware));
    }
    let dispatcher = dispatcher
        .layer(Arc::new(throttle))
        .layer(Arc::new(ErrorReportMiddleware::new(
            Arc::clone(&notifier),
            config.texts.error_notice.clone(),
        )))
        .layer(Arc::new(ActionLogMiddleware));

    let (tx, rx) = mpsc::channel(UPDATE_QUEUE);
    let poller = channel.start_polling(tx, config.telegram.poll_interval);

    tracing::info!(
        message_rate_limit = ?config.throttle.message_rate_limit,
        button_rate_limit = ?config.throttle.button_rate_limit,
        private_only = config.telegram.private_only,
        "throttle bot running"
    );

    tokio::select! {
        () = dispatcher.run(rx) => {
            tracing::warn!("update stream ended");
        }
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutting down");
        }
    }

    poller.abort();
    reaper.abort();
    feedback.shutdown().await;

    Ok(())
}

/// Print where configuration comes from and what it resolved to
fn show_config(config: &Config) {
    match config_file_path() {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: <no home directory>"),
    }

    let throttle = &config.throttle;
    println!("Message rate limit: {:?}", throttle.message_rate_limit);
    println!("Button rate limit: {:?}", throttle.button_rate_limit);
    println!("Tick ceiling: {:?}", throttle.tick_ceiling);
    println!("Finish threshold: {:?}", throttle.finish_threshold);
    println!("Reap interval: {:?}", throttle.reap_interval);
    println!("Private chats only: {}", config.telegram.private_only);
    println!(
        "Token: {}",
        if config.telegram.token.is_some() { "set" } else { "missing" }
    );
}
