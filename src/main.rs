//! Sticker User Bot - Main Entry Point
//!
//! A Telegram userbot that posts stickers to the groups it is in, reacts to
//! group messages and follows invite links on command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::{Input, Password};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use sticker_user_bot::automation::{StickerLoop, Toggles};
use sticker_user_bot::config::{BotSettings, TelegramConfig};
use sticker_user_bot::dispatch::Dispatcher;
use sticker_user_bot::store::StickerStore;
use sticker_user_bot::telegram::{TelegramBot, TelegramError, UpdateReceiver};

/// Telegram userbot that spreads stickers across groups.
#[derive(Parser, Debug)]
#[command(name = "sticker_bot")]
#[command(about = "Post random stickers to your Telegram groups")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Sticker store path, overriding `STICKER_STORE_PATH`.
    #[arg(short, long)]
    store: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    // Load configurations
    let tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;

    let mut settings = BotSettings::from_env().context("Invalid bot settings")?;
    if let Some(store) = args.store {
        settings.store_path = store;
    }

    if settings.sudo_users.is_empty() {
        warn!("SUDO_USERS is empty: nobody can run commands");
    }
    info!(
        "Loaded {} stickers from {}",
        StickerStore::new(&settings.store_path).len(),
        settings.store_path.display()
    );

    // Connect to Telegram
    let bot = TelegramBot::connect(&tg_config)
        .await
        .context("Failed to connect to Telegram")?;

    // Handle authentication if needed
    if !bot.is_authorized().await.context("Failed to check authorization")? {
        authenticate(&bot, &tg_config).await?;
    }

    let updates = bot
        .take_updates()
        .context("Update stream already taken")?;

    let bot = Arc::new(bot);
    let settings = Arc::new(settings);
    let toggles = Arc::new(Toggles::new());
    let shutdown = CancellationToken::new();

    let sticker_loop = StickerLoop::new(
        Arc::clone(&bot),
        &settings,
        Arc::clone(&toggles),
        shutdown.clone(),
    );
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&bot),
        Arc::clone(&settings),
        Arc::clone(&toggles),
        shutdown.clone(),
    ));

    info!("Starting sticker bot...");
    info!("Command prefix: {}", settings.command_prefix);

    // Spawn sticker loop task
    let loop_handle = tokio::spawn(async move {
        sticker_loop.run().await;
    });

    let workers = Arc::new(Semaphore::new(settings.workers));
    info!("Bot is running. Use Ctrl+C to stop.");

    tokio::select! {
        () = pump_updates(updates, dispatcher, Arc::clone(&workers)) => {
            warn!("Update stream closed");
        }
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
            info!("Received Ctrl+C, shutting down...");
        }
    }

    // Cleanup
    info!("Shutting down...");
    shutdown.cancel();
    if let Ok(limit) = u32::try_from(settings.workers) {
        // Every permit back means every in-flight handler has finished.
        let _drained = workers.acquire_many(limit).await;
    }
    if let Err(e) = loop_handle.await {
        error!("Sticker loop task failed: {}", e);
    }
    bot.disconnect();

    Ok(())
}

/// Feeds inbound messages to the dispatcher, one task per message, at most
/// as many at once as the semaphore has permits.
async fn pump_updates(
    mut updates: UpdateReceiver,
    dispatcher: Arc<Dispatcher<TelegramBot>>,
    workers: Arc<Semaphore>,
) {
    while let Some(message) = updates.next().await {
        let Ok(permit) = Arc::clone(&workers).acquire_owned().await else {
            break;
        };

        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            let _permit = permit;
            dispatcher.dispatch(&message).await;
        });
    }
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Handles Telegram authentication.
async fn authenticate(bot: &TelegramBot, config: &TelegramConfig) -> Result<()> {
    info!("Authentication required");

    let phone: String = Input::new()
        .with_prompt("Enter your phone number (with country code)")
        .interact_text()?;

    let token = bot
        .request_login_code(&phone, &config.api_hash)
        .await
        .context("Failed to request login code")?;

    info!("Login code sent to your Telegram app");

    let code: String = Input::new()
        .with_prompt("Enter the login code")
        .interact_text()?;

    match bot.sign_in(&token, &code).await {
        Ok(()) => {
            info!("Successfully signed in!");
            Ok(())
        }
        Err(TelegramError::PasswordRequired(password_token)) => {
            info!("Two-factor authentication is enabled");

            let hint = password_token.hint().unwrap_or("no hint");
            info!("Password hint: {}", hint);

            let password: String = Password::new()
                .with_prompt("Enter your 2FA password")
                .interact()?;

            bot.check_password(password_token, &password)
                .await
                .context("2FA authentication failed")?;

            info!("Successfully signed in with 2FA!");
            Ok(())
        }
        Err(e) => Err(e).context("Authentication failed"),
    }
}
