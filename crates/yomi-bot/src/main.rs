//! yomi-bot: Discord 読み上げBot Main Binary
//!
//! Usage:
//!   yomi-bot             - Start the bot
//!   yomi-bot --help      - Show help
//!   yomi-bot --version   - Show version

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use yomi_core::{Config, EncryptedStore, Preferences};
use yomi_discord::YomiBot;
use yomi_voice::{SpeechRelay, build_synthesizer};

/// Run mode
enum RunMode {
    /// Run the bot
    Bot,
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match parse_args() {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("yomi-bot {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Bot => {}
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    // Missing token or key is fatal
    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting yomi-bot...");
    tracing::info!(
        "TTS backend: {:?}, chunk size: {}, max length: {}",
        config.tts.backend,
        config.playback.chunk_size,
        config.playback.max_text_length
    );

    let store = EncryptedStore::new(&config.storage.data_dir, config.cipher()?);
    let prefs = Arc::new(Preferences::load(store).await);

    let synthesizer = build_synthesizer(&config.tts)
        .map_err(|e| anyhow::anyhow!("Failed to create TTS client: {}", e))?;
    let relay = Arc::new(SpeechRelay::new(synthesizer, prefs, &config)?);

    let bot = YomiBot::new(config, relay.clone());
    let mut handle = tokio::spawn(async move { bot.start().await });

    tracing::info!("Press Ctrl+C to exit");

    tokio::select! {
        result = &mut handle => {
            match result {
                Ok(Ok(())) => tracing::info!("Discord bot stopped"),
                Ok(Err(e)) => {
                    relay.shutdown().await;
                    return Err(e);
                }
                Err(e) => {
                    relay.shutdown().await;
                    return Err(anyhow::anyhow!("Discord bot task failed: {}", e));
                }
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Shutting down...");
            handle.abort();
        }
    }

    relay.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Parse command line arguments
fn parse_args() -> RunMode {
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Bot
}

/// Print help message
fn print_help() {
    println!("yomi-bot - Discord text-to-speech reading bot");
    println!();
    println!("Usage:");
    println!("  yomi-bot             Start the bot");
    println!("  yomi-bot --help      Show this help message");
    println!("  yomi-bot --version   Show version");
    println!();
    println!("Configuration is read from yomi.toml when present, then from the environment.");
    println!();
    println!("Environment Variables:");
    println!("  DISCORD_TOKEN        Discord bot token (required)");
    println!("  ENCRYPTION_KEY       64 hex chars, AES-256 key for stored data (required)");
    println!("  GUILD_ID             Register slash commands in this guild only");
    println!("  COMMAND_PREFIX       Prefix for text commands (default: !)");
    println!("  DATA_DIR             Directory for dictionary and user settings (default: .)");
    println!("  TTS_BACKEND          voicevox or google (default: voicevox)");
    println!("  VOICEVOX_URL         VOICEVOX engine (default: http://127.0.0.1:50021)");
    println!("  VOICEVOX_SPEED_SCALE Speaking speed override");
    println!("  GOOGLE_TTS_LANG      Google TTS language (default: ja)");
    println!("  DEFAULT_SPEAKER      Speaker ID for users without a choice (default: 3)");
    println!("  SYNTHESIS_RETRIES    Extra attempts per failed chunk (default: 0)");
    println!("  CHUNK_SIZE           Characters per synthesis request (default: 20)");
    println!("  MAX_TEXT_LENGTH      Characters read per message (default: 100)");
    println!("  QUEUE_CAPACITY       Queued segments per guild (default: 64)");
    println!("  QUEUE_OVERFLOW       drop-newest or drop-oldest (default: drop-newest)");
    println!("  IDLE_DISCONNECT_SECS Leave after this long alone (default: 10)");
}
