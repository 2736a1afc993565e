//! Discord Bot implementation using poise and Songbird

use anyhow::Result;
use serenity::all::{ClientBuilder, GatewayIntents, GuildId};
use songbird::SerenityInit;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use yomi_core::Config;
use yomi_voice::{IdleTimers, SpeechRelay};

use crate::commands::{Data, Error, get_commands};
use crate::connection::WatchedChannels;
use crate::error::DiscordError;
use crate::handler;

/// Reading bot for Discord voice channels
pub struct YomiBot {
    config: Config,
    relay: Arc<SpeechRelay>,
}

impl YomiBot {
    /// Create a new bot around a shared relay
    pub fn new(config: Config, relay: Arc<SpeechRelay>) -> Self {
        Self { config, relay }
    }

    /// Start the Discord bot
    pub async fn start(&self) -> Result<()> {
        let token = self
            .config
            .discord
            .token
            .clone()
            .ok_or(DiscordError::TokenNotSet)?;

        // Set up gateway intents
        // - GUILDS: guild and voice state cache
        // - GUILD_MESSAGES / MESSAGE_CONTENT: read chat (privileged intent)
        // - GUILD_VOICE_STATES: voice joins/leaves for songbird and idle detection
        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
            | GatewayIntents::GUILD_VOICE_STATES;

        let data = Data {
            relay: self.relay.clone(),
            watched: Arc::new(WatchedChannels::new()),
            idle: IdleTimers::new(Duration::from_secs(
                self.config.playback.idle_disconnect_secs,
            )),
            prefix: self.config.discord.prefix.clone(),
        };
        let guild_id = self.config.discord.guild_id.map(GuildId::new);

        let framework = poise::Framework::builder()
            .options(poise::FrameworkOptions {
                commands: get_commands(),
                prefix_options: poise::PrefixFrameworkOptions {
                    prefix: Some(self.config.discord.prefix.clone()),
                    ..Default::default()
                },
                event_handler: |ctx, event, framework, data| {
                    Box::pin(handler::event_handler(ctx, event, framework, data))
                },
                on_error: |error| Box::pin(on_error(error)),
                ..Default::default()
            })
            .setup(move |ctx, _ready, framework| {
                Box::pin(async move {
                    let commands = &framework.options().commands;
                    match guild_id {
                        Some(guild_id) => {
                            poise::builtins::register_in_guild(ctx, commands, guild_id).await?;
                            info!("Registered {} commands in guild {}", commands.len(), guild_id);
                        }
                        None => {
                            poise::builtins::register_globally(ctx, commands).await?;
                            info!("Registered {} commands globally", commands.len());
                        }
                    }
                    Ok(data)
                })
            })
            .build();

        info!("Starting Discord bot...");

        let mut client = ClientBuilder::new(token, intents)
            .framework(framework)
            .register_songbird()
            .await?;

        client.start().await?;

        Ok(())
    }
}

/// Reply to misuse, log everything else
async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            if error.is_user_error() {
                debug!("/{} rejected: {}", ctx.command().name, error);
            } else {
                error!("/{} failed: {}", ctx.command().name, error);
            }

            let reply = if error.is_user_error() {
                error.to_string()
            } else {
                format!("エラーが発生しました: {}", error)
            };
            if let Err(e) = ctx.say(reply).await {
                warn!("Failed to send reply: {:?}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}
