//! Discord event handler implementation using poise Framework

use serenity::all::{ActivityData, ChannelId, FullEvent, GuildId, Message, UserId, VoiceState};
use serenity::prelude::Context;
use serenity::utils::{ContentSafeOptions, content_safe};
use tracing::{debug, info, warn};

use crate::commands::{Data, Error};
use crate::connection::leave_voice;
use crate::error::Result;

/// Presence shown while the bot is online
const ACTIVITY: &str = "みんなの会話";

/// poise event hook
pub async fn event_handler(
    ctx: &Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<()> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!("{} としてログインしました", data_about_bot.user.name);
            ctx.set_activity(Some(ActivityData::listening(ACTIVITY)));
        }
        FullEvent::Message { new_message } => {
            handle_message(ctx, new_message, data).await?;
        }
        FullEvent::VoiceStateUpdate { new, .. } => {
            handle_voice_state(ctx, new, data).await?;
        }
        _ => {}
    }
    Ok(())
}

/// Whether a message gets read: human author, not a command, posted in the
/// guild's watched channel
fn should_read(
    is_bot: bool,
    content: &str,
    prefix: &str,
    channel: ChannelId,
    watched: Option<ChannelId>,
) -> bool {
    !is_bot && !content.starts_with(prefix) && watched == Some(channel)
}

/// Read messages posted in a guild's watched channel
pub async fn handle_message(ctx: &Context, msg: &Message, data: &Data) -> Result<()> {
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };
    let watched = data.watched.get(&guild_id).map(|channel| *channel);
    if !should_read(
        msg.author.bot,
        &msg.content,
        &data.prefix,
        msg.channel_id,
        watched,
    ) {
        return Ok(());
    }

    let text = content_safe(
        &ctx.cache,
        &msg.content,
        &ContentSafeOptions::default(),
        &msg.mentions,
    );

    if let Some(report) = data
        .relay
        .submit(guild_id.get(), msg.author.id.get(), &text)
        .await?
    {
        debug!("Read message {} in guild {}: {:?}", msg.id, guild_id, report);
    }
    Ok(())
}

/// Human members sharing `channel`, given each voice state's channel and bot flag
fn humans_in(channel: ChannelId, states: impl IntoIterator<Item = (Option<ChannelId>, bool)>) -> usize {
    states
        .into_iter()
        .filter(|&(state_channel, is_bot)| state_channel == Some(channel) && !is_bot)
        .count()
}

/// Bot's voice channel and the number of humans in it, from the cache
fn occupancy(ctx: &Context, guild_id: GuildId, bot_id: UserId) -> Option<(ChannelId, usize)> {
    let guild = ctx.cache.guild(guild_id)?;
    let channel = guild.voice_states.get(&bot_id)?.channel_id?;

    let states = guild.voice_states.values().map(|state| {
        let is_bot = state
            .member
            .as_ref()
            .map(|member| member.user.bot)
            .or_else(|| guild.members.get(&state.user_id).map(|m| m.user.bot))
            .unwrap_or(false);
        (state.channel_id, is_bot)
    });
    Some((channel, humans_in(channel, states)))
}

/// Arm or cancel the idle disconnect when voice channel membership changes
pub async fn handle_voice_state(ctx: &Context, state: &VoiceState, data: &Data) -> Result<()> {
    let Some(guild_id) = state.guild_id else {
        return Ok(());
    };
    if !data.relay.is_connected(guild_id.get()) {
        data.idle.cancel(guild_id.get());
        return Ok(());
    }

    let bot_id = ctx.cache.current_user().id;
    let Some(manager) = songbird::get(ctx).await else {
        return Ok(());
    };

    match occupancy(ctx, guild_id, bot_id) {
        // Disconnected from outside (kicked or channel deleted)
        None if state.user_id == bot_id => {
            data.idle.cancel(guild_id.get());
            info!("Voice connection lost in guild {}", guild_id);
            leave_voice(&manager, &data.relay, &data.watched, guild_id).await?;
        }
        None => {}
        Some((channel, 0)) => {
            let relay = data.relay.clone();
            let watched = data.watched.clone();
            if data.idle.arm(guild_id.get(), move || async move {
                info!("Nobody left in guild {}, disconnecting", guild_id);
                if let Err(e) = leave_voice(&manager, &relay, &watched, guild_id).await {
                    warn!("Auto disconnect failed in guild {}: {}", guild_id, e);
                }
            }) {
                debug!("Voice channel {} is empty, idle timer armed", channel);
            }
        }
        Some(_) => {
            if data.idle.cancel(guild_id.get()) {
                debug!("Listener returned in guild {}, idle timer cancelled", guild_id);
            }
        }
    }
    Ok(())
}
