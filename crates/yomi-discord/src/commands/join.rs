//! /join command - Join the author's voice channel

use tracing::info;

use crate::commands::{Context, songbird};
use crate::connection::join_voice;
use crate::error::{DiscordError, Result};

/// ボイスチャンネルに参加して、このチャンネルの発言を読み上げます
#[poise::command(slash_command, prefix_command, guild_only, rename = "join")]
pub async fn join(ctx: Context<'_>) -> Result<()> {
    let (guild_id, voice_channel) = {
        let guild = ctx.guild().ok_or(DiscordError::GuildOnly)?;
        let channel = guild
            .voice_states
            .get(&ctx.author().id)
            .and_then(|state| state.channel_id);
        (guild.id, channel)
    };
    let voice_channel = voice_channel.ok_or(DiscordError::NotInVoiceChannel)?;

    info!("{} requested join in guild {}", ctx.author().name, guild_id);

    let data = ctx.data();
    let manager = songbird(ctx).await?;
    join_voice(
        &manager,
        &data.relay,
        &data.watched,
        guild_id,
        voice_channel,
        ctx.channel_id(),
    )
    .await?;
    data.idle.cancel(guild_id.get());

    ctx.say("接続しました").await?;
    Ok(())
}
