//! /leave command - Leave the voice channel

use crate::commands::{Context, songbird};
use crate::connection::leave_voice;
use crate::error::{DiscordError, Result};

/// ボイスチャンネルから退出します
#[poise::command(slash_command, prefix_command, guild_only, rename = "leave")]
pub async fn leave(ctx: Context<'_>) -> Result<()> {
    let guild_id = ctx.guild_id().ok_or(DiscordError::GuildOnly)?;
    let data = ctx.data();
    let manager = songbird(ctx).await?;

    data.idle.cancel(guild_id.get());
    if !leave_voice(&manager, &data.relay, &data.watched, guild_id).await? {
        return Err(DiscordError::NotConnected);
    }

    ctx.say("切断しました").await?;
    Ok(())
}
