//! Joining and leaving voice channels

use dashmap::DashMap;
use serenity::all::{ChannelId, GuildId};
use songbird::Songbird;
use std::sync::Arc;
use tracing::{info, warn};

use yomi_voice::SpeechRelay;

use crate::error::Result;
use crate::sink::SongbirdSink;

/// Guild → text channel whose messages are read aloud
pub type WatchedChannels = DashMap<GuildId, ChannelId>;

/// Join `voice` and start reading `text` in it
pub async fn join_voice(
    manager: &Songbird,
    relay: &SpeechRelay,
    watched: &WatchedChannels,
    guild_id: GuildId,
    voice: ChannelId,
    text: ChannelId,
) -> Result<()> {
    let call = manager.join(guild_id, voice).await?;
    relay.connect(guild_id.get(), Arc::new(SongbirdSink::new(call)));
    watched.insert(guild_id, text);

    info!("Joined voice channel {} in guild {} (reading {})", voice, guild_id, text);
    Ok(())
}

/// Reset the guild's session and leave its voice channel.
///
/// Returns `false` if the bot was not connected.
pub async fn leave_voice(
    manager: &Songbird,
    relay: &SpeechRelay,
    watched: &WatchedChannels,
    guild_id: GuildId,
) -> Result<bool> {
    watched.remove(&guild_id);
    let had_session = relay.disconnect(guild_id.get()).await;

    let had_call = manager.get(guild_id).is_some();
    if had_call {
        if let Err(e) = manager.remove(guild_id).await {
            warn!("Failed to leave voice channel in guild {}: {}", guild_id, e);
            return Err(e.into());
        }
    }

    if had_session || had_call {
        info!("Left voice channel in guild {}", guild_id);
    }
    Ok(had_session || had_call)
}
