//! Slash and prefix commands (poise implementation)

mod add;
mod join;
mod leave;
mod voice;

use std::sync::Arc;

use yomi_voice::{IdleTimers, SpeechRelay};

use crate::connection::WatchedChannels;

/// User data stored and accessible in all command invocations
pub struct Data {
    pub relay: Arc<SpeechRelay>,
    pub watched: Arc<WatchedChannels>,
    pub idle: IdleTimers,
    pub prefix: String,
}

/// Error type for commands
pub type Error = crate::error::DiscordError;

/// Command context
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Export commands for registration
pub use add::add;
pub use join::join;
pub use leave::leave;
pub use voice::voice;

/// Get all commands for registration
pub fn get_commands() -> Vec<poise::Command<Data, Error>> {
    vec![join(), leave(), voice(), add()]
}

/// The songbird manager registered on the client
pub(crate) async fn songbird(ctx: Context<'_>) -> crate::error::Result<Arc<songbird::Songbird>> {
    songbird::get(ctx.serenity_context())
        .await
        .ok_or(crate::error::DiscordError::VoiceUnavailable)
}
