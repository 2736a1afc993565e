//! /voice command - Choose the author's reading voice

use tracing::info;

use yomi_voice::{character_list, resolve_character};

use crate::commands::Context;
use crate::error::{DiscordError, Result};

/// 読み上げに使うキャラクターを変更します
#[poise::command(slash_command, prefix_command, rename = "voice")]
pub async fn voice(
    ctx: Context<'_>,
    #[description = "キャラクター名"]
    #[rest]
    character: Option<String>,
) -> Result<()> {
    let Some(name) = character.as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
        ctx.say(format!("使えるキャラクター: {}", character_list()))
            .await?;
        return Ok(());
    };

    let speaker = resolve_character(name).ok_or_else(|| DiscordError::UnknownCharacter {
        name: name.to_string(),
        available: character_list(),
    })?;

    ctx.data()
        .relay
        .set_voice(ctx.author().id.get(), speaker)
        .await?;
    info!("{} now reads as {} ({})", ctx.author().name, name, speaker);

    ctx.say(format!("声を{}に変更しました", name)).await?;
    Ok(())
}
