//! /add command - Register a reading in the dictionary

use tracing::info;

use crate::commands::Context;
use crate::error::Result;

/// 辞書に読み方を登録します
#[poise::command(slash_command, prefix_command, rename = "add")]
pub async fn add(
    ctx: Context<'_>,
    #[description = "単語"] word: String,
    #[description = "読み方"] reading: String,
) -> Result<()> {
    ctx.data().relay.add_word(&word, &reading).await?;
    info!("Dictionary entry added by {}: {} -> {}", ctx.author().name, word, reading);

    ctx.say(format!("「{}」を「{}」と読むようにしました", word, reading))
        .await?;
    Ok(())
}
