//! エラー型定義 (yomi-discord)

use thiserror::Error;

/// yomi-discord のエラー型
#[derive(Error, Debug)]
pub enum DiscordError {
    #[error("Discord token not set")]
    TokenNotSet,

    #[error("先にボイスチャンネルに参加してください")]
    NotInVoiceChannel,

    #[error("ボイスチャンネルに接続していません")]
    NotConnected,

    #[error("「{name}」というキャラクターはいません（使えるキャラクター: {available}）")]
    UnknownCharacter { name: String, available: String },

    #[error("このコマンドはサーバー内でのみ使えます")]
    GuildOnly,

    #[error("Voice client not initialized")]
    VoiceUnavailable,

    #[error("Failed to join voice channel: {0}")]
    Join(#[from] songbird::error::JoinError),

    #[error("Serenity error: {0}")]
    SerenityError(#[from] serenity::Error),

    #[error(transparent)]
    Core(#[from] yomi_core::Error),

    #[error(transparent)]
    Voice(#[from] yomi_voice::VoiceError),
}

impl DiscordError {
    /// Errors caused by how the command was used, answered to the user
    /// rather than logged as faults
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::NotInVoiceChannel | Self::NotConnected | Self::UnknownCharacter { .. } | Self::GuildOnly
        )
    }
}

/// Result 型エイリアス
pub type Result<T> = std::result::Result<T, DiscordError>;
