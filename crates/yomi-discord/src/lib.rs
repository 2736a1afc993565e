//! yomi-discord: Discord 読み上げBot
//!
//! テキストチャンネルの発言をボイスチャンネルで読み上げます。
//! poise 0.6 でコマンドを、Songbird 0.4 で音声送信を扱います。

pub mod bot;
pub mod commands;
pub mod connection;
pub mod error;
pub mod handler;
pub mod sink;

pub use bot::YomiBot;
pub use error::{DiscordError, Result};
pub use sink::SongbirdSink;
