//! yomi-core: 読み上げBotのコアライブラリ
//!
//! 設定の読み込み、暗号化ストレージ、辞書とユーザー設定、
//! 読み上げ用テキストの正規化を提供します。

pub mod config;
pub mod crypto;
pub mod error;
pub mod prefs;
pub mod storage;
pub mod text;

pub use config::{Config, DiscordConfig, OverflowPolicy, PlaybackConfig, StorageConfig, TtsBackend, TtsConfig};
pub use crypto::RecordCipher;
pub use error::{Error, Result};
pub use prefs::{Dictionary, Preferences, UserVoices};
pub use storage::EncryptedStore;
pub use text::TextNormalizer;
