//! yomi-voice: speech pipeline for the reading bot
//!
//! This crate turns normalized chat text into audio and plays it through a
//! voice connection, one segment at a time.
//!
//! ## Features
//!
//! - **Chunking**: fixed-length, character-safe splitting of long messages
//! - **Text-to-Speech**: VOICEVOX engine and Google Translate TTS
//! - **Playback**: bounded FIFO queue drained by a per-connection player
//! - **Sessions**: one pipeline per guild, with idle auto-disconnect timers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use yomi_core::{Config, EncryptedStore, Preferences};
//! use yomi_voice::{SpeechRelay, build_synthesizer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load()?;
//!     let store = EncryptedStore::new(&config.storage.data_dir, config.cipher()?);
//!     let prefs = Arc::new(Preferences::load(store).await);
//!
//!     let synthesizer = build_synthesizer(&config.tts)?;
//!     let relay = SpeechRelay::new(synthesizer, prefs, &config)?;
//!
//!     relay.connect(guild_id, sink);
//!     relay.submit(guild_id, author_id, "こんにちは").await?;
//!     Ok(())
//! }
//! ```

pub mod characters;
pub mod chunker;
pub mod error;
pub mod google;
pub mod idle;
pub mod player;
pub mod queue;
pub mod relay;
pub mod session;
pub mod tts;
pub mod voicevox;

#[cfg(test)]
mod testing;

pub use characters::{CHARACTERS, character_list, resolve_character};
pub use chunker::chunk_text;
pub use error::{Result, VoiceError};
pub use google::GoogleTtsClient;
pub use idle::IdleTimers;
pub use player::{AudioSink, PlayerDriver, PlayerState};
pub use queue::{PlaybackQueue, PushOutcome};
pub use relay::SpeechRelay;
pub use session::{SessionOptions, SubmitReport, VoiceSession};
pub use tts::{AudioFormat, AudioSegment, SpeakerId, SpeechSynthesizer, build_synthesizer};
pub use voicevox::VoicevoxClient;
