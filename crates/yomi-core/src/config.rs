//! Configuration management
//!
//! 設定は以下の優先順位で読み込まれます:
//! 1. 環境変数
//! 2. yomi.toml 設定ファイル
//! 3. デフォルト値
//!
//! 設定ファイル内では `${VAR_NAME}` 形式で環境変数を展開できます。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

use crate::crypto::RecordCipher;
use crate::{Error, Result};

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "yomi.toml";

/// Which speech synthesis engine to use
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TtsBackend {
    /// Local VOICEVOX engine (two-phase HTTP API)
    #[default]
    Voicevox,
    /// Google Translate TTS endpoint
    Google,
}

impl FromStr for TtsBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "voicevox" => Ok(Self::Voicevox),
            "google" | "google-tts" | "googletts" => Ok(Self::Google),
            other => Err(Error::Config(format!("Unknown TTS backend: {}", other))),
        }
    }
}

/// What to do when the playback queue is full
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Reject the segment being enqueued
    #[default]
    DropNewest,
    /// Evict the head of the queue to make room
    DropOldest,
}

impl FromStr for OverflowPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "drop-newest" | "newest" => Ok(Self::DropNewest),
            "drop-oldest" | "oldest" => Ok(Self::DropOldest),
            other => Err(Error::Config(format!("Unknown overflow policy: {}", other))),
        }
    }
}

/// Discord configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token
    pub token: Option<String>,

    /// Register slash commands to this guild only (immediate), globally otherwise
    pub guild_id: Option<u64>,

    /// Prefix for legacy text commands
    pub prefix: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: None,
            guild_id: None,
            prefix: "!".to_string(),
        }
    }
}

/// Encrypted storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// AES-256 key, 64 hex characters
    pub encryption_key: Option<String>,

    /// Directory holding dictionary.json and user_settings.json
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            encryption_key: None,
            data_dir: PathBuf::from("."),
        }
    }
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub backend: TtsBackend,

    /// VOICEVOX engine base URL
    pub voicevox_url: String,

    /// Overrides `speedScale` in the VOICEVOX audio query
    pub speed_scale: Option<f64>,

    /// Google Translate host
    pub google_host: String,

    /// Google TTS language
    pub google_lang: String,

    /// Speaker used when the author has no preference
    pub default_speaker: u32,

    /// Extra attempts per chunk after a failed synthesis (0 = drop immediately)
    pub retries: u32,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            backend: TtsBackend::Voicevox,
            voicevox_url: default_voicevox_url(),
            speed_scale: None,
            google_host: default_google_host(),
            google_lang: "ja".to_string(),
            default_speaker: 3,
            retries: 0,
        }
    }
}

/// Chunking and playback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Maximum characters per synthesis call
    pub chunk_size: usize,

    /// Messages longer than this are truncated with an ellipsis marker
    pub max_text_length: usize,

    /// Maximum queued audio segments per session
    pub queue_capacity: usize,

    pub overflow: OverflowPolicy,

    /// Leave the voice channel after this many seconds without listeners
    pub idle_disconnect_secs: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            chunk_size: 20,
            max_text_length: 100,
            queue_capacity: 64,
            overflow: OverflowPolicy::DropNewest,
            idle_disconnect_secs: 10,
        }
    }
}

fn default_voicevox_url() -> String {
    "http://127.0.0.1:50021".to_string()
}

fn default_google_host() -> String {
    "https://translate.google.com".to_string()
}

/// Main configuration for yomi
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub discord: DiscordConfig,
    pub storage: StorageConfig,
    pub tts: TtsConfig,
    pub playback: PlaybackConfig,
}

impl Config {
    /// 設定ファイルから環境変数を展開する
    ///
    /// `${VAR_NAME}` 形式の文字列を環境変数の値に置換します。
    /// 環境変数が存在しない場合は空文字列になります。
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // '{' を消費

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// TOML 文字列から設定を構築する (環境変数展開込み)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let expanded = Self::expand_env_vars(content);
        toml::from_str(&expanded).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// TOML 設定ファイルから設定を読み込む
    ///
    /// 読み込み後、環境変数で上書きします (環境変数が優先)。
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&content)?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// デフォルトパスから設定を読み込む
    ///
    /// `./yomi.toml` があればそれを使い、なければ環境変数のみ。
    pub fn load() -> Result<Self> {
        if Path::new(CONFIG_FILE).exists() {
            return Self::from_toml_file(CONFIG_FILE);
        }

        Ok(Self::from_env())
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg
    }

    /// 環境変数で設定を上書きする
    fn apply_env_overrides(&mut self) {
        // Discord
        if let Some(token) = non_empty_var("DISCORD_TOKEN") {
            self.discord.token = Some(token);
        }
        if let Some(id) = parsed_var("GUILD_ID") {
            self.discord.guild_id = Some(id);
        }
        if let Some(prefix) = non_empty_var("COMMAND_PREFIX") {
            self.discord.prefix = prefix;
        }

        // Storage
        if let Some(key) = non_empty_var("ENCRYPTION_KEY") {
            self.storage.encryption_key = Some(key);
        }
        if let Some(dir) = non_empty_var("DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }

        // TTS
        if let Some(backend) = parsed_var("TTS_BACKEND") {
            self.tts.backend = backend;
        }
        if let Some(url) = non_empty_var("VOICEVOX_URL") {
            self.tts.voicevox_url = url;
        }
        if let Some(scale) = parsed_var("VOICEVOX_SPEED_SCALE") {
            self.tts.speed_scale = Some(scale);
        }
        if let Some(host) = non_empty_var("GOOGLE_TTS_HOST") {
            self.tts.google_host = host;
        }
        if let Some(lang) = non_empty_var("GOOGLE_TTS_LANG") {
            self.tts.google_lang = lang;
        }
        if let Some(speaker) = parsed_var("DEFAULT_SPEAKER") {
            self.tts.default_speaker = speaker;
        }
        if let Some(retries) = parsed_var("SYNTHESIS_RETRIES") {
            self.tts.retries = retries;
        }

        // Playback
        if let Some(size) = parsed_var("CHUNK_SIZE") {
            self.playback.chunk_size = size;
        }
        if let Some(len) = parsed_var("MAX_TEXT_LENGTH") {
            self.playback.max_text_length = len;
        }
        if let Some(cap) = parsed_var("QUEUE_CAPACITY") {
            self.playback.queue_capacity = cap;
        }
        if let Some(policy) = parsed_var("QUEUE_OVERFLOW") {
            self.playback.overflow = policy;
        }
        if let Some(secs) = parsed_var("IDLE_DISCONNECT_SECS") {
            self.playback.idle_disconnect_secs = secs;
        }
    }

    /// Check the settings the bot cannot start without
    pub fn validate(&self) -> Result<()> {
        if self.discord.token.as_deref().is_none_or(str::is_empty) {
            return Err(Error::Config("DISCORD_TOKEN not set".to_string()));
        }

        self.cipher()?;

        if self.playback.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than 0".to_string()));
        }
        if self.playback.max_text_length == 0 {
            return Err(Error::Config(
                "max_text_length must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the record cipher from the configured key
    pub fn cipher(&self) -> Result<RecordCipher> {
        let key = self
            .storage
            .encryption_key
            .as_deref()
            .ok_or_else(|| Error::Config("ENCRYPTION_KEY not set".to_string()))?;
        RecordCipher::from_hex(key)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parsed_var<T: FromStr>(name: &str) -> Option<T> {
    let raw = non_empty_var(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid value for {}: {}", name, raw);
            None
        }
    }
}
