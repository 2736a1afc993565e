//! Reading dictionary and per-user voice preferences

use indexmap::IndexMap;
use std::collections::HashMap;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{info, warn};

use crate::storage::EncryptedStore;
use crate::{Error, Result};

/// Store file holding the reading dictionary
pub const DICTIONARY_FILE: &str = "dictionary.json";
/// Store file holding user voice choices
pub const USER_SETTINGS_FILE: &str = "user_settings.json";

/// Word → reading, applied in insertion order
pub type Dictionary = IndexMap<String, String>;

/// User ID → speaker ID
pub type UserVoices = HashMap<String, u32>;

/// Persisted preferences shared by every guild
pub struct Preferences {
    store: EncryptedStore,
    dictionary: RwLock<Dictionary>,
    user_voices: RwLock<UserVoices>,
}

impl Preferences {
    /// Load both mappings from the store
    pub async fn load(store: EncryptedStore) -> Self {
        let dictionary: Dictionary = store.load(DICTIONARY_FILE).await;
        let user_voices: UserVoices = store.load(USER_SETTINGS_FILE).await;
        info!(
            "データを読み込みました: {} words, {} user voices",
            dictionary.len(),
            user_voices.len()
        );

        Self {
            store,
            dictionary: RwLock::new(dictionary),
            user_voices: RwLock::new(user_voices),
        }
    }

    /// Read access to the dictionary
    pub async fn dictionary(&self) -> RwLockReadGuard<'_, Dictionary> {
        self.dictionary.read().await
    }

    /// Add or replace a dictionary entry and persist it
    pub async fn add_word(&self, word: &str, reading: &str) -> Result<()> {
        if word.is_empty() {
            return Err(Error::Other("word must not be empty".to_string()));
        }

        let mut dictionary = self.dictionary.write().await;
        dictionary.insert(word.to_string(), reading.to_string());
        self.store.save(DICTIONARY_FILE, &*dictionary).await.inspect_err(|e| {
            warn!("Failed to persist dictionary: {}", e);
        })
    }

    /// Speaker chosen by a user, if any
    pub async fn voice_for(&self, user_id: u64) -> Option<u32> {
        self.user_voices
            .read()
            .await
            .get(&user_id.to_string())
            .copied()
    }

    /// Record a user's speaker and persist it
    pub async fn set_voice(&self, user_id: u64, speaker: u32) -> Result<()> {
        let mut voices = self.user_voices.write().await;
        voices.insert(user_id.to_string(), speaker);
        self.store.save(USER_SETTINGS_FILE, &*voices).await.inspect_err(|e| {
            warn!("Failed to persist user settings: {}", e);
        })
    }
}
