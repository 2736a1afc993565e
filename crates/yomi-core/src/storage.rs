//! Encrypted JSON key-value files

use serde::{Serialize, de::DeserializeOwned};
use std::path::PathBuf;
use tracing::{debug, error, warn};

use crate::crypto::RecordCipher;
use crate::{Error, Result};

/// Stores each named mapping as one encrypted JSON file under a directory
#[derive(Debug, Clone)]
pub struct EncryptedStore {
    dir: PathBuf,
    cipher: RecordCipher,
}

impl EncryptedStore {
    /// Create a store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>, cipher: RecordCipher) -> Self {
        Self {
            dir: dir.into(),
            cipher,
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Serialize, encrypt and write a mapping
    pub async fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        let record = self.cipher.encrypt(json.as_bytes());

        if !self.dir.as_os_str().is_empty() {
            tokio::fs::create_dir_all(&self.dir).await?;
        }
        tokio::fs::write(self.path(name), record)
            .await
            .map_err(|e| Error::Storage(format!("Failed to write {}: {}", name, e)))?;

        debug!("Saved {}", name);
        Ok(())
    }

    /// Read and decrypt a mapping.
    ///
    /// A missing file is created holding an empty mapping. Unreadable or
    /// corrupt files yield `T::default()`; the next `save` overwrites them.
    pub async fn load<T>(&self, name: &str) -> T
    where
        T: Serialize + DeserializeOwned + Default,
    {
        match self.try_load(name).await {
            Ok(Some(data)) => data,
            Ok(None) => {
                let empty = T::default();
                if let Err(e) = self.save(name, &empty).await {
                    warn!("Failed to create {}: {}", name, e);
                }
                empty
            }
            Err(e) => {
                error!("{}の読み込みエラー: {}", name, e);
                T::default()
            }
        }
    }

    async fn try_load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.path(name);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&path).await?;
        let json = self.cipher.decrypt(&content);
        Ok(Some(serde_json::from_slice(&json)?))
    }
}
