//! Encryption at rest for persisted records
//!
//! Records are AES-256-CBC with PKCS#7 padding and a fresh random 16-byte IV,
//! encoded as `iv_hex:ciphertext_hex`.

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::{Error, Result};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES-256 key length in bytes
pub const KEY_LEN: usize = 32;
/// CBC IV length in bytes
pub const IV_LEN: usize = 16;

/// Encrypts and decrypts store records
#[derive(Clone)]
pub struct RecordCipher {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl std::fmt::Debug for RecordCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordCipher").finish_non_exhaustive()
    }
}

impl RecordCipher {
    /// Create a cipher from raw key bytes
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self {
            key: Zeroizing::new(key),
        }
    }

    /// Create a cipher from a 64-character hex key
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            hex::decode(key_hex.trim())
                .map_err(|e| Error::Config(format!("ENCRYPTION_KEY is not valid hex: {}", e)))?,
        );
        let key: [u8; KEY_LEN] = bytes.as_slice().try_into().map_err(|_| {
            Error::Config(format!(
                "ENCRYPTION_KEY must be {} bytes ({} hex chars), got {} bytes",
                KEY_LEN,
                KEY_LEN * 2,
                bytes.len()
            ))
        })?;
        Ok(Self::new(key))
    }

    /// Encrypt a record with a fresh random IV
    pub fn encrypt(&self, plaintext: &[u8]) -> String {
        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let ciphertext = Aes256CbcEnc::new((&*self.key).into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        format!("{}:{}", hex::encode(iv), hex::encode(ciphertext))
    }

    /// Decrypt a record, failing on anything that is not a valid `iv:ciphertext` pair
    pub fn try_decrypt(&self, record: &str) -> Result<Vec<u8>> {
        let (iv_hex, ciphertext_hex) = record
            .trim()
            .split_once(':')
            .ok_or_else(|| Error::Crypto("missing IV separator".to_string()))?;

        let iv = hex::decode(iv_hex).map_err(|e| Error::Crypto(format!("invalid IV: {}", e)))?;
        let iv: [u8; IV_LEN] = iv
            .as_slice()
            .try_into()
            .map_err(|_| Error::Crypto(format!("IV must be {} bytes", IV_LEN)))?;
        let ciphertext = hex::decode(ciphertext_hex)
            .map_err(|e| Error::Crypto(format!("invalid ciphertext: {}", e)))?;

        Aes256CbcDec::new((&*self.key).into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|e| Error::Crypto(format!("decryption failed: {}", e)))
    }

    /// Decrypt a record, returning the input bytes unchanged if it is not one.
    ///
    /// Files written before encryption was introduced are plain JSON and load
    /// through this path.
    pub fn decrypt(&self, record: &str) -> Vec<u8> {
        self.try_decrypt(record)
            .unwrap_or_else(|_| record.as_bytes().to_vec())
    }
}
