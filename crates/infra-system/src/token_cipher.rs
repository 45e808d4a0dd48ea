// AES-256-GCM token cipher

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use devdash_core::error::{AppError, Result};
use devdash_core::port::{SealedSecret, TokenCipher};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

pub struct AesGcmTokenCipher {
    cipher: Aes256Gcm,
}

impl AesGcmTokenCipher {
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_LEN {
            return Err(AppError::Config(format!(
                "token key must be {} bytes, got {}",
                KEY_LEN,
                key.len()
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| AppError::Config(format!("invalid token key: {}", e)))?;
        Ok(Self { cipher })
    }

    /// Key given as standard base64 (the form it takes in config)
    pub fn from_base64_key(encoded: &str) -> Result<Self> {
        let key = STANDARD
            .decode(encoded.trim())
            .map_err(|e| AppError::Config(format!("token key is not valid base64: {}", e)))?;
        Self::new(&key)
    }

    /// Fresh random key, base64 encoded
    pub fn generate_key() -> String {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        STANDARD.encode(key)
    }
}

impl TokenCipher for AesGcmTokenCipher {
    fn encrypt(&self, plaintext: &str) -> Result<SealedSecret> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| AppError::Crypto("encryption failed".to_string()))?;

        Ok(SealedSecret {
            ciphertext: STANDARD.encode(ciphertext),
            iv: STANDARD.encode(nonce),
        })
    }

    fn decrypt(&self, sealed: &SealedSecret) -> Result<String> {
        let nonce = STANDARD
            .decode(&sealed.iv)
            .map_err(|e| AppError::Crypto(format!("iv is not valid base64: {}", e)))?;
        if nonce.len() != NONCE_LEN {
            return Err(AppError::Crypto(format!(
                "iv must be {} bytes, got {}",
                NONCE_LEN,
                nonce.len()
            )));
        }
        let ciphertext = STANDARD
            .decode(&sealed.ciphertext)
            .map_err(|e| AppError::Crypto(format!("ciphertext is not valid base64: {}", e)))?;

        // Wrong key and tampered ciphertext look the same to GCM
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| {
                debug!("Token authentication tag mismatch");
                AppError::Crypto("decryption failed".to_string())
            })?;

        String::from_utf8(plaintext)
            .map_err(|_| AppError::Crypto("decrypted token is not UTF-8".to_string()))
    }
}
