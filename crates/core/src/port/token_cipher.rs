// Token encryption port
//
// Keyed by a process-wide secret owned by the implementation.

use crate::error::Result;

/// Ciphertext plus the IV it was produced with (both base64)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedSecret {
    pub ciphertext: String,
    pub iv: String,
}

pub trait TokenCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<SealedSecret>;

    fn decrypt(&self, sealed: &SealedSecret) -> Result<String>;
}

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Reversible, NOT secure: reverses the text and tags it with a counter IV
    #[derive(Default)]
    pub struct ReversingCipher {
        counter: AtomicU64,
    }

    impl TokenCipher for ReversingCipher {
        fn encrypt(&self, plaintext: &str) -> Result<SealedSecret> {
            let iv = self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(SealedSecret {
                ciphertext: plaintext.chars().rev().collect(),
                iv: format!("iv-{}", iv),
            })
        }

        fn decrypt(&self, sealed: &SealedSecret) -> Result<String> {
            if !sealed.iv.starts_with("iv-") {
                return Err(AppError::Crypto("unknown iv".to_string()));
            }
            Ok(sealed.ciphertext.chars().rev().collect())
        }
    }
}
