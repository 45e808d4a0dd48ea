// Devdash Infrastructure - System Adapters
// Implements: TokenCipher

pub mod token_cipher;

pub use token_cipher::AesGcmTokenCipher;
