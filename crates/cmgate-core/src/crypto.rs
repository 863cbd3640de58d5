//! Passphrase-keyed secret encryption.
//!
//! Used to keep the management-plane password and the directory-plane client
//! secret out of configuration files in clear text. Keys are derived with
//! PBKDF2-HMAC-SHA256 and values are sealed with AES-256-GCM, encoded as
//! `base64(nonce || ciphertext || tag)`.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;

/// Salt applied when the caller does not supply one.
pub const DEFAULT_SALT: &str = "c395641a-ea04-4b6f-8d2d-b07a5b3e08be";

const KEY_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;
const PBKDF2_ROUNDS: u32 = 10_000;

/// Errors from [`SecretCipher`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("ciphertext is not valid base64: {0}")]
    InvalidEncoding(String),

    #[error("ciphertext too short: {0} bytes")]
    TooShort(usize),

    /// Wrong key or tampered ciphertext. GCM never yields plaintext in this case.
    #[error("decryption failed")]
    DecryptionFailed,

    #[error("decrypted value is not UTF-8")]
    InvalidUtf8,
}

/// Symmetric cipher keyed from a passphrase.
#[derive(Clone)]
pub struct SecretCipher {
    key: [u8; KEY_LENGTH],
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}

impl SecretCipher {
    /// Derives the key from `passphrase` and the default salt.
    #[must_use]
    pub fn new(passphrase: &str) -> Self {
        Self::with_salt(passphrase, DEFAULT_SALT)
    }

    #[must_use]
    pub fn with_salt(passphrase: &str, salt: &str) -> Self {
        let mut key = [0u8; KEY_LENGTH];
        pbkdf2::pbkdf2_hmac::<Sha256>(
            passphrase.as_bytes(),
            salt.as_bytes(),
            PBKDF2_ROUNDS,
            &mut key,
        );
        Self { key }
    }

    /// Encrypts `plaintext` under a fresh random nonce.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        use rand::rngs::OsRng;
        use rand::RngCore;

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(sealed))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, CryptoError> {
        let sealed = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;

        if sealed.len() < NONCE_LENGTH + TAG_LENGTH {
            return Err(CryptoError::TooShort(sealed.len()));
        }

        let cipher =
            Aes256Gcm::new_from_slice(&self.key).map_err(|_| CryptoError::DecryptionFailed)?;
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LENGTH);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
    }
}

/// Salted, iterated SHA-512 digest of `text`, base64 encoded.
///
/// Each round hashes `DEFAULT_SALT + previous`, starting from `text`, and runs
/// `rounds + 1` times.
#[must_use]
pub fn sha512_hash(text: &str, rounds: u32) -> String {
    let mut current = text.to_string();
    for _ in 0..=rounds {
        let digest = Sha512::digest(format!("{DEFAULT_SALT}{current}").as_bytes());
        current = STANDARD.encode(digest);
    }
    current
}
