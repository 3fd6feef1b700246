//! AES-256-GCM reference [`Encryptor`](super::Encryptor) implementation.
//!
//! Mirrors the key-derivation and AEAD handling of this crate's sibling
//! encrypted-storage code: Argon2id password stretching, a random 12-byte
//! nonce per call, base64-opaque ciphertext. Suitable for tests and for
//! deployments without an external KMS.

use super::Encryptor;
use crate::error::{Error, Result};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use rand::Rng;

/// AES-256-GCM encryptor. Ciphertext is `base64(nonce || ciphertext)`.
pub struct AesGcmEncryptor {
    cipher: Aes256Gcm,
}

impl AesGcmEncryptor {
    /// Build from a raw 32-byte key.
    ///
    /// # Errors
    /// Returns an error if `key` is not a valid AES-256 key (it always is,
    /// at 32 bytes, but the underlying constructor is fallible).
    pub fn new(key: &[u8; 32]) -> Result<Self> {
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|_| Error::EncryptorError("invalid key length".into()))?;
        Ok(Self { cipher })
    }

    /// Derive a key from a password with Argon2id and build an encryptor.
    ///
    /// # Errors
    /// Returns an error if key derivation fails.
    pub fn from_password(password: &str, salt: &[u8; 16]) -> Result<Self> {
        let key = Self::derive_key(password, salt)?;
        Self::new(&key)
    }

    #[must_use]
    pub fn generate_key() -> [u8; 32] {
        rand::rng().random()
    }

    #[must_use]
    pub fn generate_salt() -> [u8; 16] {
        rand::rng().random()
    }

    /// Derive a 32-byte key from a password using Argon2id.
    ///
    /// # Errors
    /// Returns an error if salt encoding or hashing fails.
    pub fn derive_key(password: &str, salt: &[u8; 16]) -> Result<[u8; 32]> {
        use argon2::Argon2;
        use argon2::password_hash::{PasswordHasher, SaltString};

        let salt_string = SaltString::encode_b64(salt)
            .map_err(|e| Error::EncryptorError(format!("invalid salt bytes: {e}")))?;
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt_string)
            .map_err(|e| Error::EncryptorError(format!("argon2 hashing failed: {e}")))?;
        let output = hash
            .hash
            .ok_or_else(|| Error::EncryptorError("hash output missing".into()))?;
        let bytes = output.as_bytes();
        if bytes.len() < 32 {
            return Err(Error::EncryptorError(format!(
                "argon2 output too short: {}",
                bytes.len()
            )));
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes[..32]);
        Ok(key)
    }
}

impl Encryptor for AesGcmEncryptor {
    fn encrypt(&self, plaintext: Option<&str>) -> Result<Option<String>> {
        let Some(plaintext) = plaintext else {
            return Ok(None);
        };
        let nonce_bytes: [u8; 12] = rand::rng().random();
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| Error::EncryptorError(format!("encryption failed: {e}")))?;

        let mut blob = Vec::with_capacity(nonce_bytes.len() + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(Some(base64::engine::general_purpose::STANDARD.encode(blob)))
    }

    fn decrypt(&self, ciphertext: Option<&str>) -> Result<Option<String>> {
        let Some(ciphertext) = ciphertext else {
            return Ok(None);
        };
        let blob = base64::engine::general_purpose::STANDARD
            .decode(ciphertext)
            .map_err(|e| Error::EncryptorError(format!("invalid ciphertext encoding: {e}")))?;
        if blob.len() < 12 {
            return Err(Error::EncryptorError("ciphertext too short".into()));
        }
        let (nonce_bytes, ct) = blob.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = self
            .cipher
            .decrypt(nonce, ct)
            .map_err(|_| Error::EncryptorError("decryption failed (wrong key?)".into()))?;
        String::from_utf8(plaintext)
            .map(Some)
            .map_err(|e| Error::EncryptorError(format!("invalid utf-8: {e}")))
    }

    fn can_decrypt(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryptor::verify_round_trip;

    #[test]
    fn round_trips_plaintext() {
        let key = AesGcmEncryptor::generate_key();
        let enc = AesGcmEncryptor::new(&key).unwrap();
        let ciphertext = enc.encrypt(Some("hello world")).unwrap().unwrap();
        assert_ne!(ciphertext, "hello world");
        assert_eq!(enc.decrypt(Some(&ciphertext)).unwrap().as_deref(), Some("hello world"));
    }

    #[test]
    fn passes_the_factory_round_trip_check() {
        let key = AesGcmEncryptor::generate_key();
        let enc = AesGcmEncryptor::new(&key).unwrap();
        verify_round_trip(&enc, "a random probe string").unwrap();
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let enc1 = AesGcmEncryptor::new(&AesGcmEncryptor::generate_key()).unwrap();
        let enc2 = AesGcmEncryptor::new(&AesGcmEncryptor::generate_key()).unwrap();
        let ciphertext = enc1.encrypt(Some("secret")).unwrap().unwrap();
        assert!(enc2.decrypt(Some(&ciphertext)).is_err());
    }

    #[test]
    fn same_password_and_salt_derive_same_key() {
        let salt = AesGcmEncryptor::generate_salt();
        let k1 = AesGcmEncryptor::derive_key("hunter2", &salt).unwrap();
        let k2 = AesGcmEncryptor::derive_key("hunter2", &salt).unwrap();
        assert_eq!(k1, k2);
    }
}
