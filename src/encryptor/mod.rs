//! The `Encryptor` interface used exclusively for encrypted settings.

#[cfg(feature = "encrypted")]
mod aes_gcm;

#[cfg(feature = "encrypted")]
pub use aes_gcm::AesGcmEncryptor;

use crate::error::Result;

/// An opaque string-to-string transformer pair. Concrete encryption
/// algorithms are an external collaborator; this crate only consumes the
/// trait (plus, behind the `encrypted` feature, one reference
/// implementation so the crate is runnable standalone).
pub trait Encryptor: Send + Sync {
    /// Encrypt `plaintext`. Implementations must return `None` for `None`.
    ///
    /// # Errors
    /// Returns an error if encryption fails or this encryptor is
    /// decrypt-only.
    fn encrypt(&self, plaintext: Option<&str>) -> Result<Option<String>>;

    /// Decrypt `ciphertext`. Implementations must return `None` for `None`.
    ///
    /// # Errors
    /// Returns an error if `ciphertext` cannot be decrypted.
    fn decrypt(&self, ciphertext: Option<&str>) -> Result<Option<String>>;

    /// Whether this encryptor can decrypt (a write-only/encrypt-only
    /// encryptor would return `false`).
    fn can_decrypt(&self) -> bool;
}

/// Run the one-time round-trip identity check the factory requires of every
/// configured encryptor: `decrypt(encrypt(s)) == s` for a representative
/// random string.
///
/// # Errors
/// Returns [`crate::error::Error::EncryptorRoundTripFailed`] if the
/// encryptor does not round-trip, and
/// [`crate::error::Error::EncryptorError`] if either step fails outright.
pub fn verify_round_trip(encryptor: &dyn Encryptor, probe: &str) -> Result<()> {
    if !encryptor.can_decrypt() {
        return Err(crate::error::Error::EncryptorError(
            "encryptor cannot decrypt; round-trip check requires a read/write encryptor".into(),
        ));
    }
    let ciphertext = encryptor
        .encrypt(Some(probe))?
        .ok_or_else(|| crate::error::Error::EncryptorError("encrypt(Some) returned None".into()))?;
    let plaintext = encryptor.decrypt(Some(&ciphertext))?;
    if plaintext.as_deref() != Some(probe) {
        return Err(crate::error::Error::EncryptorRoundTripFailed(probe.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Trivial reversible encryptor for exercising the round-trip contract
    /// without pulling in a real cipher.
    struct ReverseEncryptor {
        calls: Mutex<u32>,
    }

    impl Encryptor for ReverseEncryptor {
        fn encrypt(&self, plaintext: Option<&str>) -> Result<Option<String>> {
            *self.calls.lock().unwrap() += 1;
            Ok(plaintext.map(|s| s.chars().rev().collect()))
        }

        fn decrypt(&self, ciphertext: Option<&str>) -> Result<Option<String>> {
            Ok(ciphertext.map(|s| s.chars().rev().collect()))
        }

        fn can_decrypt(&self) -> bool {
            true
        }
    }

    #[test]
    fn round_trip_succeeds_for_well_behaved_encryptor() {
        let enc = ReverseEncryptor { calls: Mutex::new(0) };
        verify_round_trip(&enc, "probe-value").unwrap();
    }

    #[test]
    fn none_maps_to_none() {
        let enc = ReverseEncryptor { calls: Mutex::new(0) };
        assert_eq!(enc.encrypt(None).unwrap(), None);
        assert_eq!(enc.decrypt(None).unwrap(), None);
    }

    #[test]
    fn decrypt_only_encryptor_fails_round_trip_check() {
        struct DecryptOnly;
        impl Encryptor for DecryptOnly {
            fn encrypt(&self, _plaintext: Option<&str>) -> Result<Option<String>> {
                Err(crate::error::Error::EncryptorError("encrypt-only disabled".into()))
            }
            fn decrypt(&self, ciphertext: Option<&str>) -> Result<Option<String>> {
                Ok(ciphertext.map(str::to_string))
            }
            fn can_decrypt(&self) -> bool {
                false
            }
        }
        assert!(verify_round_trip(&DecryptOnly, "x").is_err());
    }
}
