//! Optional authenticated message encryption.
//!
//! Disabled by default (the wire protocol relays plaintext JSON). When
//! enabled, a process-lifetime AES-256-GCM key wraps a payload with a
//! random 96-bit nonce; the nonce is prepended to the ciphertext so
//! decryption needs only the combined blob and the key.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("ciphertext shorter than nonce")]
    Truncated,
    #[error("decryption failed")]
    DecryptionFailed,
}

pub struct MessageCipher {
    cipher: Aes256Gcm,
}

impl MessageCipher {
    /// Generates a random process-lifetime key.
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    pub fn from_key_bytes(bytes: &[u8; 32]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(bytes);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut nonce_bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .expect("AES-GCM encryption of a bounded in-memory payload cannot fail");

        let mut out = Vec::with_capacity(12 + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        out
    }

    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if blob.len() < 12 {
            return Err(CryptoError::Truncated);
        }
        let (nonce_bytes, ciphertext) = blob.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);
        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let cipher = MessageCipher::generate();
        let blob = cipher.encrypt(b"hello partner");
        let plaintext = cipher.decrypt(&blob).unwrap();
        assert_eq!(plaintext, b"hello partner");
    }

    #[test]
    fn two_encryptions_of_the_same_plaintext_differ() {
        let cipher = MessageCipher::generate();
        let a = cipher.encrypt(b"same message");
        let b = cipher.encrypt(b"same message");
        assert_ne!(a, b);
    }

    #[test]
    fn tampered_ciphertext_fails_to_decrypt() {
        let cipher = MessageCipher::generate();
        let mut blob = cipher.encrypt(b"hello");
        let last = blob.len() - 1;
        blob[last] ^= 0xff;
        assert!(cipher.decrypt(&blob).is_err());
    }

    #[test]
    fn truncated_blob_is_rejected() {
        let cipher = MessageCipher::generate();
        assert!(matches!(
            cipher.decrypt(&[0u8; 4]),
            Err(CryptoError::Truncated)
        ));
    }
}
