//! Secret cipher using AES-256-GCM
//!
//! Encrypts and decrypts single string secrets with the process-wide master
//! key. Encryption is randomized: every call draws a fresh 12-byte nonce,
//! and the stored blob is self-describing (`nonceHex:cipherHex`, with the
//! 16-byte authentication tag appended to the cipher segment). Because the
//! mode is authenticated, decryption under the wrong key fails instead of
//! returning garbage.
//!
//! ## Key material
//!
//! `SENTINELA_MASTER_KEY` may hold either a base64-encoded 32-byte key or
//! an arbitrary passphrase, which is deterministically hashed (SHA-256)
//! into 32 bytes of key material at startup.

use crate::config::EncryptionConfig;
use crate::errors::{Error, Result};
use base64::Engine;
use ring::aead::{self, Aad, BoundKey, Nonce, NonceSequence, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use zeroize::Zeroize;

/// Size of AES-256-GCM nonce in bytes
const NONCE_SIZE: usize = 12;

/// Size of AES-256-GCM tag in bytes
const TAG_SIZE: usize = 16;

/// Single-use nonce sequence for AES-GCM
struct SingleNonce {
    nonce: Option<[u8; NONCE_SIZE]>,
}

impl SingleNonce {
    fn new(nonce_bytes: [u8; NONCE_SIZE]) -> Self {
        Self { nonce: Some(nonce_bytes) }
    }
}

impl NonceSequence for SingleNonce {
    fn advance(&mut self) -> std::result::Result<Nonce, ring::error::Unspecified> {
        self.nonce.take().map(Nonce::assume_unique_for_key).ok_or(ring::error::Unspecified)
    }
}

/// Secret encryption/decryption service
#[derive(Clone)]
pub struct SecretCipher {
    key_bytes: Arc<[u8; 32]>,
    rng: Arc<SystemRandom>,
}

impl SecretCipher {
    /// Create a cipher from the startup configuration
    pub fn new(config: &EncryptionConfig) -> Result<Self> {
        Self::from_material(&config.master_key)
    }

    /// Derive a cipher from raw key material.
    ///
    /// Accepts a base64-encoded 32-byte key; anything else is treated as an
    /// operator passphrase and hashed into fixed-length key material.
    pub fn from_material(material: &str) -> Result<Self> {
        if material.trim().is_empty() {
            return Err(Error::config("Encryption key material must not be empty"));
        }

        let mut key_array = [0u8; 32];
        match base64::engine::general_purpose::STANDARD.decode(material) {
            Ok(mut raw) if raw.len() == 32 => {
                key_array.copy_from_slice(&raw);
                raw.zeroize();
            }
            _ => {
                let digest = Sha256::digest(material.as_bytes());
                key_array.copy_from_slice(&digest);
            }
        }

        Ok(Self { key_bytes: Arc::new(key_array), rng: Arc::new(SystemRandom::new()) })
    }

    /// Encrypt a plaintext secret into a `nonceHex:cipherHex` blob.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| Error::internal("Failed to generate random nonce for encryption"))?;

        let unbound_key = UnboundKey::new(&AES_256_GCM, &*self.key_bytes)
            .map_err(|_| Error::internal("Failed to create encryption key"))?;

        let nonce_sequence = SingleNonce::new(nonce_bytes);
        let mut sealing_key = aead::SealingKey::new(unbound_key, nonce_sequence);

        let mut ciphertext = plaintext.as_bytes().to_vec();
        ciphertext.reserve(TAG_SIZE);

        sealing_key
            .seal_in_place_append_tag(Aad::empty(), &mut ciphertext)
            .map_err(|_| Error::internal("Failed to encrypt secret data"))?;

        Ok(format!("{}:{}", hex::encode(nonce_bytes), hex::encode(&ciphertext)))
    }

    /// Decrypt a `nonceHex:cipherHex` blob back into the plaintext secret.
    ///
    /// Fails with [`Error::Decryption`] when the blob is malformed, when
    /// GCM authentication fails (wrong key or tampered data), or when the
    /// decrypted bytes are not valid UTF-8.
    pub fn decrypt(&self, blob: &str) -> Result<String> {
        let (nonce_bytes, ciphertext) = parse_blob(blob)?;

        let unbound_key = UnboundKey::new(&AES_256_GCM, &*self.key_bytes)
            .map_err(|_| Error::internal("Failed to create decryption key"))?;

        let nonce_sequence = SingleNonce::new(nonce_bytes);
        let mut opening_key = aead::OpeningKey::new(unbound_key, nonce_sequence);

        let mut buffer = ciphertext;
        let decrypted = opening_key.open_in_place(Aad::empty(), &mut buffer).map_err(|_| {
            Error::decryption("Authentication failed - wrong key or corrupted ciphertext")
        })?;

        String::from_utf8(decrypted.to_vec())
            .map_err(|_| Error::decryption("Decrypted secret is not valid UTF-8"))
    }
}

/// Split and decode a stored blob into its nonce and ciphertext parts.
fn parse_blob(blob: &str) -> Result<([u8; NONCE_SIZE], Vec<u8>)> {
    let (nonce_hex, cipher_hex) = blob
        .split_once(':')
        .ok_or_else(|| Error::decryption("Malformed ciphertext blob: expected nonce:cipher"))?;

    let nonce = hex::decode(nonce_hex)
        .map_err(|_| Error::decryption("Malformed ciphertext blob: nonce segment is not hex"))?;
    if nonce.len() != NONCE_SIZE {
        return Err(Error::decryption(format!(
            "Malformed ciphertext blob: nonce must be {} bytes, got {}",
            NONCE_SIZE,
            nonce.len()
        )));
    }

    let ciphertext = hex::decode(cipher_hex)
        .map_err(|_| Error::decryption("Malformed ciphertext blob: cipher segment is not hex"))?;
    if ciphertext.len() < TAG_SIZE {
        return Err(Error::decryption(
            "Malformed ciphertext blob: cipher segment is missing the authentication tag",
        ));
    }

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    nonce_bytes.copy_from_slice(&nonce);
    Ok((nonce_bytes, ciphertext))
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher").field("key_bytes", &"[REDACTED]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> SecretCipher {
        SecretCipher::from_material("frase-secreta-de-teste").unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = test_cipher();
        let plaintext = "Secr3t!";

        let blob = cipher.encrypt(plaintext).unwrap();

        assert_ne!(blob, plaintext);
        assert!(blob.contains(':'));

        let decrypted = cipher.decrypt(&blob).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let cipher = test_cipher();
        let plaintext = "same-plaintext";

        let blob1 = cipher.encrypt(plaintext).unwrap();
        let blob2 = cipher.encrypt(plaintext).unwrap();

        assert_ne!(blob1, blob2);
        assert_eq!(cipher.decrypt(&blob1).unwrap(), plaintext);
        assert_eq!(cipher.decrypt(&blob2).unwrap(), plaintext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let cipher = test_cipher();
        let other = SecretCipher::from_material("outra-frase-secreta").unwrap();

        let blob = cipher.encrypt("sensitive-data").unwrap();
        let result = other.decrypt(&blob);

        assert!(matches!(result, Err(Error::Decryption(_))));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let cipher = test_cipher();
        let blob = cipher.encrypt("sensitive-data").unwrap();

        // Flip a nibble inside the cipher segment
        let (nonce_hex, cipher_hex) = blob.split_once(':').unwrap();
        let mut chars: Vec<char> = cipher_hex.chars().collect();
        chars[0] = if chars[0] == '0' { '1' } else { '0' };
        let tampered = format!("{}:{}", nonce_hex, chars.into_iter().collect::<String>());

        assert!(matches!(cipher.decrypt(&tampered), Err(Error::Decryption(_))));
    }

    #[test]
    fn test_malformed_blob_variants() {
        let cipher = test_cipher();

        for blob in [
            "",
            "no-separator",
            "zz:0011",
            "0011:zz",
            "0011:0011223344556677",
            &format!("{}:{}", "00".repeat(NONCE_SIZE), "00".repeat(TAG_SIZE - 1)),
        ] {
            assert!(
                matches!(cipher.decrypt(blob), Err(Error::Decryption(_))),
                "blob {:?} should fail as decryption error",
                blob
            );
        }
    }

    #[test]
    fn test_base64_key_material_accepted() {
        let key = base64::engine::general_purpose::STANDARD.encode([0x42u8; 32]);
        let cipher = SecretCipher::from_material(&key).unwrap();

        let blob = cipher.encrypt("abc").unwrap();
        assert_eq!(cipher.decrypt(&blob).unwrap(), "abc");
    }

    #[test]
    fn test_passphrase_derivation_is_deterministic() {
        let a = SecretCipher::from_material("mesma-frase").unwrap();
        let b = SecretCipher::from_material("mesma-frase").unwrap();

        let blob = a.encrypt("valor").unwrap();
        assert_eq!(b.decrypt(&blob).unwrap(), "valor");
    }

    #[test]
    fn test_empty_material_rejected() {
        assert!(matches!(SecretCipher::from_material("  "), Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_plaintext() {
        let cipher = test_cipher();
        let blob = cipher.encrypt("").unwrap();
        assert_eq!(cipher.decrypt(&blob).unwrap(), "");
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", test_cipher());
        assert!(rendered.contains("[REDACTED]"));
    }
}
