//! X25519 key pair generation and encoding.

use crate::error::{CryptoError, CryptoResult};
use base64::{engine::general_purpose::STANDARD, Engine};
use crypto_box::{PublicKey, SecretKey};
use rand::RngCore;
use zeroize::Zeroize;

/// Size of X25519 keys in bytes.
pub const KEY_SIZE: usize = 32;

/// The client's tunnel identity.
#[derive(Clone)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generates a fresh random key pair.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        let secret = SecretKey::from(bytes);
        bytes.zeroize();
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Restores a key pair from its base64-encoded private key.
    pub fn from_private_base64(encoded: &str) -> CryptoResult<Self> {
        let mut bytes = decode_key(encoded)?;
        let secret = SecretKey::from(bytes);
        bytes.zeroize();
        let public = secret.public_key();
        Ok(Self { secret, public })
    }

    /// Returns the private key as base64.
    pub fn private_key_base64(&self) -> String {
        let mut bytes = self.secret.to_bytes();
        let encoded = STANDARD.encode(bytes);
        bytes.zeroize();
        encoded
    }

    /// Returns the public key as base64.
    pub fn public_key_base64(&self) -> String {
        STANDARD.encode(self.public.as_bytes())
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public_key_base64())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Derives the base64 public key that belongs to a base64 private key.
pub fn public_key_from_private(encoded_private: &str) -> CryptoResult<String> {
    Ok(KeyPair::from_private_base64(encoded_private)?.public_key_base64())
}

fn decode_key(encoded: &str) -> CryptoResult<[u8; KEY_SIZE]> {
    let mut raw = STANDARD
        .decode(encoded.trim())
        .map_err(|e| CryptoError::Encoding(e.to_string()))?;

    if raw.len() != KEY_SIZE {
        let actual = raw.len();
        raw.zeroize();
        return Err(CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual,
        });
    }

    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(&raw);
    raw.zeroize();
    Ok(bytes)
}
