//! At-rest encryption for the `sin_e` column.
//!
//! Values are sealed with ChaCha20-Poly1305 under a single 32-byte key and
//! stored as base64(nonce ‖ ciphertext). A fresh nonce is drawn for every
//! write, so equal SINs never produce equal column values.

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use chacha20poly1305::{
  ChaCha20Poly1305, Key, Nonce,
  aead::{Aead, AeadCore, KeyInit, OsRng},
};

use crate::{Error, Result};

const NONCE_LEN: usize = 12;

#[derive(Clone)]
pub struct SinCipher {
  key: Key,
}

impl std::fmt::Debug for SinCipher {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("SinCipher(..)")
  }
}

impl SinCipher {
  pub const KEY_LEN: usize = 32;

  pub fn new(key: [u8; Self::KEY_LEN]) -> Self { Self { key: Key::clone_from_slice(&key) } }

  /// Build from a base64-encoded 32-byte key (the `sin_key` setting).
  pub fn from_base64(encoded: &str) -> Result<Self> {
    let bytes = B64
      .decode(encoded.trim())
      .map_err(|e| Error::Cipher(format!("sin key is not base64: {e}")))?;
    let key: [u8; Self::KEY_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
      Error::Cipher(format!("sin key must be {} bytes, got {}", Self::KEY_LEN, b.len()))
    })?;
    Ok(Self::new(key))
  }

  /// A cipher with a random key: for tests and throwaway stores.
  pub fn generate() -> Self {
    Self { key: ChaCha20Poly1305::generate_key(&mut OsRng) }
  }

  /// A new random key, base64-encoded for a config file.
  pub fn generate_key_base64() -> String {
    B64.encode(ChaCha20Poly1305::generate_key(&mut OsRng))
  }

  pub fn encrypt(&self, plaintext: &str) -> Result<String> {
    let cipher = ChaCha20Poly1305::new(&self.key);
    let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
    let sealed = cipher
      .encrypt(&nonce, plaintext.as_bytes())
      .map_err(|e| Error::Cipher(format!("encryption failed: {e}")))?;

    let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(B64.encode(out))
  }

  pub fn decrypt(&self, stored: &str) -> Result<String> {
    let bytes = B64
      .decode(stored)
      .map_err(|e| Error::Cipher(format!("stored value is not base64: {e}")))?;
    if bytes.len() < NONCE_LEN {
      return Err(Error::Cipher("stored value is truncated".into()));
    }
    let (nonce, sealed) = bytes.split_at(NONCE_LEN);

    let cipher = ChaCha20Poly1305::new(&self.key);
    let plain = cipher
      .decrypt(Nonce::from_slice(nonce), sealed)
      .map_err(|_| Error::Cipher("decryption failed (wrong key?)".into()))?;
    String::from_utf8(plain).map_err(|e| Error::Cipher(e.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn seal_and_open() {
    let c = SinCipher::generate();
    let stored = c.encrypt("123-456-789").unwrap();
    assert_ne!(stored, "123-456-789");
    assert_eq!(c.decrypt(&stored).unwrap(), "123-456-789");
  }

  #[test]
  fn nonces_differ_per_write() {
    let c = SinCipher::generate();
    assert_ne!(c.encrypt("123456789").unwrap(), c.encrypt("123456789").unwrap());
  }

  #[test]
  fn wrong_key_fails() {
    let stored = SinCipher::generate().encrypt("123456789").unwrap();
    assert!(matches!(SinCipher::generate().decrypt(&stored), Err(Error::Cipher(_))));
  }

  #[test]
  fn base64_key_roundtrip() {
    let key = SinCipher::generate_key_base64();
    let a = SinCipher::from_base64(&key).unwrap();
    let b = SinCipher::from_base64(&key).unwrap();
    assert_eq!(b.decrypt(&a.encrypt("42").unwrap()).unwrap(), "42");
  }

  #[test]
  fn short_key_rejected() {
    assert!(SinCipher::from_base64(&B64.encode([0u8; 16])).is_err());
    assert!(SinCipher::from_base64("not base64!").is_err());
  }
}
