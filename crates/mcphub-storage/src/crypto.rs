//! Field-level encryption for sensitive data.
//!
//! Uses AES-256-GCM for authenticated encryption of sensitive fields
//! like client secrets and tokens before storing in the database.

use anyhow::{Context, Result};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the encryption key (32 bytes = 256 bits).
pub const KEY_SIZE: usize = 32;

/// Size of the nonce (12 bytes for AES-GCM).
const NONCE_SIZE: usize = 12;

/// Master key material, wiped from memory on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_SIZE]);

impl MasterKey {
    /// Parse a key from its 64-character hex form.
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let bytes = hex::decode(hex_key.trim()).context("Master key is not valid hex")?;
        let key: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            anyhow::anyhow!(
                "Master key must be {} bytes ({} hex characters)",
                KEY_SIZE,
                KEY_SIZE * 2
            )
        })?;
        Ok(Self(key))
    }

    /// Generate a fresh random key.
    pub fn generate() -> Result<Self> {
        let rng = SystemRandom::new();
        let mut key = [0u8; KEY_SIZE];
        rng.fill(&mut key)
            .map_err(|_| anyhow::anyhow!("Failed to generate random key"))?;
        Ok(Self(key))
    }

    /// Hex form suitable for storing in configuration.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Encryptor for sensitive field data.
pub struct FieldEncryptor {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl FieldEncryptor {
    /// Create a new encryptor with the given master key.
    pub fn new(master_key: &MasterKey) -> Result<Self> {
        let unbound_key = UnboundKey::new(&AES_256_GCM, &master_key.0)
            .map_err(|_| anyhow::anyhow!("Failed to create encryption key"))?;
        let key = LessSafeKey::new(unbound_key);
        let rng = SystemRandom::new();

        Ok(Self { key, rng })
    }

    /// Encrypt a plaintext string.
    ///
    /// Returns the ciphertext as a hex-encoded string (nonce + ciphertext + tag).
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| anyhow::anyhow!("Failed to generate nonce"))?;

        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        // Encrypt in-place
        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| anyhow::anyhow!("Encryption failed"))?;

        // Prepend nonce to ciphertext
        let mut result = nonce_bytes.to_vec();
        result.extend_from_slice(&in_out);

        Ok(hex::encode(result))
    }

    /// Decrypt a hex-encoded ciphertext string.
    ///
    /// Expects format: hex(nonce + ciphertext + tag)
    pub fn decrypt(&self, ciphertext_hex: &str) -> Result<String> {
        let ciphertext = hex::decode(ciphertext_hex).context("Invalid hex encoding")?;

        if ciphertext.len() < NONCE_SIZE + AES_256_GCM.tag_len() {
            anyhow::bail!("Ciphertext too short");
        }

        // Extract nonce and ciphertext
        let (nonce_bytes, encrypted) = ciphertext.split_at(NONCE_SIZE);
        let nonce_array: [u8; NONCE_SIZE] = nonce_bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("Invalid nonce"))?;
        let nonce = Nonce::assume_unique_for_key(nonce_array);

        // Decrypt in-place
        let mut in_out = encrypted.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| anyhow::anyhow!("Decryption failed - wrong key or corrupted data"))?;

        String::from_utf8(plaintext.to_vec()).context("Decrypted data is not valid UTF-8")
    }
}
