//! Photolock - PIN Hashing
//!
//! Current scheme: Argon2i with a salt bound to the per-install device
//! identifier. Legacy scheme: salted SHA-256, kept only so the migrator can
//! verify and upgrade old vaults. The plaintext PIN is never persisted.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{LockError, LockResult};

/// Argon2i output length
const HASH_LEN: usize = 32;

/// Argon2i memory cost (KiB)
const ARGON2_MEMORY_KIB: u32 = 19 * 1024;

/// Argon2i time cost
const ARGON2_TIME_COST: u32 = 2;

/// Argon2i lanes
const ARGON2_PARALLELISM: u32 = 1;

/// A persisted PIN hash with its salt. Hex-encoded at rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashedPin {
    pub hash: Vec<u8>,
    pub salt: Vec<u8>,
}

impl HashedPin {
    pub fn hash_hex(&self) -> String {
        hex::encode(&self.hash)
    }

    pub fn salt_hex(&self) -> String {
        hex::encode(&self.salt)
    }

    pub fn from_hex(hash: &str, salt: &str) -> LockResult<Self> {
        Ok(Self {
            hash: hex::decode(hash).map_err(|e| LockError::Serialization(e.to_string()))?,
            salt: hex::decode(salt).map_err(|e| LockError::Serialization(e.to_string()))?,
        })
    }
}

/// Generate a fresh salt bound to the device identifier.
///
/// `salt = SHA-256(device_id || 16 random bytes)` - random per PIN-set, but
/// not portable to another install.
pub fn generate_device_salt(device_id: &[u8]) -> Vec<u8> {
    let mut random = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut random);

    let mut hasher = Sha256::new();
    hasher.update(device_id);
    hasher.update(random);
    hasher.finalize().to_vec()
}

fn argon2() -> Argon2<'static> {
    let params = Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_TIME_COST,
        ARGON2_PARALLELISM,
        Some(HASH_LEN),
    )
    .expect("static Argon2 params are valid");
    Argon2::new(Algorithm::Argon2i, Version::V0x13, params)
}

/// Hash a PIN with the current (Argon2i) scheme over the given salt.
pub fn hash_pin(pin: &str, salt: &[u8]) -> LockResult<Vec<u8>> {
    let mut out = vec![0u8; HASH_LEN];
    argon2()
        .hash_password_into(pin.as_bytes(), salt, &mut out)
        .map_err(|e| LockError::KeyDerivationFailed(e.to_string()))?;
    Ok(out)
}

/// Hash a PIN and generate a device-bound salt for it.
pub fn hash_new_pin(pin: &str, device_id: &[u8]) -> LockResult<HashedPin> {
    let salt = generate_device_salt(device_id);
    let hash = hash_pin(pin, &salt)?;
    Ok(HashedPin { hash, salt })
}

/// Verify a PIN against a current-scheme hash in constant time.
pub fn verify_pin(pin: &str, hashed: &HashedPin) -> LockResult<bool> {
    let candidate = hash_pin(pin, &hashed.salt)?;
    Ok(candidate.ct_eq(&hashed.hash).into())
}

// ═══════════════════════════════════════════════════════════════════════════
// Legacy scheme (migration source only)
// ═══════════════════════════════════════════════════════════════════════════

/// Legacy hash: `SHA-256(salt || pin)`. Migration source only.
pub fn hash_pin_legacy(pin: &str, salt: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(pin.as_bytes());
    hasher.finalize().to_vec()
}

/// Verify a PIN against a legacy-scheme hash in constant time.
pub fn verify_pin_legacy(pin: &str, hashed: &HashedPin) -> bool {
    hash_pin_legacy(pin, &hashed.salt).ct_eq(&hashed.hash).into()
}
