//! Photolock - Hardware Keystore Capability
//!
//! Abstracts the platform hardware keystore: generate-or-fetch a named
//! AES-GCM key (optionally requesting dedicated secure-element backing) and
//! wrap/unwrap small blobs under it. Keystore calls are blocking and may take
//! tens of milliseconds on real hardware; callers keep them off UI threads.

use std::collections::HashMap;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use parking_lot::RwLock;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::LockError;

/// Hardware security tier, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityLevel {
    /// Dedicated secure-element chip
    SecureElement,
    /// Trusted execution environment
    Tee,
    /// No hardware key store
    Software,
}

impl SecurityLevel {
    pub fn is_hardware(self) -> bool {
        !matches!(self, SecurityLevel::Software)
    }
}

/// Keystore failure, distinguishable so the probe can degrade one tier at a
/// time instead of giving up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeystoreError {
    /// Secure-element backing was requested but is not present; retry
    /// without the flag.
    SecureElementUnavailable,
    /// No hardware key store at all.
    KeystoreUnavailable,
    /// Named key missing.
    KeyNotFound(String),
    /// AEAD tag mismatch on unwrap.
    BadTag,
}

impl From<KeystoreError> for LockError {
    fn from(e: KeystoreError) -> Self {
        match e {
            KeystoreError::BadTag => LockError::CorruptKeyMaterial,
            KeystoreError::SecureElementUnavailable => {
                LockError::HardwareUnavailable("secure element unavailable".into())
            }
            KeystoreError::KeystoreUnavailable => {
                LockError::HardwareUnavailable("keystore unavailable".into())
            }
            KeystoreError::KeyNotFound(alias) => {
                LockError::HardwareUnavailable(format!("key alias not found: {alias}"))
            }
        }
    }
}

/// Platform hardware keystore capability.
///
/// A request for secure-element backing may be silently satisfied by TEE on
/// some devices, so [`reported_level`](HardwareKeystore::reported_level) -
/// not the requested flag - is authoritative for tier detection.
pub trait HardwareKeystore: Send + Sync {
    /// Generate a named 256-bit AES-GCM key. No-op if the alias exists.
    fn generate_key(&self, alias: &str, require_secure_element: bool)
        -> Result<(), KeystoreError>;

    /// The tier actually backing the named key.
    fn reported_level(&self, alias: &str) -> Result<SecurityLevel, KeystoreError>;

    /// Encrypt a small blob under the named key (nonce prepended).
    fn wrap(&self, alias: &str, plain: &[u8]) -> Result<Vec<u8>, KeystoreError>;

    /// Decrypt a blob previously produced by [`wrap`](HardwareKeystore::wrap).
    fn unwrap(&self, alias: &str, blob: &[u8]) -> Result<Vec<u8>, KeystoreError>;

    fn contains(&self, alias: &str) -> bool;

    fn delete_key(&self, alias: &str) -> Result<(), KeystoreError>;
}

// ═══════════════════════════════════════════════════════════════════════════
// SoftKeystore
// ═══════════════════════════════════════════════════════════════════════════

const NONCE_LEN: usize = 12;

/// Software keystore double with a configurable simulated tier.
///
/// Models the quirks the probe has to survive: a device without a secure
/// element rejects the request flag, and some devices accept it but silently
/// back the key with TEE anyway.
pub struct SoftKeystore {
    /// Best tier this "device" can provide
    best_level: SecurityLevel,
    /// Accept a secure-element request but back it with TEE
    silent_tee_fallback: bool,
    keys: RwLock<HashMap<String, ([u8; 32], SecurityLevel)>>,
}

impl SoftKeystore {
    pub fn new(best_level: SecurityLevel) -> Self {
        Self {
            best_level,
            silent_tee_fallback: false,
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Device that claims secure-element support but delivers TEE keys.
    pub fn with_silent_tee_fallback() -> Self {
        Self {
            best_level: SecurityLevel::Tee,
            silent_tee_fallback: true,
            keys: RwLock::new(HashMap::new()),
        }
    }
}

impl HardwareKeystore for SoftKeystore {
    fn generate_key(
        &self,
        alias: &str,
        require_secure_element: bool,
    ) -> Result<(), KeystoreError> {
        if self.best_level == SecurityLevel::Software {
            return Err(KeystoreError::KeystoreUnavailable);
        }
        if require_secure_element
            && self.best_level != SecurityLevel::SecureElement
            && !self.silent_tee_fallback
        {
            return Err(KeystoreError::SecureElementUnavailable);
        }

        let mut keys = self.keys.write();
        if keys.contains_key(alias) {
            return Ok(());
        }

        let backing = if require_secure_element && self.silent_tee_fallback {
            SecurityLevel::Tee
        } else {
            self.best_level
        };

        let mut material = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut material);
        keys.insert(alias.to_string(), (material, backing));
        Ok(())
    }

    fn reported_level(&self, alias: &str) -> Result<SecurityLevel, KeystoreError> {
        self.keys
            .read()
            .get(alias)
            .map(|(_, level)| *level)
            .ok_or_else(|| KeystoreError::KeyNotFound(alias.to_string()))
    }

    fn wrap(&self, alias: &str, plain: &[u8]) -> Result<Vec<u8>, KeystoreError> {
        let keys = self.keys.read();
        let (material, _) = keys
            .get(alias)
            .ok_or_else(|| KeystoreError::KeyNotFound(alias.to_string()))?;

        let cipher = Aes256Gcm::new_from_slice(material).expect("32-byte key");
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plain)
            .map_err(|_| KeystoreError::BadTag)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    fn unwrap(&self, alias: &str, blob: &[u8]) -> Result<Vec<u8>, KeystoreError> {
        if blob.len() < NONCE_LEN + 16 {
            return Err(KeystoreError::BadTag);
        }
        let keys = self.keys.read();
        let (material, _) = keys
            .get(alias)
            .ok_or_else(|| KeystoreError::KeyNotFound(alias.to_string()))?;

        let cipher = Aes256Gcm::new_from_slice(material).expect("32-byte key");
        let nonce = Nonce::from_slice(&blob[..NONCE_LEN]);

        cipher
            .decrypt(nonce, &blob[NONCE_LEN..])
            .map_err(|_| KeystoreError::BadTag)
    }

    fn contains(&self, alias: &str) -> bool {
        self.keys.read().contains_key(alias)
    }

    fn delete_key(&self, alias: &str) -> Result<(), KeystoreError> {
        self.keys.write().remove(alias);
        Ok(())
    }
}

/// Keystore that reports no hardware at all. Stands in for devices where
/// keystore creation itself fails.
pub struct NoKeystore;

impl HardwareKeystore for NoKeystore {
    fn generate_key(&self, _: &str, _: bool) -> Result<(), KeystoreError> {
        Err(KeystoreError::KeystoreUnavailable)
    }

    fn reported_level(&self, alias: &str) -> Result<SecurityLevel, KeystoreError> {
        Err(KeystoreError::KeyNotFound(alias.to_string()))
    }

    fn wrap(&self, _: &str, _: &[u8]) -> Result<Vec<u8>, KeystoreError> {
        Err(KeystoreError::KeystoreUnavailable)
    }

    fn unwrap(&self, _: &str, _: &[u8]) -> Result<Vec<u8>, KeystoreError> {
        Err(KeystoreError::KeystoreUnavailable)
    }

    fn contains(&self, _: &str) -> bool {
        false
    }

    fn delete_key(&self, _: &str) -> Result<(), KeystoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let ks = SoftKeystore::new(SecurityLevel::Tee);
        ks.generate_key("kek", false).unwrap();

        let blob = ks.wrap("kek", b"secret key bytes").unwrap();
        assert_ne!(blob, b"secret key bytes");

        let plain = ks.unwrap("kek", &blob).unwrap();
        assert_eq!(plain, b"secret key bytes");
    }

    #[test]
    fn test_tampered_blob_fails() {
        let ks = SoftKeystore::new(SecurityLevel::SecureElement);
        ks.generate_key("kek", true).unwrap();

        let mut blob = ks.wrap("kek", b"data").unwrap();
        blob[NONCE_LEN + 1] ^= 0xFF;

        assert_eq!(ks.unwrap("kek", &blob), Err(KeystoreError::BadTag));
    }

    #[test]
    fn test_tee_device_rejects_secure_element_flag() {
        let ks = SoftKeystore::new(SecurityLevel::Tee);
        assert_eq!(
            ks.generate_key("probe", true),
            Err(KeystoreError::SecureElementUnavailable)
        );
        assert!(ks.generate_key("probe", false).is_ok());
        assert_eq!(ks.reported_level("probe").unwrap(), SecurityLevel::Tee);
    }

    #[test]
    fn test_silent_tee_fallback_reports_tee() {
        let ks = SoftKeystore::with_silent_tee_fallback();
        // Request succeeds, but the reported (authoritative) tier is TEE.
        ks.generate_key("probe", true).unwrap();
        assert_eq!(ks.reported_level("probe").unwrap(), SecurityLevel::Tee);
    }

    #[test]
    fn test_generate_is_idempotent() {
        let ks = SoftKeystore::new(SecurityLevel::Tee);
        ks.generate_key("kek", false).unwrap();
        let blob = ks.wrap("kek", b"x").unwrap();

        // Second generate must not rotate the key material.
        ks.generate_key("kek", false).unwrap();
        assert_eq!(ks.unwrap("kek", &blob).unwrap(), b"x");
    }
}
