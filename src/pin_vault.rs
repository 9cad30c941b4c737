//! Photolock - PIN Vault
//!
//! Persists the hashed primary PIN, the optional duress ("poison pill") PIN,
//! and the selected scheme config. The duress PIN is kept in reversible
//! ciphered form - not one-way-hashed - because activation must re-derive a
//! key from it later. Activation itself runs under a journal flag so a crash
//! mid-swap cannot leave the vault readable with neither hash.

use std::sync::Arc;

use base64::Engine;
use log::info;
use zeroize::Zeroizing;

use crate::crypto::{
    decrypt_xchacha, derive_record_key, encrypt_xchacha, hash_new_pin, verify_pin,
    verify_pin_legacy, HashedPin,
};
use crate::error::{LockError, LockResult};
use crate::keystore::{HardwareKeystore, KeystoreError};
use crate::scheme::SchemeConfig;
use crate::store::KeyValueStore;

const KEY_PIN_HASH: &str = "pin.hash";
const KEY_PIN_SALT: &str = "pin.salt";
const KEY_PIN_ALGO: &str = "pin.algo";
const KEY_PIN_SCHEME: &str = "pin.scheme";
const KEY_PIN_PROTECT: &str = "pin.protect";

const KEY_DURESS_HASH: &str = "duress.hash";
const KEY_DURESS_SALT: &str = "duress.salt";
const KEY_DURESS_SECRET: &str = "duress.secret";
const KEY_DURESS_PROTECT: &str = "duress.protect";
const KEY_DURESS_ACTIVATING: &str = "duress.activating";

const PROTECT_KEYSTORE: &str = "keystore";
const PROTECT_PLAIN: &str = "plain";

/// Keystore alias of the key sealing PIN records at rest (hardware tiers).
pub const PIN_STORE_ALIAS: &str = "photolock.pin.store";

/// Marker value of the current hash algorithm.
pub const ALGO_CURRENT: &str = "argon2";
/// Marker value of the legacy hash algorithm.
pub const ALGO_LEGACY: &str = "sha256";

/// Domain separator of the duress-record storage key.
const DURESS_RECORD_INFO: &[u8] = b"photolock:duress-pin:v1";

/// Stored PIN state and duress record.
pub struct PinVault {
    store: Arc<dyn KeyValueStore>,
    device_id: Vec<u8>,
    sealer: Option<Arc<dyn HardwareKeystore>>,
}

impl PinVault {
    /// Plain persistence (software tier).
    pub fn new(store: Arc<dyn KeyValueStore>, device_id: Vec<u8>) -> Self {
        Self {
            store,
            device_id,
            sealer: None,
        }
    }

    /// Keystore-sealed persistence: hash and salt records are wrapped under
    /// [`PIN_STORE_ALIAS`] before they touch the store.
    pub fn with_sealer(
        store: Arc<dyn KeyValueStore>,
        device_id: Vec<u8>,
        keystore: Arc<dyn HardwareKeystore>,
    ) -> Self {
        Self {
            store,
            device_id,
            sealer: Some(keystore),
        }
    }

    fn protect_marker(&self) -> &'static str {
        if self.sealer.is_some() {
            PROTECT_KEYSTORE
        } else {
            PROTECT_PLAIN
        }
    }

    fn seal(&self, raw: &[u8]) -> LockResult<String> {
        match &self.sealer {
            Some(ks) => {
                if !ks.contains(PIN_STORE_ALIAS) {
                    match ks.generate_key(PIN_STORE_ALIAS, true) {
                        Ok(()) => {}
                        Err(KeystoreError::SecureElementUnavailable) => {
                            ks.generate_key(PIN_STORE_ALIAS, false)
                                .map_err(LockError::from)?;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                let blob = ks.wrap(PIN_STORE_ALIAS, raw).map_err(LockError::from)?;
                Ok(base64::engine::general_purpose::STANDARD.encode(blob))
            }
            None => Ok(hex::encode(raw)),
        }
    }

    /// Decode a stored record honoring the protection marker it was written
    /// under; pre-marker records are plain hex.
    fn unseal(&self, stored: &str, protect_key: &str) -> LockResult<Vec<u8>> {
        if self.store.get_string(protect_key).as_deref() == Some(PROTECT_KEYSTORE) {
            let ks = self.sealer.as_ref().ok_or_else(|| {
                LockError::HardwareUnavailable("PIN records are keystore-sealed".into())
            })?;
            let blob = base64::engine::general_purpose::STANDARD
                .decode(stored)
                .map_err(|e| LockError::Serialization(e.to_string()))?;
            ks.unwrap(PIN_STORE_ALIAS, &blob).map_err(LockError::from)
        } else {
            hex::decode(stored).map_err(|e| LockError::Serialization(e.to_string()))
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Primary PIN
    // ═══════════════════════════════════════════════════════════════════════

    /// Hash and persist a new primary PIN with its scheme config.
    pub fn set_pin(&self, pin: &str, config: &SchemeConfig) -> LockResult<()> {
        let hashed = hash_new_pin(pin, &self.device_id)?;
        self.write_primary(&hashed, ALGO_CURRENT)?;
        self.store
            .set_string(KEY_PIN_SCHEME, &serde_json::to_string(config)?)?;
        Ok(())
    }

    fn write_primary(&self, hashed: &HashedPin, algo: &str) -> LockResult<()> {
        self.store.set_string(KEY_PIN_HASH, &self.seal(&hashed.hash)?)?;
        self.store.set_string(KEY_PIN_SALT, &self.seal(&hashed.salt)?)?;
        self.store.set_string(KEY_PIN_PROTECT, self.protect_marker())?;
        self.store.set_string(KEY_PIN_ALGO, algo)?;
        Ok(())
    }

    pub fn has_pin(&self) -> bool {
        self.store.get_string(KEY_PIN_HASH).is_some()
    }

    pub fn primary_hash(&self) -> LockResult<HashedPin> {
        let hash = self
            .store
            .get_string(KEY_PIN_HASH)
            .ok_or(LockError::PinNotSet)?;
        let salt = self
            .store
            .get_string(KEY_PIN_SALT)
            .ok_or(LockError::PinNotSet)?;
        Ok(HashedPin {
            hash: self.unseal(&hash, KEY_PIN_PROTECT)?,
            salt: self.unseal(&salt, KEY_PIN_PROTECT)?,
        })
    }

    /// Algorithm marker of the stored primary hash.
    pub fn hash_algo(&self) -> String {
        self.store
            .get_string(KEY_PIN_ALGO)
            .unwrap_or_else(|| ALGO_LEGACY.to_string())
    }

    pub fn is_legacy_hash(&self) -> bool {
        self.hash_algo() != ALGO_CURRENT
    }

    pub fn scheme_config(&self) -> LockResult<SchemeConfig> {
        match self.store.get_string(KEY_PIN_SCHEME) {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(SchemeConfig::Software),
        }
    }

    /// Verify a PIN against the stored primary hash, honoring the stored
    /// algorithm marker.
    pub fn verify(&self, pin: &str) -> LockResult<bool> {
        let hashed = self.primary_hash()?;
        if self.is_legacy_hash() {
            Ok(verify_pin_legacy(pin, &hashed))
        } else {
            verify_pin(pin, &hashed)
        }
    }

    /// Replace the primary hash in place, keeping the scheme config.
    /// Used by the hash migrator.
    pub fn replace_primary_hash(
        &self,
        hashed: &HashedPin,
        config: &SchemeConfig,
    ) -> LockResult<()> {
        self.write_primary(hashed, ALGO_CURRENT)?;
        self.store
            .set_string(KEY_PIN_SCHEME, &serde_json::to_string(config)?)?;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Poison pill (duress PIN)
    // ═══════════════════════════════════════════════════════════════════════

    fn record_key(&self) -> LockResult<Zeroizing<[u8; 32]>> {
        derive_record_key(&self.device_id, DURESS_RECORD_INFO)
    }

    /// Configure the duress PIN: store its hash plus the plaintext PIN in
    /// reversible ciphered form.
    pub fn set_poison_pill_pin(&self, pin: &str) -> LockResult<()> {
        let hashed = hash_new_pin(pin, &self.device_id)?;
        let record_key = self.record_key()?;
        let secret = encrypt_xchacha(&*record_key, pin.as_bytes())?;
        let b64 = base64::engine::general_purpose::STANDARD;

        self.store
            .set_string(KEY_DURESS_HASH, &self.seal(&hashed.hash)?)?;
        self.store
            .set_string(KEY_DURESS_SALT, &self.seal(&hashed.salt)?)?;
        self.store
            .set_string(KEY_DURESS_PROTECT, self.protect_marker())?;
        self.store.set_string(KEY_DURESS_SECRET, &b64.encode(secret))?;
        Ok(())
    }

    pub fn has_poison_pill_pin(&self) -> bool {
        self.store.get_string(KEY_DURESS_HASH).is_some()
    }

    pub fn poison_pill_hash(&self) -> LockResult<HashedPin> {
        let hash = self
            .store
            .get_string(KEY_DURESS_HASH)
            .ok_or(LockError::PoisonPillNotSet)?;
        let salt = self
            .store
            .get_string(KEY_DURESS_SALT)
            .ok_or(LockError::PoisonPillNotSet)?;
        Ok(HashedPin {
            hash: self.unseal(&hash, KEY_DURESS_PROTECT)?,
            salt: self.unseal(&salt, KEY_DURESS_PROTECT)?,
        })
    }

    /// Recover the plaintext duress PIN from its ciphered record.
    pub fn get_poison_pill_pin(&self) -> LockResult<Zeroizing<String>> {
        let raw = self
            .store
            .get_string(KEY_DURESS_SECRET)
            .ok_or(LockError::PoisonPillNotSet)?;
        let b64 = base64::engine::general_purpose::STANDARD;
        let blob = b64
            .decode(raw)
            .map_err(|e| LockError::Serialization(e.to_string()))?;

        let record_key = self.record_key()?;
        let plain = decrypt_xchacha(&*record_key, &blob)?;
        let pin = String::from_utf8(plain.to_vec())
            .map_err(|e| LockError::Serialization(e.to_string()))?;
        Ok(Zeroizing::new(pin))
    }

    /// Check a candidate PIN against the duress hash. False when no duress
    /// PIN is configured.
    pub fn verify_poison_pill(&self, pin: &str) -> LockResult<bool> {
        if !self.has_poison_pill_pin() {
            return Ok(false);
        }
        let hashed = self.poison_pill_hash()?;
        verify_pin(pin, &hashed)
    }

    pub fn remove_poison_pill_pin(&self) -> LockResult<()> {
        self.store.remove(KEY_DURESS_HASH)?;
        self.store.remove(KEY_DURESS_SALT)?;
        self.store.remove(KEY_DURESS_SECRET)?;
        self.store.remove(KEY_DURESS_PROTECT)?;
        Ok(())
    }

    /// Promote the duress hash to be the primary hash and delete the duress
    /// record. The journal flag brackets the swap; callers also delete the
    /// old primary's key file and purge non-decoy photos as part of the same
    /// logical operation.
    pub fn activate_poison_pill(&self) -> LockResult<HashedPin> {
        let duress = self.poison_pill_hash()?;

        self.store.set_bool(KEY_DURESS_ACTIVATING, true)?;
        self.write_primary(&duress, ALGO_CURRENT)?;
        self.remove_poison_pill_pin()?;
        self.store.remove(KEY_DURESS_ACTIVATING)?;

        info!("poison pill activated - duress hash is now primary");
        Ok(duress)
    }

    /// True when a crash interrupted a previous activation. The hash swap is
    /// already durable at that point; pending cleanup can be re-run.
    pub fn activation_pending(&self) -> bool {
        self.store.get_bool(KEY_DURESS_ACTIVATING).unwrap_or(false)
    }

    pub fn finish_pending_activation(&self) -> LockResult<()> {
        self.remove_poison_pill_pin()?;
        self.store.remove(KEY_DURESS_ACTIVATING)?;
        Ok(())
    }
}
