//! Photolock - Key Derivation Schemes
//!
//! Two schemes derive the photo data-encryption key from a verified PIN:
//!
//! - **Software**: PBKDF2-HMAC-SHA256 over `pin || base64(device_id)`, salted
//!   with the stored PIN-hash salt. Recomputed on every derivation.
//! - **Hardware**: wraps the software scheme and a hardware key-encryption-key
//!   (KEK). In wrapped-key mode the expensive PBKDF2 pass runs once per PIN
//!   and the result is persisted wrapped under the KEK; in ephemeral mode only
//!   a random device salt is wrapped and the key is recomputed fresh each
//!   time, never stored.
//!
//! Derivation is the one serialized operation: `derive_and_cache_key` holds a
//! reentrant lock (duress activation re-enters it from the primary flow) and
//! race losers simply reuse the winner's cached key. Keystore and file I/O
//! here are blocking calls.

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::debug;
use parking_lot::ReentrantMutex;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::{
    decrypt_aes_gcm, derive_pin_key, encrypt_aes_gcm, HashedPin, PBKDF2_ITERATIONS,
};
use crate::error::{LockError, LockResult};
use crate::keyfiles::KeyFileStore;
use crate::keystore::{HardwareKeystore, KeystoreError};
use crate::sharded::ShardedKeySafe;

/// Alias of the hardware key-encryption-key.
pub const KEK_ALIAS: &str = "photolock.kek";

/// Device salt length for hardware ephemeral mode.
const DEVICE_SALT_LEN: usize = 64;

/// Persisted scheme selection, chosen once per PIN-set event from the probed
/// security level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemeConfig {
    Software,
    Hardware {
        biometric_required: bool,
        auth_timeout_secs: u32,
        ephemeral_key_mode: bool,
    },
}

impl SchemeConfig {
    /// Default config for a probed tier.
    pub fn for_level(level: crate::keystore::SecurityLevel) -> Self {
        if level.is_hardware() {
            SchemeConfig::Hardware {
                biometric_required: false,
                auth_timeout_secs: 30,
                ephemeral_key_mode: false,
            }
        } else {
            SchemeConfig::Software
        }
    }

    pub fn is_hardware(&self) -> bool {
        matches!(self, SchemeConfig::Hardware { .. })
    }
}

/// Common contract of both key-derivation schemes.
pub trait KeyScheme: Send + Sync {
    /// Pure derivation, no caching.
    fn derive_key(&self, pin: &str, hashed: &HashedPin) -> LockResult<Zeroizing<Vec<u8>>>;

    /// Derive once and cache into the sharded safe. Serialized; a concurrent
    /// duplicate derivation reuses the already-cached key.
    fn derive_and_cache_key(&self, pin: &str, hashed: &HashedPin) -> LockResult<()>;

    /// The cached key, or [`LockError::KeyNotDerived`].
    fn get_derived_key(&self) -> LockResult<Zeroizing<Vec<u8>>>;

    /// Recover the key of `hashed` without its PIN, for re-keying decoys
    /// while a retiring hash is still live. The base behavior only has the
    /// cached copy to offer; hardware wrapped mode can also unwrap the
    /// persisted DEK file.
    fn recover_key(&self, hashed: &HashedPin) -> LockResult<Zeroizing<Vec<u8>>> {
        let _ = hashed;
        self.get_derived_key()
    }

    fn has_cached_key(&self) -> bool;

    /// Pre-create key material for a freshly set PIN (wrapped DEK file or
    /// device salt, depending on mode).
    fn create_key(&self, pin: &str, hashed: &HashedPin) -> LockResult<()>;

    /// Zero and drop the cached key.
    fn evict_key(&self);

    /// Delete every per-PIN key file. Part of the full wipe.
    fn security_failure_reset(&self) -> LockResult<()>;

    /// Delete only the key file of the PIN hash being retired.
    fn activate_poison_pill(&self, old_hashed: &HashedPin) -> LockResult<()>;

    /// Wrap a small blob directly under a named hardware key. Hardware scheme
    /// only; calling this on the software scheme is a caller bug.
    fn encrypt_with_key_alias(&self, alias: &str, plain: &[u8]) -> LockResult<Vec<u8>> {
        let _ = (alias, plain);
        Err(LockError::HardwareRequired)
    }

    fn decrypt_with_key_alias(&self, alias: &str, blob: &[u8]) -> LockResult<Zeroizing<Vec<u8>>> {
        let _ = (alias, blob);
        Err(LockError::HardwareRequired)
    }

    /// AEAD encrypt under an explicit key (fresh nonce, nonce prepended).
    fn encrypt(&self, plain: &[u8], key: &[u8]) -> LockResult<Vec<u8>> {
        encrypt_aes_gcm(key, plain)
    }

    /// AEAD decrypt under an explicit key.
    fn decrypt(&self, blob: &[u8], key: &[u8]) -> LockResult<Zeroizing<Vec<u8>>> {
        decrypt_aes_gcm(key, blob)
    }

    /// Encrypt under the cached key and write atomically to `path`.
    fn encrypt_to_file(&self, plain: &[u8], path: &Path) -> LockResult<()> {
        let key = self.get_derived_key()?;
        let blob = encrypt_aes_gcm(&key, plain)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &blob)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read `path` and decrypt under the cached key.
    fn decrypt_file(&self, path: &Path) -> LockResult<Zeroizing<Vec<u8>>> {
        let key = self.get_derived_key()?;
        let blob = fs::read(path)?;
        decrypt_aes_gcm(&key, &blob)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Shared cache
// ═══════════════════════════════════════════════════════════════════════════

/// Reentrant derivation lock around the sharded key cache.
///
/// Reentrant because one logical call chain (duress activation inside the
/// primary verification flow) may request the lock it already holds.
struct KeyCache {
    lock: ReentrantMutex<RefCell<Option<ShardedKeySafe>>>,
}

impl KeyCache {
    fn new() -> Self {
        Self {
            lock: ReentrantMutex::new(RefCell::new(None)),
        }
    }

    fn cache_with<F>(&self, derive: F) -> LockResult<()>
    where
        F: FnOnce() -> LockResult<Zeroizing<Vec<u8>>>,
    {
        let guard = self.lock.lock();
        if guard.borrow().is_some() {
            debug!("key already cached, skipping derivation");
            return Ok(());
        }
        let key = derive()?;
        *guard.borrow_mut() = Some(ShardedKeySafe::store(&key));
        Ok(())
    }

    fn get(&self) -> LockResult<Zeroizing<Vec<u8>>> {
        let guard = self.lock.lock();
        let borrowed = guard.borrow();
        match borrowed.as_ref() {
            Some(safe) => Ok(safe.reconstruct_key()),
            None => Err(LockError::KeyNotDerived),
        }
    }

    fn is_cached(&self) -> bool {
        self.lock.lock().borrow().is_some()
    }

    fn evict(&self) {
        let guard = self.lock.lock();
        let taken = guard.borrow_mut().take();
        if let Some(mut safe) = taken {
            safe.evict();
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Software scheme
// ═══════════════════════════════════════════════════════════════════════════

/// Software-only scheme: PBKDF2 on every derivation, no hardware key.
pub struct SoftwareScheme {
    device_id: Vec<u8>,
    iterations: u32,
    cache: KeyCache,
}

impl SoftwareScheme {
    pub fn new(device_id: Vec<u8>) -> Self {
        Self::with_iterations(device_id, PBKDF2_ITERATIONS)
    }

    /// Reduced work factor for tests; production callers use [`new`](Self::new).
    pub fn with_iterations(device_id: Vec<u8>, iterations: u32) -> Self {
        Self {
            device_id,
            iterations,
            cache: KeyCache::new(),
        }
    }
}

impl KeyScheme for SoftwareScheme {
    fn derive_key(&self, pin: &str, hashed: &HashedPin) -> LockResult<Zeroizing<Vec<u8>>> {
        let key = derive_pin_key(pin, None, &self.device_id, &hashed.salt, self.iterations);
        Ok(Zeroizing::new(key.to_vec()))
    }

    fn derive_and_cache_key(&self, pin: &str, hashed: &HashedPin) -> LockResult<()> {
        self.cache.cache_with(|| self.derive_key(pin, hashed))
    }

    fn get_derived_key(&self) -> LockResult<Zeroizing<Vec<u8>>> {
        self.cache.get()
    }

    fn has_cached_key(&self) -> bool {
        self.cache.is_cached()
    }

    fn create_key(&self, _pin: &str, _hashed: &HashedPin) -> LockResult<()> {
        // Pure derivation; nothing is persisted.
        Ok(())
    }

    fn evict_key(&self) {
        self.cache.evict();
    }

    fn security_failure_reset(&self) -> LockResult<()> {
        self.evict_key();
        Ok(())
    }

    fn activate_poison_pill(&self, _old_hashed: &HashedPin) -> LockResult<()> {
        // No per-PIN files in software mode.
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Hardware scheme
// ═══════════════════════════════════════════════════════════════════════════

/// Hardware scheme: software derivation plus a hardware KEK.
pub struct HardwareScheme {
    base: SoftwareScheme,
    keystore: Arc<dyn HardwareKeystore>,
    files: KeyFileStore,
    ephemeral_key_mode: bool,
}

impl HardwareScheme {
    pub fn new(
        device_id: Vec<u8>,
        keystore: Arc<dyn HardwareKeystore>,
        files: KeyFileStore,
        ephemeral_key_mode: bool,
    ) -> Self {
        Self {
            base: SoftwareScheme::new(device_id),
            keystore,
            files,
            ephemeral_key_mode,
        }
    }

    /// Reduced work factor for tests.
    pub fn with_iterations(
        device_id: Vec<u8>,
        keystore: Arc<dyn HardwareKeystore>,
        files: KeyFileStore,
        ephemeral_key_mode: bool,
        iterations: u32,
    ) -> Self {
        Self {
            base: SoftwareScheme::with_iterations(device_id, iterations),
            keystore,
            files,
            ephemeral_key_mode,
        }
    }

    /// Generate the KEK if missing: 256-bit AES-GCM, secure-element-backed
    /// when available, TEE fallback on secure-element-unavailability.
    fn ensure_kek(&self) -> LockResult<()> {
        if self.keystore.contains(KEK_ALIAS) {
            return Ok(());
        }
        match self.keystore.generate_key(KEK_ALIAS, true) {
            Ok(()) => Ok(()),
            Err(KeystoreError::SecureElementUnavailable) => {
                debug!("KEK falling back to TEE-backed key");
                self.keystore.generate_key(KEK_ALIAS, false).map_err(Into::into)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Wrapped device salt, created on first use.
    fn device_salt(&self) -> LockResult<Zeroizing<Vec<u8>>> {
        self.ensure_kek()?;
        let name = self.files.device_salt_file();

        if self.files.exists(name) {
            let blob = self.files.read(name)?;
            let salt = self.keystore.unwrap(KEK_ALIAS, &blob).map_err(LockError::from)?;
            return Ok(Zeroizing::new(salt));
        }

        let mut salt = Zeroizing::new(vec![0u8; DEVICE_SALT_LEN]);
        rand::thread_rng().fill_bytes(&mut salt);

        let wrapped = self.keystore.wrap(KEK_ALIAS, &salt).map_err(LockError::from)?;
        self.files.write(name, &wrapped)?;
        Ok(salt)
    }

    /// Wrapped-key mode: unwrap the per-PIN DEK file, or run PBKDF2 once and
    /// persist the wrapped result.
    fn derive_wrapped(&self, pin: &str, hashed: &HashedPin) -> LockResult<Zeroizing<Vec<u8>>> {
        self.ensure_kek()?;
        let name = KeyFileStore::dek_file_name(&hashed.hash);

        if self.files.exists(name.as_str()) {
            let blob = self.files.read(&name)?;
            let key = self.keystore.unwrap(KEK_ALIAS, &blob).map_err(LockError::from)?;
            return Ok(Zeroizing::new(key));
        }

        debug!("no DEK file for this PIN hash, running first-use derivation");
        let key = self.base.derive_key(pin, hashed)?;
        let wrapped = self.keystore.wrap(KEK_ALIAS, &key).map_err(LockError::from)?;
        self.files.write(&name, &wrapped)?;
        Ok(key)
    }

    /// Ephemeral mode: PBKDF2 over pin + device salt on every derivation;
    /// the KEK only ever touches the salt, not the derived key.
    fn derive_ephemeral(&self, pin: &str, hashed: &HashedPin) -> LockResult<Zeroizing<Vec<u8>>> {
        let salt = self.device_salt()?;
        let key = derive_pin_key(
            pin,
            Some(&salt),
            &self.base.device_id,
            &hashed.salt,
            self.base.iterations,
        );
        Ok(Zeroizing::new(key.to_vec()))
    }
}

impl KeyScheme for HardwareScheme {
    fn derive_key(&self, pin: &str, hashed: &HashedPin) -> LockResult<Zeroizing<Vec<u8>>> {
        if self.ephemeral_key_mode {
            self.derive_ephemeral(pin, hashed)
        } else {
            self.derive_wrapped(pin, hashed)
        }
    }

    fn derive_and_cache_key(&self, pin: &str, hashed: &HashedPin) -> LockResult<()> {
        self.base.cache.cache_with(|| self.derive_key(pin, hashed))
    }

    fn get_derived_key(&self) -> LockResult<Zeroizing<Vec<u8>>> {
        self.base.cache.get()
    }

    fn recover_key(&self, hashed: &HashedPin) -> LockResult<Zeroizing<Vec<u8>>> {
        if !self.ephemeral_key_mode {
            let name = KeyFileStore::dek_file_name(&hashed.hash);
            if self.files.exists(&name) {
                self.ensure_kek()?;
                let blob = self.files.read(&name)?;
                let key = self.keystore.unwrap(KEK_ALIAS, &blob).map_err(LockError::from)?;
                return Ok(Zeroizing::new(key));
            }
        }
        self.get_derived_key()
    }

    fn has_cached_key(&self) -> bool {
        self.base.cache.is_cached()
    }

    fn create_key(&self, pin: &str, hashed: &HashedPin) -> LockResult<()> {
        if self.ephemeral_key_mode {
            // Only the device salt is persisted.
            self.device_salt().map(|_| ())
        } else {
            self.derive_wrapped(pin, hashed).map(|_| ())
        }
    }

    fn evict_key(&self) {
        self.base.cache.evict();
    }

    fn security_failure_reset(&self) -> LockResult<()> {
        self.evict_key();
        let deleted = self.files.delete_all_deks()?;
        debug!("security failure reset deleted {} DEK file(s)", deleted);
        Ok(())
    }

    fn activate_poison_pill(&self, old_hashed: &HashedPin) -> LockResult<()> {
        let name = KeyFileStore::dek_file_name(&old_hashed.hash);
        self.files.delete(&name)
    }

    fn encrypt_with_key_alias(&self, alias: &str, plain: &[u8]) -> LockResult<Vec<u8>> {
        self.ensure_kek()?;
        self.keystore.wrap(alias, plain).map_err(Into::into)
    }

    fn decrypt_with_key_alias(&self, alias: &str, blob: &[u8]) -> LockResult<Zeroizing<Vec<u8>>> {
        let plain = self.keystore.unwrap(alias, blob).map_err(LockError::from)?;
        Ok(Zeroizing::new(plain))
    }
}

/// Build the scheme matching a persisted config.
pub fn build_scheme(
    config: &SchemeConfig,
    device_id: Vec<u8>,
    keystore: Arc<dyn HardwareKeystore>,
    files: KeyFileStore,
    iterations: u32,
) -> Box<dyn KeyScheme> {
    match config {
        SchemeConfig::Software => Box::new(SoftwareScheme::with_iterations(device_id, iterations)),
        SchemeConfig::Hardware {
            ephemeral_key_mode, ..
        } => Box::new(HardwareScheme::with_iterations(
            device_id,
            keystore,
            files,
            *ephemeral_key_mode,
            iterations,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash_new_pin;
    use crate::keystore::{SecurityLevel, SoftKeystore};
    use tempfile::tempdir;

    const ITERS: u32 = 1_000;
    const DEVICE: &[u8] = b"unit-test-device";

    fn software() -> SoftwareScheme {
        SoftwareScheme::with_iterations(DEVICE.to_vec(), ITERS)
    }

    fn hardware(dir: &Path, ephemeral: bool) -> (HardwareScheme, Arc<SoftKeystore>) {
        let ks = Arc::new(SoftKeystore::new(SecurityLevel::SecureElement));
        let scheme = HardwareScheme::with_iterations(
            DEVICE.to_vec(),
            ks.clone(),
            KeyFileStore::new(dir),
            ephemeral,
            ITERS,
        );
        (scheme, ks)
    }

    #[test]
    fn test_software_derive_deterministic() {
        let scheme = software();
        let hashed = hash_new_pin("1234", DEVICE).unwrap();

        let k1 = scheme.derive_key("1234", &hashed).unwrap();
        let k2 = scheme.derive_key("1234", &hashed).unwrap();
        assert_eq!(*k1, *k2);
        assert_eq!(k1.len(), 32);
    }

    #[test]
    fn test_get_before_derive_is_contract_violation() {
        let scheme = software();
        assert!(matches!(
            scheme.get_derived_key(),
            Err(LockError::KeyNotDerived)
        ));
    }

    #[test]
    fn test_cache_and_evict() {
        let scheme = software();
        let hashed = hash_new_pin("1234", DEVICE).unwrap();

        scheme.derive_and_cache_key("1234", &hashed).unwrap();
        assert!(scheme.has_cached_key());
        let cached = scheme.get_derived_key().unwrap();
        assert_eq!(*cached, *scheme.derive_key("1234", &hashed).unwrap());

        scheme.evict_key();
        assert!(!scheme.has_cached_key());
        assert!(scheme.get_derived_key().is_err());
    }

    #[test]
    fn test_duplicate_derivation_reuses_cached_key() {
        let scheme = software();
        let hashed = hash_new_pin("1234", DEVICE).unwrap();

        scheme.derive_and_cache_key("1234", &hashed).unwrap();
        let first = scheme.get_derived_key().unwrap();

        // Second call with a different PIN is skipped outright - the cached
        // key wins, it is not re-derived.
        scheme.derive_and_cache_key("9999", &hashed).unwrap();
        assert_eq!(*scheme.get_derived_key().unwrap(), *first);
    }

    #[test]
    fn test_wrapped_recover_key_needs_no_pin() {
        let dir = tempdir().unwrap();
        let (scheme, _ks) = hardware(dir.path(), false);
        let hashed = hash_new_pin("1234", DEVICE).unwrap();

        let original = scheme.derive_key("1234", &hashed).unwrap();
        scheme.evict_key();

        // The DEK file alone is enough; no cached copy, no PIN.
        assert_eq!(*scheme.recover_key(&hashed).unwrap(), *original);
    }

    #[test]
    fn test_software_recover_key_only_from_cache() {
        let scheme = software();
        let hashed = hash_new_pin("1234", DEVICE).unwrap();

        assert!(matches!(
            scheme.recover_key(&hashed),
            Err(LockError::KeyNotDerived)
        ));

        scheme.derive_and_cache_key("1234", &hashed).unwrap();
        assert_eq!(
            *scheme.recover_key(&hashed).unwrap(),
            *scheme.derive_key("1234", &hashed).unwrap()
        );
    }

    #[test]
    fn test_software_rejects_key_alias() {
        let scheme = software();
        assert!(matches!(
            scheme.encrypt_with_key_alias("any", b"blob"),
            Err(LockError::HardwareRequired)
        ));
    }

    #[test]
    fn test_wrapped_mode_creates_then_unwraps_dek_file() {
        let dir = tempdir().unwrap();
        let (scheme, _ks) = hardware(dir.path(), false);
        let hashed = hash_new_pin("1234", DEVICE).unwrap();

        let k1 = scheme.derive_key("1234", &hashed).unwrap();
        let name = KeyFileStore::dek_file_name(&hashed.hash);
        assert!(KeyFileStore::new(dir.path()).exists(&name));

        // Second derivation unwraps the file; the PIN is not even consulted.
        let k2 = scheme.derive_key("wrong-pin-ignored", &hashed).unwrap();
        assert_eq!(*k1, *k2);
    }

    #[test]
    fn test_wrapped_mode_matches_software_derivation() {
        let dir = tempdir().unwrap();
        let (hw, _ks) = hardware(dir.path(), false);
        let sw = software();
        let hashed = hash_new_pin("1234", DEVICE).unwrap();

        // First-use wrapped derivation is exactly the software derivation.
        assert_eq!(
            *hw.derive_key("1234", &hashed).unwrap(),
            *sw.derive_key("1234", &hashed).unwrap()
        );
    }

    #[test]
    fn test_ephemeral_mode_stores_only_device_salt() {
        let dir = tempdir().unwrap();
        let (scheme, _ks) = hardware(dir.path(), true);
        let hashed = hash_new_pin("1234", DEVICE).unwrap();

        let k1 = scheme.derive_key("1234", &hashed).unwrap();
        let k2 = scheme.derive_key("1234", &hashed).unwrap();
        assert_eq!(*k1, *k2);

        let files = KeyFileStore::new(dir.path());
        assert!(files.exists(files.device_salt_file()));
        assert!(!files.exists(&KeyFileStore::dek_file_name(&hashed.hash)));
    }

    #[test]
    fn test_ephemeral_key_depends_on_pin() {
        let dir = tempdir().unwrap();
        let (scheme, _ks) = hardware(dir.path(), true);
        let hashed = hash_new_pin("1234", DEVICE).unwrap();

        let right = scheme.derive_key("1234", &hashed).unwrap();
        let wrong = scheme.derive_key("0000", &hashed).unwrap();
        assert_ne!(*right, *wrong);
    }

    #[test]
    fn test_security_failure_reset_deletes_dek_files() {
        let dir = tempdir().unwrap();
        let (scheme, _ks) = hardware(dir.path(), false);
        let a = hash_new_pin("1234", DEVICE).unwrap();
        let b = hash_new_pin("9999", DEVICE).unwrap();

        scheme.create_key("1234", &a).unwrap();
        scheme.create_key("9999", &b).unwrap();
        scheme.security_failure_reset().unwrap();

        let files = KeyFileStore::new(dir.path());
        assert!(!files.exists(&KeyFileStore::dek_file_name(&a.hash)));
        assert!(!files.exists(&KeyFileStore::dek_file_name(&b.hash)));
    }

    #[test]
    fn test_activate_poison_pill_deletes_only_old_file() {
        let dir = tempdir().unwrap();
        let (scheme, _ks) = hardware(dir.path(), false);
        let old = hash_new_pin("1234", DEVICE).unwrap();
        let new = hash_new_pin("9999", DEVICE).unwrap();

        scheme.create_key("1234", &old).unwrap();
        scheme.create_key("9999", &new).unwrap();
        scheme.activate_poison_pill(&old).unwrap();

        let files = KeyFileStore::new(dir.path());
        assert!(!files.exists(&KeyFileStore::dek_file_name(&old.hash)));
        assert!(files.exists(&KeyFileStore::dek_file_name(&new.hash)));
    }

    #[test]
    fn test_alias_wrap_roundtrip() {
        let dir = tempdir().unwrap();
        let (scheme, ks) = hardware(dir.path(), false);
        ks.generate_key("pin.store", false).unwrap();

        let blob = scheme.encrypt_with_key_alias("pin.store", b"hash at rest").unwrap();
        let plain = scheme.decrypt_with_key_alias("pin.store", &blob).unwrap();
        assert_eq!(plain.as_slice(), b"hash at rest");
    }

    #[test]
    fn test_encrypt_to_file_roundtrip() {
        let dir = tempdir().unwrap();
        let scheme = software();
        let hashed = hash_new_pin("1234", DEVICE).unwrap();
        scheme.derive_and_cache_key("1234", &hashed).unwrap();

        let path = dir.path().join("photo.enc");
        scheme.encrypt_to_file(b"jpeg bytes", &path).unwrap();
        assert_eq!(scheme.decrypt_file(&path).unwrap().as_slice(), b"jpeg bytes");

        scheme.evict_key();
        assert!(matches!(
            scheme.decrypt_file(&path),
            Err(LockError::KeyNotDerived)
        ));
    }
}
