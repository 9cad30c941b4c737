//! Photolock - Lock Orchestrator
//!
//! `PhotoLock` is the entry point the photo-storage layer, UI and background
//! session monitor talk to. A verification request runs: backoff gate →
//! opportunistic hash migration → duress check → primary check → key
//! derivation + session open, or failure bookkeeping escalating to a full
//! wipe at the ceiling. Collaborators are injected explicitly - no global
//! registry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info, warn};
use parking_lot::{Mutex, RwLock};
use zeroize::Zeroizing;

use crate::crypto::PBKDF2_ITERATIONS;
use crate::decoy::DecoyLedger;
use crate::error::{LockError, LockResult};
use crate::keyfiles::KeyFileStore;
use crate::keystore::{HardwareKeystore, SecurityLevel};
use crate::migrate::PinHashMigrator;
use crate::pin_vault::PinVault;
use crate::probe::{pin_size_range, SecurityProbe};
use crate::scheme::{build_scheme, KeyScheme, SchemeConfig};
use crate::session::{Clock, SessionAuthority, SystemClock, MAX_FAILED_ATTEMPTS};
use crate::store::KeyValueStore;

/// External photo-storage collaborator, only consulted for wipes.
pub trait PhotoPurge: Send + Sync {
    /// Duress wipe: delete every photo except the listed decoy ids, and
    /// re-encrypt those from `old_key` to `new_key` so they stay readable
    /// after the swap. `old_key` is absent when the retiring key is no
    /// longer recoverable (software tier with no cached copy); the decoys
    /// then survive as entries whose payload cannot be re-keyed.
    fn duress_sweep(
        &self,
        keep: &[String],
        old_key: Option<&[u8]>,
        new_key: &[u8],
    ) -> LockResult<()>;

    /// Delete every photo (full security reset).
    fn purge_all(&self) -> LockResult<()>;
}

/// In-memory purge target for tests and the CLI demo.
pub struct MemoryPurge {
    photos: Mutex<Vec<String>>,
}

impl MemoryPurge {
    pub fn new() -> Self {
        Self {
            photos: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, id: &str) {
        self.photos.lock().push(id.to_string());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.photos.lock().iter().any(|p| p == id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.photos.lock().clone()
    }
}

impl Default for MemoryPurge {
    fn default() -> Self {
        Self::new()
    }
}

impl PhotoPurge for MemoryPurge {
    fn duress_sweep(
        &self,
        keep: &[String],
        _old_key: Option<&[u8]>,
        _new_key: &[u8],
    ) -> LockResult<()> {
        // Ids only, no payloads to re-key.
        self.photos.lock().retain(|id| keep.contains(id));
        Ok(())
    }

    fn purge_all(&self) -> LockResult<()> {
        self.photos.lock().clear();
        Ok(())
    }
}

/// The authentication, key-derivation and duress core.
pub struct PhotoLock {
    store: Arc<dyn KeyValueStore>,
    keystore: Arc<dyn HardwareKeystore>,
    key_dir: PathBuf,
    device_id: Vec<u8>,
    iterations: u32,
    probe: SecurityProbe,
    session: SessionAuthority,
    pins: Arc<PinVault>,
    decoys: DecoyLedger,
    migrator: PinHashMigrator,
    purge: Arc<dyn PhotoPurge>,
    scheme: RwLock<Option<Arc<dyn KeyScheme>>>,
}

impl PhotoLock {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        keystore: Arc<dyn HardwareKeystore>,
        key_dir: &Path,
        device_id: Vec<u8>,
        purge: Arc<dyn PhotoPurge>,
    ) -> Self {
        Self::with_tuning(
            store,
            keystore,
            key_dir,
            device_id,
            purge,
            Arc::new(SystemClock),
            PBKDF2_ITERATIONS,
        )
    }

    /// Constructor with an injectable clock and PBKDF2 work factor
    /// (tests and simulations).
    pub fn with_tuning(
        store: Arc<dyn KeyValueStore>,
        keystore: Arc<dyn HardwareKeystore>,
        key_dir: &Path,
        device_id: Vec<u8>,
        purge: Arc<dyn PhotoPurge>,
        clock: Arc<dyn Clock>,
        iterations: u32,
    ) -> Self {
        let probe = SecurityProbe::new(keystore.clone());

        // Hardware tiers keep the PIN records wrapped at rest; software has
        // no key to wrap them under and stores them plain.
        let pins = if probe.detect_security_level().is_hardware() {
            Arc::new(PinVault::with_sealer(
                store.clone(),
                device_id.clone(),
                keystore.clone(),
            ))
        } else {
            Arc::new(PinVault::new(store.clone(), device_id.clone()))
        };

        let lock = Self {
            probe,
            session: SessionAuthority::new(store.clone(), clock),
            decoys: DecoyLedger::new(store.clone()),
            migrator: PinHashMigrator::new(pins.clone(), KeyFileStore::new(key_dir)),
            pins,
            store,
            keystore,
            key_dir: key_dir.to_path_buf(),
            device_id,
            iterations,
            purge,
            scheme: RwLock::new(None),
        };

        // A crash mid-duress-activation leaves the journal flag set; the hash
        // swap is already durable, so just finish the cleanup.
        if lock.pins.activation_pending() {
            warn!("unfinished poison pill activation found, completing cleanup");
            if let Err(e) = lock.pins.finish_pending_activation() {
                error!("pending activation cleanup failed: {e}");
            }
        }

        lock
    }

    fn scheme(&self) -> LockResult<Arc<dyn KeyScheme>> {
        if let Some(s) = self.scheme.read().as_ref() {
            return Ok(s.clone());
        }
        let config = self.pins.scheme_config()?;
        let built: Arc<dyn KeyScheme> = Arc::from(build_scheme(
            &config,
            self.device_id.clone(),
            self.keystore.clone(),
            KeyFileStore::new(&self.key_dir),
            self.iterations,
        ));
        *self.scheme.write() = Some(built.clone());
        Ok(built)
    }

    fn drop_scheme(&self) {
        if let Some(s) = self.scheme.write().take() {
            s.evict_key();
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // PIN MANAGEMENT
    // ═══════════════════════════════════════════════════════════════════════

    /// Probe the hardware tier, pick a scheme config for it, and set the
    /// primary PIN. Returns the selected config.
    pub fn set_pin(&self, pin: &str) -> LockResult<SchemeConfig> {
        let level = self.probe.detect_security_level();
        let config = SchemeConfig::for_level(level);
        self.set_pin_with_config(pin, &config)?;
        Ok(config)
    }

    /// Set the primary PIN under an explicit scheme config.
    pub fn set_pin_with_config(&self, pin: &str, config: &SchemeConfig) -> LockResult<()> {
        self.check_pin_policy(pin)?;
        self.pins.set_pin(pin, config)?;
        self.drop_scheme();

        // Pre-create key material (wrapped DEK / device salt) for the new PIN.
        let hashed = self.pins.primary_hash()?;
        self.scheme()?.create_key(pin, &hashed)?;
        info!("primary PIN set under {:?}", config);
        Ok(())
    }

    fn check_pin_policy(&self, pin: &str) -> LockResult<()> {
        let range = pin_size_range(self.probe.detect_security_level());
        if !range.contains(&pin.len()) {
            return Err(LockError::PinPolicy {
                len: pin.len(),
                min: *range.start(),
                max: *range.end(),
            });
        }
        Ok(())
    }

    /// Configure the duress PIN alongside the primary.
    pub fn set_poison_pill_pin(&self, pin: &str) -> LockResult<()> {
        self.check_pin_policy(pin)?;
        if !self.pins.has_pin() {
            return Err(LockError::PinNotSet);
        }
        if self.pins.verify(pin)? {
            // A duress PIN equal to the primary would shadow it.
            return Err(LockError::AuthenticationFailed);
        }
        self.pins.set_poison_pill_pin(pin)
    }

    pub fn has_poison_pill_pin(&self) -> bool {
        self.pins.has_poison_pill_pin()
    }

    pub fn remove_poison_pill_pin(&self) -> LockResult<()> {
        self.pins.remove_poison_pill_pin()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // VERIFICATION
    // ═══════════════════════════════════════════════════════════════════════

    /// Verify a PIN and, on success, derive + cache the photo key and open a
    /// session. Duress PIN entry silently swaps the vault. Failure past the
    /// ceiling triggers the full wipe.
    pub fn verify_pin(&self, pin: &str) -> LockResult<bool> {
        self.session.ensure_not_locked_out()?;
        if !self.pins.has_pin() {
            return Err(LockError::PinNotSet);
        }

        // Opportunistic hash upgrade. On failure this attempt just verifies
        // against the untouched legacy hash.
        if let Err(e) = self.migrator.run(pin) {
            warn!("hash migration failed, falling back to legacy verify: {e}");
        }

        // Duress first: its entry must win even when the primary check would
        // also have failed.
        if self.pins.verify_poison_pill(pin)? {
            self.activate_duress()?;
            return Ok(true);
        }

        if self.pins.verify(pin)? {
            let hashed = self.pins.primary_hash()?;
            self.scheme()?.derive_and_cache_key(pin, &hashed)?;
            self.session.reset_failed_attempts()?;
            self.session.authorize_session();
            return Ok(true);
        }

        let count = self.session.increment_failed_attempts()?;
        warn!("PIN verification failed (attempt {count}/{MAX_FAILED_ATTEMPTS})");
        if count >= MAX_FAILED_ATTEMPTS {
            error!("failure ceiling reached, performing full security reset");
            self.security_failure_reset()?;
        }
        Ok(false)
    }

    /// Duress activation: the three collaborating steps are ordered so a
    /// crash never leaves the vault readable with neither key.
    fn activate_duress(&self) -> LockResult<()> {
        let old_hash = self.pins.primary_hash()?;
        let duress_pin: Zeroizing<String> = self.pins.get_poison_pill_pin()?;
        let duress_hash = self.pins.poison_pill_hash()?;

        let scheme = self.scheme()?;

        // Recover the retiring key while its material still exists; the
        // decoys get re-encrypted under the new key with it.
        let old_key = scheme.recover_key(&old_hash).ok();
        if old_key.is_none() {
            warn!("old key unrecoverable, decoys survive without re-keying");
        }
        scheme.evict_key();

        // 1. The new key must be derivable before anything is destroyed.
        scheme.create_key(&duress_pin, &duress_hash)?;
        let new_key = scheme.derive_key(&duress_pin, &duress_hash)?;

        // 2. Journaled hash swap.
        self.pins.activate_poison_pill()?;

        // 3. Retire the old key file, wipe everything but the decoys and
        //    re-key those for the new vault.
        scheme.activate_poison_pill(&old_hash)?;
        let keep = self.decoys.decoy_ids();
        self.purge
            .duress_sweep(&keep, old_key.as_ref().map(|k| k.as_slice()), &new_key)?;

        // The duress PIN is the primary now; open a session under it.
        scheme.derive_and_cache_key(&duress_pin, &duress_hash)?;
        self.session.reset_failed_attempts()?;
        self.session.authorize_session();
        info!("duress vault swap complete ({} decoy(s) kept)", keep.len());
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // KEY ACCESS
    // ═══════════════════════════════════════════════════════════════════════

    /// Pure derivation against the stored primary hash, no caching.
    pub fn derive_key(&self, pin: &str) -> LockResult<Zeroizing<Vec<u8>>> {
        let hashed = self.pins.primary_hash()?;
        self.scheme()?.derive_key(pin, &hashed)
    }

    pub fn derive_and_cache_key(&self, pin: &str) -> LockResult<()> {
        let hashed = self.pins.primary_hash()?;
        self.scheme()?.derive_and_cache_key(pin, &hashed)
    }

    pub fn get_derived_key(&self) -> LockResult<Zeroizing<Vec<u8>>> {
        self.scheme()?.get_derived_key()
    }

    pub fn evict_key(&self) -> LockResult<()> {
        self.scheme()?.evict_key();
        Ok(())
    }

    pub fn encrypt_to_file(&self, plain: &[u8], path: &Path) -> LockResult<()> {
        self.scheme()?.encrypt_to_file(plain, path)
    }

    pub fn decrypt_file(&self, path: &Path) -> LockResult<Zeroizing<Vec<u8>>> {
        self.scheme()?.decrypt_file(path)
    }

    /// Release the cached key under memory pressure.
    pub fn on_low_memory(&self) {
        if let Ok(scheme) = self.scheme() {
            scheme.evict_key();
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // SESSION / LOCKOUT
    // ═══════════════════════════════════════════════════════════════════════

    /// Session check; an expired session also evicts the cached key.
    pub fn check_session_validity(&self) -> bool {
        let valid = self.session.check_session_validity();
        if !valid {
            if let Some(scheme) = self.scheme.read().as_ref() {
                scheme.evict_key();
            }
        }
        valid
    }

    pub fn authorize_session(&self) {
        self.session.authorize_session();
    }

    /// Explicit logout: close the session and zero the key.
    pub fn revoke_authorization(&self) {
        self.session.revoke_authorization();
        if let Some(scheme) = self.scheme.read().as_ref() {
            scheme.evict_key();
        }
    }

    pub fn increment_failed_attempts(&self) -> LockResult<i64> {
        self.session.increment_failed_attempts()
    }

    pub fn calculate_remaining_backoff_seconds(&self) -> i64 {
        self.session.calculate_remaining_backoff_seconds()
    }

    pub fn reset_failed_attempts(&self) -> LockResult<()> {
        self.session.reset_failed_attempts()
    }

    pub fn failed_attempts(&self) -> i64 {
        self.session.failed_attempts()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // PROBE / DECOYS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn detect_security_level(&self) -> SecurityLevel {
        self.probe.detect_security_level()
    }

    pub fn pin_size_range(&self) -> std::ops::RangeInclusive<usize> {
        pin_size_range(self.probe.detect_security_level())
    }

    pub fn decoys(&self) -> &DecoyLedger {
        &self.decoys
    }

    // ═══════════════════════════════════════════════════════════════════════
    // FULL WIPE
    // ═══════════════════════════════════════════════════════════════════════

    /// The fatal, irreversible outcome: destroy all hashes, all key material
    /// and all photos. Never retried, never rolled back.
    pub fn security_failure_reset(&self) -> LockResult<()> {
        if let Ok(scheme) = self.scheme() {
            scheme.evict_key();
            scheme.security_failure_reset()?;
        }
        self.drop_scheme();

        KeyFileStore::new(&self.key_dir).wipe()?;
        self.purge.purge_all()?;
        self.store.clear_all()?;
        self.session.revoke_authorization();
        error!("full security reset complete");
        Ok(())
    }
}
