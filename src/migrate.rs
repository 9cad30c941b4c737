//! Photolock - PIN Hash Migration
//!
//! One-time, in-place upgrade of a legacy (salted SHA-256) primary hash to
//! the current Argon2i scheme. Runs opportunistically at the top of every
//! verification; on any failure the original hash is left untouched and that
//! attempt falls back to the legacy verifier.

use std::sync::Arc;

use log::{info, warn};

use crate::crypto::{hash_pin, verify_pin, verify_pin_legacy, HashedPin};
use crate::error::{LockError, LockResult};
use crate::keyfiles::KeyFileStore;
use crate::pin_vault::PinVault;

/// What the opportunistic migration pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Hash already current, or the PIN did not match the legacy hash.
    NotNeeded,
    /// Hash upgraded in place.
    Migrated,
}

/// Upgrades a legacy primary hash in place.
pub struct PinHashMigrator {
    vault: Arc<PinVault>,
    files: KeyFileStore,
}

impl PinHashMigrator {
    pub fn new(vault: Arc<PinVault>, files: KeyFileStore) -> Self {
        Self { vault, files }
    }

    /// Attempt the upgrade for this verification's PIN.
    ///
    /// Only a PIN that matches the legacy hash can be migrated (the new hash
    /// has to be computed from the plaintext). Duress records are dropped -
    /// they are not carried across a hash-scheme migration. The legacy salt
    /// is reused so externally cached salt references stay valid.
    pub fn run(&self, pin: &str) -> LockResult<MigrationOutcome> {
        if !self.vault.has_pin() || !self.vault.is_legacy_hash() {
            return Ok(MigrationOutcome::NotNeeded);
        }

        let legacy = self.vault.primary_hash()?;
        if !verify_pin_legacy(pin, &legacy) {
            // Wrong PIN; the normal verification path will reject it.
            return Ok(MigrationOutcome::NotNeeded);
        }

        info!("legacy PIN hash detected, migrating to current scheme");
        self.vault.remove_poison_pill_pin()?;

        let new_hashed = HashedPin {
            hash: hash_pin(pin, &legacy.salt)?,
            salt: legacy.salt.clone(),
        };

        // The replacement hash must verify before the original is overwritten.
        if !verify_pin(pin, &new_hashed)? {
            return Err(LockError::MigrationFailure(
                "recomputed hash failed self-check".into(),
            ));
        }

        // Re-key the wrapped DEK file to the new hash identity instead of
        // forcing a PBKDF2 re-run under the old scheme.
        let old_name = KeyFileStore::dek_file_name(&legacy.hash);
        let new_name = KeyFileStore::dek_file_name(&new_hashed.hash);
        let renamed = if self.files.exists(&old_name) {
            self.files
                .rename(&old_name, &new_name)
                .map_err(|e| LockError::MigrationFailure(e.to_string()))?;
            true
        } else {
            false
        };

        let config = self.vault.scheme_config()?;
        if let Err(e) = self.vault.replace_primary_hash(&new_hashed, &config) {
            // Undo the rename so the old identity still finds its key file.
            if renamed {
                if let Err(undo) = self.files.rename(&new_name, &old_name) {
                    warn!("failed to undo DEK rename after migration error: {undo}");
                }
            }
            return Err(LockError::MigrationFailure(e.to_string()));
        }

        info!("PIN hash migration complete");
        Ok(MigrationOutcome::Migrated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash_pin_legacy;
    use crate::pin_vault::{ALGO_CURRENT, ALGO_LEGACY};
    use crate::scheme::SchemeConfig;
    use crate::store::{KeyValueStore, MemoryStore};
    use tempfile::tempdir;

    const DEVICE: &[u8] = b"unit-test-device";

    /// Seed the store the way an old install would have written it.
    fn seed_legacy(store: &MemoryStore, pin: &str) -> HashedPin {
        let salt = vec![7u8; 16];
        let hashed = HashedPin {
            hash: hash_pin_legacy(pin, &salt),
            salt,
        };
        store.set_string("pin.hash", &hashed.hash_hex()).unwrap();
        store.set_string("pin.salt", &hashed.salt_hex()).unwrap();
        store.set_string("pin.algo", ALGO_LEGACY).unwrap();
        hashed
    }

    fn setup(dir: &std::path::Path) -> (Arc<MemoryStore>, Arc<PinVault>, PinHashMigrator) {
        let store = Arc::new(MemoryStore::new());
        let vault = Arc::new(PinVault::new(store.clone(), DEVICE.to_vec()));
        let migrator = PinHashMigrator::new(vault.clone(), KeyFileStore::new(dir));
        (store, vault, migrator)
    }

    #[test]
    fn test_migrates_on_matching_pin() {
        let dir = tempdir().unwrap();
        let (store, vault, migrator) = setup(dir.path());
        let legacy = seed_legacy(&store, "1234");

        assert_eq!(migrator.run("1234").unwrap(), MigrationOutcome::Migrated);

        assert_eq!(vault.hash_algo(), ALGO_CURRENT);
        assert!(vault.verify("1234").unwrap());
        // Salt is reused across the migration.
        assert_eq!(vault.primary_hash().unwrap().salt, legacy.salt);
    }

    #[test]
    fn test_wrong_pin_leaves_hash_untouched() {
        let dir = tempdir().unwrap();
        let (store, vault, migrator) = setup(dir.path());
        seed_legacy(&store, "1234");

        assert_eq!(migrator.run("0000").unwrap(), MigrationOutcome::NotNeeded);
        assert_eq!(vault.hash_algo(), ALGO_LEGACY);
        assert!(vault.verify("1234").unwrap());
    }

    #[test]
    fn test_current_hash_not_remigrated() {
        let dir = tempdir().unwrap();
        let (_store, vault, migrator) = setup(dir.path());
        vault.set_pin("1234", &SchemeConfig::Software).unwrap();

        assert_eq!(migrator.run("1234").unwrap(), MigrationOutcome::NotNeeded);
    }

    #[test]
    fn test_duress_record_dropped_on_migration() {
        let dir = tempdir().unwrap();
        let (store, vault, migrator) = setup(dir.path());
        seed_legacy(&store, "1234");
        vault.set_poison_pill_pin("9999").unwrap();

        migrator.run("1234").unwrap();
        assert!(!vault.has_poison_pill_pin());
    }

    #[test]
    fn test_dek_file_renamed_to_new_identity() {
        let dir = tempdir().unwrap();
        let (store, vault, migrator) = setup(dir.path());
        let legacy = seed_legacy(&store, "1234");

        let files = KeyFileStore::new(dir.path());
        let old_name = KeyFileStore::dek_file_name(&legacy.hash);
        files.write(&old_name, b"wrapped dek").unwrap();

        migrator.run("1234").unwrap();

        let new_name = KeyFileStore::dek_file_name(&vault.primary_hash().unwrap().hash);
        assert!(!files.exists(&old_name));
        assert_eq!(files.read(&new_name).unwrap(), b"wrapped dek");
    }
}
