//! End-to-end authentication scenarios through the public API, with
//! persistence across lock instances (simulated process restarts).

use std::sync::Arc;

use photolock::{
    JsonFileStore, LockError, ManualClock, MemoryPurge, PhotoLock, SecurityLevel, SoftKeystore,
};
use tempfile::TempDir;

const ITERS: u32 = 1_000;
const DEVICE: &[u8] = b"integration-device";

struct Harness {
    dir: TempDir,
    keystore: Arc<SoftKeystore>,
    clock: Arc<ManualClock>,
    purge: Arc<MemoryPurge>,
}

impl Harness {
    fn new(level: SecurityLevel) -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            keystore: Arc::new(SoftKeystore::new(level)),
            clock: Arc::new(ManualClock::new(10_000_000)),
            purge: Arc::new(MemoryPurge::new()),
        }
    }

    /// A fresh lock instance over the same persisted state, as after an app
    /// restart.
    fn open(&self) -> PhotoLock {
        let store = Arc::new(JsonFileStore::open(self.dir.path().join("store.json")).unwrap());
        PhotoLock::with_tuning(
            store,
            self.keystore.clone(),
            &self.dir.path().join("keys"),
            DEVICE.to_vec(),
            self.purge.clone(),
            self.clock.clone(),
            ITERS,
        )
    }
}

#[test]
fn test_pin_survives_restart() {
    let h = Harness::new(SecurityLevel::Software);

    let lock = h.open();
    lock.set_pin("123456").unwrap();
    assert!(lock.verify_pin("123456").unwrap());
    let key = lock.get_derived_key().unwrap();
    drop(lock);

    // Session and cached key do not survive a restart, the PIN does, and it
    // derives the same photo key.
    let lock = h.open();
    assert!(!lock.check_session_validity());
    assert!(lock.verify_pin("123456").unwrap());
    assert_eq!(*lock.get_derived_key().unwrap(), *key);
}

#[test]
fn test_lockout_survives_restart() {
    let h = Harness::new(SecurityLevel::Software);

    let lock = h.open();
    lock.set_pin("123456").unwrap();
    for _ in 0..3 {
        assert!(!lock.verify_pin("000000").unwrap());
        h.clock.advance_secs(3600);
    }
    assert!(!lock.verify_pin("000000").unwrap());
    drop(lock);

    // Fourth failure just happened: window is 2 * 2^3 = 16s and it follows
    // the process across restarts.
    let lock = h.open();
    assert_eq!(lock.failed_attempts(), 4);
    assert!(matches!(
        lock.verify_pin("123456"),
        Err(LockError::LockedOut { remaining_secs: 16 })
    ));

    h.clock.advance_secs(16);
    assert!(lock.verify_pin("123456").unwrap());
    assert_eq!(lock.failed_attempts(), 0);
}

#[test]
fn test_hardware_wrapped_key_survives_restart() {
    let h = Harness::new(SecurityLevel::SecureElement);

    let lock = h.open();
    lock.set_pin("1234").unwrap();
    assert!(lock.verify_pin("1234").unwrap());

    let photo = h.dir.path().join("photo.enc");
    lock.encrypt_to_file(b"holiday.jpg bytes", &photo).unwrap();
    drop(lock);

    // The wrapped DEK file plus the persistent keystore key reproduce the
    // exact key, so the old ciphertext stays readable.
    let lock = h.open();
    assert!(lock.verify_pin("1234").unwrap());
    assert_eq!(
        lock.decrypt_file(&photo).unwrap().as_slice(),
        b"holiday.jpg bytes"
    );
}

#[test]
fn test_duress_end_to_end() {
    let h = Harness::new(SecurityLevel::SecureElement);

    let lock = h.open();
    lock.set_pin("1234").unwrap();
    lock.set_poison_pill_pin("9999").unwrap();
    h.purge.add("IMG_0001");
    h.purge.add("IMG_0002");
    h.purge.add("IMG_decoy");
    lock.decoys().mark("IMG_decoy").unwrap();

    assert!(lock.verify_pin("1234").unwrap());
    let photo = h.dir.path().join("real.enc");
    lock.encrypt_to_file(b"real photo", &photo).unwrap();
    lock.revoke_authorization();
    drop(lock);

    // Coercion: the duress PIN opens a working session on a fresh instance.
    let lock = h.open();
    assert!(lock.verify_pin("9999").unwrap());
    assert!(lock.check_session_validity());

    // Only the decoy remains, and the old vault key is unrecoverable: the
    // pre-swap ciphertext no longer decrypts.
    assert_eq!(h.purge.ids(), vec!["IMG_decoy".to_string()]);
    assert!(lock.decrypt_file(&photo).is_err());

    // The duress PIN now behaves as an ordinary primary, including restarts.
    drop(lock);
    let lock = h.open();
    assert!(!lock.has_poison_pill_pin());
    assert!(lock.verify_pin("9999").unwrap());
}

#[test]
fn test_wipe_leaves_reusable_vault() {
    let h = Harness::new(SecurityLevel::Software);

    let lock = h.open();
    lock.set_pin("123456").unwrap();
    h.purge.add("IMG_0001");

    for n in 1..=10 {
        assert!(!lock.verify_pin("999999").unwrap());
        h.clock.advance_secs(2 * (1 << (n - 1)) as i64);
    }
    assert!(h.purge.ids().is_empty());
    drop(lock);

    // After the wipe the vault is factory-fresh and can be set up again.
    let lock = h.open();
    assert!(matches!(
        lock.verify_pin("123456"),
        Err(LockError::PinNotSet)
    ));
    lock.set_pin("654321").unwrap();
    assert!(lock.verify_pin("654321").unwrap());
}
