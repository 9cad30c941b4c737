//! Photolock - Security Level Probe
//!
//! Detects which hardware tier is actually present by generating a throwaway
//! key and reading back the tier the platform reports for it. Detection never
//! fails: any keystore trouble collapses to `Software`.

use std::sync::Arc;
use std::sync::OnceLock;

use log::{debug, info, warn};

use crate::keystore::{HardwareKeystore, KeystoreError, SecurityLevel};

/// Alias for the throwaway probe key. Deleted after every probe.
const PROBE_ALIAS: &str = "photolock.probe";

/// Probes the hardware tier once and caches the answer for the process.
pub struct SecurityProbe {
    keystore: Arc<dyn HardwareKeystore>,
    detected: OnceLock<SecurityLevel>,
}

impl SecurityProbe {
    pub fn new(keystore: Arc<dyn HardwareKeystore>) -> Self {
        Self {
            keystore,
            detected: OnceLock::new(),
        }
    }

    /// Detect the available security tier, memoized for the process lifetime.
    pub fn detect_security_level(&self) -> SecurityLevel {
        *self.detected.get_or_init(|| {
            let level = self.probe();
            info!("detected security level: {:?}", level);
            level
        })
    }

    fn probe(&self) -> SecurityLevel {
        // First attempt: request dedicated secure-element backing.
        let generated = match self.keystore.generate_key(PROBE_ALIAS, true) {
            Ok(()) => true,
            Err(KeystoreError::SecureElementUnavailable) => {
                debug!("secure element unavailable, retrying without the flag");
                // Second attempt: plain hardware key.
                match self.keystore.generate_key(PROBE_ALIAS, false) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("hardware key generation failed: {:?}", e);
                        false
                    }
                }
            }
            Err(e) => {
                warn!("keystore unavailable: {:?}", e);
                false
            }
        };

        if !generated {
            return SecurityLevel::Software;
        }

        // A secure-element request can be silently satisfied by TEE, so the
        // read-back tier of the created key is authoritative.
        let level = match self.keystore.reported_level(PROBE_ALIAS) {
            Ok(level) => level,
            Err(e) => {
                warn!("probe key read-back failed: {:?}", e);
                SecurityLevel::Software
            }
        };

        if let Err(e) = self.keystore.delete_key(PROBE_ALIAS) {
            warn!("failed to delete probe key: {:?}", e);
        }

        level
    }
}

/// Allowed PIN length for the tier.
///
/// Software-only devices get a longer minimum PIN to compensate for the
/// weaker key-derivation hardware.
pub fn pin_size_range(level: SecurityLevel) -> std::ops::RangeInclusive<usize> {
    match level {
        SecurityLevel::SecureElement | SecurityLevel::Tee => 4..=16,
        SecurityLevel::Software => 6..=16,
    }
}
