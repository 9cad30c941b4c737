//! Photolock - Error Types

use thiserror::Error;

/// Result type for lock operations
pub type LockResult<T> = Result<T, LockError>;

/// Lock subsystem error types
#[derive(Error, Debug)]
pub enum LockError {
    // ═══════════════════════════════════════════════════════════════
    // AUTHENTICATION ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Authentication failed - wrong PIN")]
    AuthenticationFailed,

    #[error("Locked out - retry in {remaining_secs}s")]
    LockedOut { remaining_secs: i64 },

    #[error("PIN length {len} outside allowed range {min}-{max}")]
    PinPolicy { len: usize, min: usize, max: usize },

    #[error("No PIN configured")]
    PinNotSet,

    // ═══════════════════════════════════════════════════════════════
    // KEY / CRYPTO ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("No derived key cached - verify a PIN first")]
    KeyNotDerived,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Corrupt key material - authentication tag mismatch")]
    CorruptKeyMaterial,

    #[error("Hardware keystore unavailable: {0}")]
    HardwareUnavailable(String),

    #[error("Operation requires the hardware key scheme")]
    HardwareRequired,

    // ═══════════════════════════════════════════════════════════════
    // MIGRATION / DURESS ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("PIN hash migration failed: {0}")]
    MigrationFailure(String),

    #[error("No poison pill PIN configured")]
    PoisonPillNotSet,

    #[error("Decoy limit reached ({0} max)")]
    DecoyLimitReached(usize),

    // ═══════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Store error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LockError {
    /// Check if this is a security-critical error
    pub fn is_security_critical(&self) -> bool {
        matches!(
            self,
            LockError::CorruptKeyMaterial | LockError::LockedOut { .. }
        )
    }

    /// Errors that the verification flow may recover from locally
    /// without surfacing to the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LockError::HardwareUnavailable(_) | LockError::MigrationFailure(_)
        )
    }
}

impl From<serde_json::Error> for LockError {
    fn from(e: serde_json::Error) -> Self {
        LockError::Serialization(e.to_string())
    }
}
