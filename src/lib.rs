//! # Photolock
//!
//! PIN authentication, key derivation and duress ("poison pill") core for an
//! encrypted photo vault.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        PHOTOLOCK                          │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  SECURITY   │  │   PIN VAULT  │  │  SESSION +      │  │
//! │  │  PROBE      │  │ Argon2/legacy│  │  LOCKOUT        │  │
//! │  └──────┬──────┘  └──────┬───────┘  └────────┬────────┘  │
//! │         │                │                    │           │
//! │  ┌──────┴────────────────┴────────────────────┴────────┐ │
//! │  │                KEY DERIVATION SCHEME                 │ │
//! │  │   PBKDF2 → sharded cache / hardware-wrapped DEK      │ │
//! │  └──────────────────────────────────────────────────────┘ │
//! │                                                           │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ POISON PILL │  │ DECOY LEDGER │  │  HASH MIGRATOR  │  │
//! │  │ vault swap  │  │ (max 10)     │  │  SHA256→Argon2  │  │
//! │  └─────────────┘  └──────────────┘  └─────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Model
//!
//! - Primary PIN hashed with Argon2i, salt bound to the device identity
//! - Photo key derived with PBKDF2-HMAC-SHA256, never persisted in plaintext
//! - Cached key split into XOR shares, zeroized on eviction and drop
//! - Exponential backoff after failed attempts, full wipe at ten
//! - Duress PIN silently swaps the vault, keeping only marked decoys

pub mod crypto;
pub mod decoy;
pub mod error;
pub mod keyfiles;
pub mod keystore;
pub mod migrate;
pub mod pin_vault;
pub mod probe;
pub mod scheme;
pub mod session;
pub mod sharded;
pub mod store;
pub mod vault;

pub use decoy::DecoyLedger;
pub use error::{LockError, LockResult};
pub use keystore::{HardwareKeystore, SecurityLevel, SoftKeystore};
pub use migrate::{MigrationOutcome, PinHashMigrator};
pub use pin_vault::PinVault;
pub use probe::SecurityProbe;
pub use scheme::{build_scheme, KeyScheme, SchemeConfig};
pub use session::{Clock, ManualClock, SessionAuthority, SystemClock};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use vault::{MemoryPurge, PhotoLock, PhotoPurge};

/// Photolock version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
