//! Photolock - Session Authority
//!
//! Two independent axes: an in-memory authenticated-session window that
//! expires after a timeout, and a persisted failed-attempt counter with
//! exponential backoff. The counter survives process restarts; the session
//! does not.

use std::sync::Arc;

use chrono::Utc;
use log::warn;
use parking_lot::Mutex;

use crate::error::{LockError, LockResult};
use crate::store::KeyValueStore;

/// Failures at which the vault performs a full security reset.
pub const MAX_FAILED_ATTEMPTS: i64 = 10;

/// Default session timeout: 5 minutes.
pub const DEFAULT_SESSION_TIMEOUT_MS: i64 = 300_000;

const KEY_FAILED_COUNT: &str = "auth.failed_count";
const KEY_FAILED_AT: &str = "auth.failed_at_ms";

/// Time source, injectable so tests can drive the clock.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for tests and simulations.
pub struct ManualClock {
    now: Mutex<i64>,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: Mutex::new(start_millis),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        *self.now.lock() += secs * 1000;
    }

    pub fn advance_millis(&self, ms: i64) {
        *self.now.lock() += ms;
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        *self.now.lock()
    }
}

#[derive(Debug, Clone, Copy)]
struct SessionState {
    is_authorized: bool,
    last_auth_epoch_ms: i64,
}

/// Session validity and lockout bookkeeping.
pub struct SessionAuthority {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    session_timeout_ms: i64,
    state: Mutex<SessionState>,
}

impl SessionAuthority {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_timeout(store, clock, DEFAULT_SESSION_TIMEOUT_MS)
    }

    pub fn with_timeout(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        session_timeout_ms: i64,
    ) -> Self {
        Self {
            store,
            clock,
            session_timeout_ms,
            state: Mutex::new(SessionState {
                is_authorized: false,
                last_auth_epoch_ms: 0,
            }),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Session axis
    // ═══════════════════════════════════════════════════════════════════════

    /// Open an authorized session stamped with the current time.
    pub fn authorize_session(&self) {
        let mut state = self.state.lock();
        state.is_authorized = true;
        state.last_auth_epoch_ms = self.clock.now_millis();
    }

    /// True iff a session is open and within the timeout. Expiry flips the
    /// session off as a side effect of the check.
    pub fn check_session_validity(&self) -> bool {
        let mut state = self.state.lock();
        if !state.is_authorized {
            return false;
        }
        let elapsed = self.clock.now_millis() - state.last_auth_epoch_ms;
        if elapsed >= self.session_timeout_ms {
            state.is_authorized = false;
            state.last_auth_epoch_ms = 0;
            return false;
        }
        true
    }

    /// Force the session closed immediately.
    pub fn revoke_authorization(&self) {
        let mut state = self.state.lock();
        state.is_authorized = false;
        state.last_auth_epoch_ms = 0;
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lockout axis
    // ═══════════════════════════════════════════════════════════════════════

    /// Record one failure and return the new count.
    pub fn increment_failed_attempts(&self) -> LockResult<i64> {
        let count = self.failed_attempts() + 1;
        self.store.set_i64(KEY_FAILED_COUNT, count)?;
        self.store.set_i64(KEY_FAILED_AT, self.clock.now_millis())?;
        if count >= MAX_FAILED_ATTEMPTS {
            warn!("failed-attempt ceiling reached ({count})");
        }
        Ok(count)
    }

    pub fn failed_attempts(&self) -> i64 {
        self.store.get_i64(KEY_FAILED_COUNT).unwrap_or(0)
    }

    /// Seconds left in the backoff window: `max(0, 2*2^(n-1) - elapsed)`.
    /// Backoff doubles per failure, starting at 2 seconds.
    pub fn calculate_remaining_backoff_seconds(&self) -> i64 {
        let count = self.failed_attempts();
        if count <= 0 {
            return 0;
        }
        let last_failure = self.store.get_i64(KEY_FAILED_AT).unwrap_or(0);
        let elapsed_secs = (self.clock.now_millis() - last_failure) / 1000;
        // Clamp the exponent so a hostile counter cannot overflow.
        let window = 2i64.saturating_mul(1i64 << (count - 1).min(32));
        (window - elapsed_secs).max(0)
    }

    /// Zero the counter; called only after a successful primary-PIN
    /// verification.
    pub fn reset_failed_attempts(&self) -> LockResult<()> {
        self.store.set_i64(KEY_FAILED_COUNT, 0)?;
        self.store.set_i64(KEY_FAILED_AT, 0)?;
        Ok(())
    }

    /// Guard used by the verification flow before touching the PIN at all.
    pub fn ensure_not_locked_out(&self) -> LockResult<()> {
        let remaining = self.calculate_remaining_backoff_seconds();
        if remaining > 0 {
            return Err(LockError::LockedOut {
                remaining_secs: remaining,
            });
        }
        Ok(())
    }
}
