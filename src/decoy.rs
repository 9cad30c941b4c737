//! Photolock - Decoy Ledger
//!
//! Marks a bounded set of photos as decoys. Decoys are deliberately spared by
//! a duress wipe so the swapped-in vault is not suspiciously empty.

use std::sync::Arc;

use crate::error::{LockError, LockResult};
use crate::store::KeyValueStore;

/// Upper bound on decoy-marked items.
pub const MAX_DECOYS: usize = 10;

const KEY_INDEX: &str = "decoy.index";

/// Bounded decoy marker set, persisted in its own store namespace.
pub struct DecoyLedger {
    store: Arc<dyn KeyValueStore>,
}

impl DecoyLedger {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn load(&self) -> Vec<String> {
        self.store
            .get_string(KEY_INDEX)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    fn save(&self, ids: &[String]) -> LockResult<()> {
        let raw = serde_json::to_string(ids)?;
        self.store.set_string(KEY_INDEX, &raw)
    }

    /// Mark a photo as a decoy. Fails once the cap is reached.
    pub fn mark(&self, photo_id: &str) -> LockResult<()> {
        let mut ids = self.load();
        if ids.iter().any(|id| id == photo_id) {
            return Ok(());
        }
        if ids.len() >= MAX_DECOYS {
            return Err(LockError::DecoyLimitReached(MAX_DECOYS));
        }
        ids.push(photo_id.to_string());
        self.save(&ids)
    }

    pub fn unmark(&self, photo_id: &str) -> LockResult<()> {
        let mut ids = self.load();
        ids.retain(|id| id != photo_id);
        self.save(&ids)
    }

    pub fn is_decoy(&self, photo_id: &str) -> bool {
        self.load().iter().any(|id| id == photo_id)
    }

    /// Items to keep through a duress wipe.
    pub fn decoy_ids(&self) -> Vec<String> {
        self.load()
    }

    pub fn count(&self) -> usize {
        self.load().len()
    }

    /// Drop every marker. Used by the full security reset.
    pub fn clear(&self) -> LockResult<()> {
        self.store.remove(KEY_INDEX)
    }
}
