//! Photolock - Sharded Key Safe
//!
//! Anti-forensic in-memory holder for the derived photo key. The key is never
//! resident as one contiguous buffer: it is split into two XOR shares padded
//! to a randomized length, so a memory scan cannot find it by fixed offset or
//! fixed size.

use rand::{Rng, RngCore};
use zeroize::{Zeroize, Zeroizing};

/// Extra padding added to each share: 3..155 random bytes.
const PAD_MIN: usize = 3;
const PAD_MAX: usize = 155;

/// One derived key, held as two randomized XOR shares.
pub struct ShardedKeySafe {
    key_len: usize,
    part1: Vec<u8>,
    part2: Vec<u8>,
}

impl ShardedKeySafe {
    /// Split `key` into two shares. The input slice is not retained.
    pub fn store(key: &[u8]) -> Self {
        let mut rng = rand::thread_rng();
        let total = key.len() + rng.gen_range(PAD_MIN..PAD_MAX);

        let mut part1 = vec![0u8; total];
        rng.fill_bytes(&mut part1);

        let mut part2 = vec![0u8; total];
        rng.fill_bytes(&mut part2);
        for i in 0..key.len() {
            part2[i] = key[i] ^ part1[i];
        }

        Self {
            key_len: key.len(),
            part1,
            part2,
        }
    }

    /// XOR the shares back into the raw key. Returned buffer zeroizes on drop.
    pub fn reconstruct_key(&self) -> Zeroizing<Vec<u8>> {
        let mut key = Zeroizing::new(vec![0u8; self.key_len]);
        for i in 0..self.key_len {
            key[i] = self.part1[i] ^ self.part2[i];
        }
        key
    }

    /// Zero both shares in place.
    pub fn evict(&mut self) {
        self.part1.zeroize();
        self.part2.zeroize();
        self.key_len = 0;
    }
}

impl Drop for ShardedKeySafe {
    fn drop(&mut self) {
        self.evict();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconstruct_roundtrip() {
        let key = [0xA5u8; 32];
        let safe = ShardedKeySafe::store(&key);
        assert_eq!(&*safe.reconstruct_key(), &key);
    }

    #[test]
    fn test_shares_do_not_contain_key() {
        let key = [0x77u8; 32];
        let safe = ShardedKeySafe::store(&key);

        // Neither share starts with the raw key bytes.
        assert_ne!(&safe.part1[..32], &key);
        assert_ne!(&safe.part2[..32], &key);
    }

    #[test]
    fn test_share_lengths_randomized() {
        let key = [1u8; 32];
        let safe = ShardedKeySafe::store(&key);

        assert_eq!(safe.part1.len(), safe.part2.len());
        assert!(safe.part1.len() >= 32 + PAD_MIN);
        assert!(safe.part1.len() < 32 + PAD_MAX);
    }

    #[test]
    fn test_evict_zeroes_shares() {
        let key = [9u8; 32];
        let mut safe = ShardedKeySafe::store(&key);
        safe.evict();

        assert!(safe.part1.iter().all(|&b| b == 0));
        assert!(safe.part2.iter().all(|&b| b == 0));
        assert!(safe.reconstruct_key().is_empty());
    }
}
