//! Photolock - PIN-to-Key Derivation
//!
//! PBKDF2-HMAC-SHA256 turns a verified PIN into the 256-bit photo key;
//! HKDF-SHA256 derives fixed-purpose record keys from the device identifier.

use base64::Engine;
use hkdf::Hkdf;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{LockError, LockResult};

use super::aead::KEY_LEN;

/// PBKDF2 work factor for PIN-derived keys.
pub const PBKDF2_ITERATIONS: u32 = 600_000;

/// Derive a 32-byte key from a PIN.
///
/// Input keying material is `pin_bytes || base64(device_id)`, optionally with
/// `base64(device_salt)` between them (hardware ephemeral mode). The salt is
/// the stored PIN-hash salt, so the derivation is bound to one `HashedPin`.
pub fn derive_pin_key(
    pin: &str,
    device_salt: Option<&[u8]>,
    device_id: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Zeroizing<[u8; KEY_LEN]> {
    let b64 = base64::engine::general_purpose::STANDARD;

    let mut ikm = Zeroizing::new(Vec::with_capacity(pin.len() + 96));
    ikm.extend_from_slice(pin.as_bytes());
    if let Some(ds) = device_salt {
        ikm.extend_from_slice(b64.encode(ds).as_bytes());
    }
    ikm.extend_from_slice(b64.encode(device_id).as_bytes());

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(&ikm, salt, iterations, &mut *key);
    key
}

/// Derive a fixed-purpose 32-byte record key from the device identifier.
///
/// Used for the reversible cipher over the duress PIN record; `info` is the
/// domain separator.
pub fn derive_record_key(device_id: &[u8], info: &[u8]) -> LockResult<Zeroizing<[u8; KEY_LEN]>> {
    let hk = Hkdf::<Sha256>::new(Some(b"photolock:record:v1"), device_id);
    let mut okm = Zeroizing::new([0u8; KEY_LEN]);

    hk.expand(info, &mut *okm)
        .map_err(|e| LockError::KeyDerivationFailed(e.to_string()))?;

    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Small iteration count; the schedule is identical, just shorter.
    const ITERS: u32 = 1_000;

    #[test]
    fn test_pin_key_deterministic() {
        let k1 = derive_pin_key("1234", None, b"device-a", b"salt0001", ITERS);
        let k2 = derive_pin_key("1234", None, b"device-a", b"salt0001", ITERS);
        assert_eq!(*k1, *k2);
    }

    #[test]
    fn test_pin_key_sensitive_to_inputs() {
        let base = derive_pin_key("1234", None, b"device-a", b"salt0001", ITERS);

        assert_ne!(
            *base,
            *derive_pin_key("1235", None, b"device-a", b"salt0001", ITERS)
        );
        assert_ne!(
            *base,
            *derive_pin_key("1234", None, b"device-b", b"salt0001", ITERS)
        );
        assert_ne!(
            *base,
            *derive_pin_key("1234", None, b"device-a", b"salt0002", ITERS)
        );
        assert_ne!(
            *base,
            *derive_pin_key("1234", Some(&[7u8; 64]), b"device-a", b"salt0001", ITERS)
        );
    }

    #[test]
    fn test_record_key_domain_separation() {
        let a = derive_record_key(b"device-a", b"duress").unwrap();
        let b = derive_record_key(b"device-a", b"other").unwrap();
        assert_ne!(*a, *b);
    }
}
