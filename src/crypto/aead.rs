//! Photolock - AEAD Encryption
//!
//! AES-256-GCM for photo payloads and key files, XChaCha20-Poly1305 for small
//! secret records (the reversibly-ciphered duress PIN). Nonce is prepended to
//! the ciphertext in both formats.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{LockError, LockResult};

/// Key length for AES-256 and XChaCha20
pub const KEY_LEN: usize = 32;

/// Nonce length for AES-GCM
pub const NONCE_LEN: usize = 12;

/// Nonce length for XChaCha20
pub const XCHACHA_NONCE_LEN: usize = 24;

/// GCM/Poly1305 tag length
const TAG_LEN: usize = 16;

fn generate_nonce<const N: usize>() -> [u8; N] {
    let mut nonce = [0u8; N];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}

// ═══════════════════════════════════════════════════════════════════════════
// AES-256-GCM (photo payloads, wrapped key files)
// ═══════════════════════════════════════════════════════════════════════════

/// Encrypt with AES-256-GCM; output is `nonce || ciphertext || tag`.
pub fn encrypt_aes_gcm(key: &[u8], plaintext: &[u8]) -> LockResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| LockError::EncryptionFailed(e.to_string()))?;

    let nonce_bytes = generate_nonce::<NONCE_LEN>();
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| LockError::EncryptionFailed(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt an AES-256-GCM blob produced by [`encrypt_aes_gcm`].
///
/// A tag mismatch is surfaced as [`LockError::CorruptKeyMaterial`], never
/// silently ignored.
pub fn decrypt_aes_gcm(key: &[u8], data: &[u8]) -> LockResult<Zeroizing<Vec<u8>>> {
    if data.len() < NONCE_LEN + TAG_LEN {
        return Err(LockError::CorruptKeyMaterial);
    }

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| LockError::EncryptionFailed(e.to_string()))?;

    let nonce = Nonce::from_slice(&data[..NONCE_LEN]);
    let plaintext = cipher
        .decrypt(nonce, &data[NONCE_LEN..])
        .map_err(|_| LockError::CorruptKeyMaterial)?;

    Ok(Zeroizing::new(plaintext))
}

// ═══════════════════════════════════════════════════════════════════════════
// XChaCha20-Poly1305 (small secret records)
// ═══════════════════════════════════════════════════════════════════════════

/// Encrypt with XChaCha20-Poly1305; output is `nonce || ciphertext || tag`.
pub fn encrypt_xchacha(key: &[u8], plaintext: &[u8]) -> LockResult<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new_from_slice(key)
        .map_err(|e| LockError::EncryptionFailed(e.to_string()))?;

    let nonce_bytes = generate_nonce::<XCHACHA_NONCE_LEN>();
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| LockError::EncryptionFailed(e.to_string()))?;

    let mut out = Vec::with_capacity(XCHACHA_NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt an XChaCha20-Poly1305 blob produced by [`encrypt_xchacha`].
pub fn decrypt_xchacha(key: &[u8], data: &[u8]) -> LockResult<Zeroizing<Vec<u8>>> {
    if data.len() < XCHACHA_NONCE_LEN + TAG_LEN {
        return Err(LockError::CorruptKeyMaterial);
    }

    let cipher = XChaCha20Poly1305::new_from_slice(key)
        .map_err(|e| LockError::EncryptionFailed(e.to_string()))?;

    let nonce = XNonce::from_slice(&data[..XCHACHA_NONCE_LEN]);
    let plaintext = cipher
        .decrypt(nonce, &data[XCHACHA_NONCE_LEN..])
        .map_err(|_| LockError::CorruptKeyMaterial)?;

    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aes_gcm_roundtrip() {
        let key = [0x42u8; KEY_LEN];
        let plaintext = b"photo vault payload";

        let encrypted = encrypt_aes_gcm(&key, plaintext).unwrap();
        let decrypted = decrypt_aes_gcm(&key, &encrypted).unwrap();

        assert_eq!(plaintext.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let key = [0x42u8; KEY_LEN];
        let a = encrypt_aes_gcm(&key, b"same input").unwrap();
        let b = encrypt_aes_gcm(&key, b"same input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_xchacha_roundtrip() {
        let key = [0x13u8; KEY_LEN];
        let plaintext = b"duress pin record";

        let encrypted = encrypt_xchacha(&key, plaintext).unwrap();
        let decrypted = decrypt_xchacha(&key, &encrypted).unwrap();

        assert_eq!(plaintext.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_tamper_surfaces_corrupt_key_material() {
        let key = [7u8; KEY_LEN];
        let mut encrypted = encrypt_aes_gcm(&key, b"secret").unwrap();
        encrypted[NONCE_LEN + 2] ^= 0xFF;

        assert!(matches!(
            decrypt_aes_gcm(&key, &encrypted),
            Err(LockError::CorruptKeyMaterial)
        ));
    }

    #[test]
    fn test_wrong_key_fails() {
        let encrypted = encrypt_aes_gcm(&[1u8; KEY_LEN], b"secret").unwrap();
        assert!(decrypt_aes_gcm(&[2u8; KEY_LEN], &encrypted).is_err());
    }

    #[test]
    fn test_truncated_blob_rejected() {
        let key = [1u8; KEY_LEN];
        assert!(matches!(
            decrypt_aes_gcm(&key, &[0u8; 10]),
            Err(LockError::CorruptKeyMaterial)
        ));
    }
}
