//! Photolock - Cryptographic Core
//!
//! AEAD primitives, PIN hashing and PIN-to-key derivation.

pub mod aead;
pub mod kdf;
pub mod pinhash;

pub use aead::*;
pub use kdf::*;
pub use pinhash::*;
