//! # Cryptographic Primitives
//!
//! Identities, signatures and deterministic address derivation. Everything
//! here is a thin, typed wrapper around `ed25519-dalek` and `blake3`; no
//! home-grown cryptography.

pub mod hash;
pub mod keys;

pub use hash::{blake3_hash, custody_address, derive_address, lockbox_address};
pub use keys::{KeyError, Keypair, Pubkey, Signature};
