//! # Hashing & Address Derivation
//!
//! LockBox records and custody pools do not have keys of their own. Their
//! addresses are derived from seeds, so that anyone who knows an owner's
//! public key can compute where that owner's lockbox and custody pool live
//! without a lookup table:
//!
//! ```text
//! lockbox = derive_address([LOCKBOX_SEED, owner])
//! custody = derive_address([VAULT_SEED, lockbox])
//! ```
//!
//! Derivation is BLAKE3 over a domain tag followed by each seed with a
//! little-endian `u32` length prefix. The prefix keeps `["ab", "c"]` and
//! `["a", "bc"]` from colliding.

use crate::config::{ADDRESS_DERIVATION_DOMAIN, LOCKBOX_SEED, VAULT_SEED};

use super::keys::Pubkey;

/// BLAKE3 digest of `data`.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Derives a keyless address from an ordered list of seeds.
pub fn derive_address(seeds: &[&[u8]]) -> Pubkey {
    let mut hasher = blake3::Hasher::new();
    hasher.update(ADDRESS_DERIVATION_DOMAIN);
    for seed in seeds {
        hasher.update(&(seed.len() as u32).to_le_bytes());
        hasher.update(seed);
    }
    Pubkey::new(*hasher.finalize().as_bytes())
}

/// Address of the lockbox record owned by `owner`.
pub fn lockbox_address(owner: &Pubkey) -> Pubkey {
    derive_address(&[LOCKBOX_SEED, owner.as_ref()])
}

/// Address of the custody pool belonging to the record at `lockbox`.
pub fn custody_address(lockbox: &Pubkey) -> Pubkey {
    derive_address(&[VAULT_SEED, lockbox.as_ref()])
}
