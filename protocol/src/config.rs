//! # Protocol Configuration & Constants
//!
//! Every magic number in LockBox lives here. Seeds, error code bases and the
//! snapshot format version are part of the external contract: clients derive
//! addresses from the seeds and match on the codes, so changing any of them
//! is a breaking change.
//!
//! Runtime knobs that an operator may legitimately tune live in
//! [`LockBoxConfig`], which is serialized into every registry snapshot.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full protocol version string.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Version tag written into every registry snapshot. Bump when the snapshot
/// layout changes in a way older readers cannot handle.
pub const SNAPSHOT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Address Derivation
// ---------------------------------------------------------------------------

/// Seed for the lockbox record address: `derive([LOCKBOX_SEED, owner])`.
pub const LOCKBOX_SEED: &[u8] = b"lockbox";

/// Seed for the custody pool address: `derive([VAULT_SEED, lockbox])`.
pub const VAULT_SEED: &[u8] = b"vault";

/// Domain separator mixed into every derived address so that a derived
/// address can never collide with the BLAKE3 hash of some unrelated message.
pub const ADDRESS_DERIVATION_DOMAIN: &[u8] = b"LOCKBOX-ADDRESS-V1";

/// Domain separator prepended to the canonical request bytes before signing.
pub const REQUEST_SIGNING_DOMAIN: &[u8] = b"LOCKBOX-REQUEST-V1";

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 public key length in bytes.
pub const PUBKEY_LENGTH: usize = 32;

/// Ed25519 signature length in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Error Codes
// ---------------------------------------------------------------------------

/// First numeric error code. Codes are stable and contiguous from here, in
/// the order the variants appear in [`crate::vault::LockBoxError`].
pub const ERROR_CODE_BASE: u32 = 6000;

// ---------------------------------------------------------------------------
// Runtime Configuration
// ---------------------------------------------------------------------------

/// Operator-tunable parameters of a registry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockBoxConfig {
    /// Units reserved from the owner's ledger balance when a lockbox is
    /// created, and handed back when it is closed or emergency-drained.
    ///
    /// This is the storage reserve of the record, not savings: it never
    /// enters the custody pool and never counts toward the target.
    pub record_deposit: u64,
}

impl LockBoxConfig {
    /// Config with the given record deposit.
    pub fn with_record_deposit(record_deposit: u64) -> Self {
        Self { record_deposit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_are_distinct() {
        assert_ne!(LOCKBOX_SEED, VAULT_SEED);
        assert_ne!(ADDRESS_DERIVATION_DOMAIN, REQUEST_SIGNING_DOMAIN);
    }

    #[test]
    fn default_config_reserves_nothing() {
        assert_eq!(LockBoxConfig::default().record_deposit, 0);
        assert_eq!(LockBoxConfig::with_record_deposit(42).record_deposit, 42);
    }
}
