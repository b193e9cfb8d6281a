//! # Vault Module — Target-Gated Savings
//!
//! The vault is where savings live in LockBox. An owner declares a target,
//! deposits toward it, and can withdraw only once the target has been
//! reached, or bail out early by emergency-withdrawing everything and
//! giving up the lockbox.
//!
//! ## Architecture
//!
//! ```text
//! lockbox.rs  — LockBox record + custody pool (Vault), phases, transitions
//! custody.rs  — Custody pool: the segregated balance behind a record
//! ledger.rs   — External balances of identities (DashMap-sharded)
//! registry.rs — Owner → vault store; the only mutation boundary
//! receipt.rs  — Operation names and receipts of committed operations
//! error.rs    — LockBoxError, its kinds and stable codes
//! ```
//!
//! ## Design Principles
//!
//! 1. **All amounts are `u64` in the smallest unit.** All arithmetic is
//!    checked and fails closed.
//! 2. **Custody and books are one unit.** The custody pool always holds
//!    exactly the record's balance; every transition updates both or
//!    neither.
//! 3. **Validate, stage, transfer, commit.** Nothing is written until every
//!    check, including the ledger leg, has passed.
//! 4. **Serializable state.** Every record derives `Serialize` and
//!    `Deserialize` so the registry can be snapshotted and restored.

pub mod custody;
pub mod error;
pub mod ledger;
pub mod lockbox;
pub mod receipt;
pub mod registry;

pub use custody::CustodyPool;
pub use error::{ErrorKind, LockBoxError};
pub use ledger::{Ledger, LedgerError};
pub use lockbox::{LockBox, Vault, VaultPhase};
pub use receipt::{Operation, Receipt};
pub use registry::LockBoxRegistry;
