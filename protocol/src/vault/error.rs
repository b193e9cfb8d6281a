//! # LockBox Errors
//!
//! One error enum for every rejection the vault can produce. Each variant
//! belongs to an [`ErrorKind`] and carries a stable numeric [`code`]
//! (starting at [`ERROR_CODE_BASE`]) so that clients can decide what to do
//! next without string matching: deposit more and retry, fix the input, or
//! give up.
//!
//! Every error is raised before anything is mutated. If you see one, the
//! record, the custody pool and the ledger are exactly as they were.
//!
//! [`code`]: LockBoxError::code

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ERROR_CODE_BASE;
use crate::crypto::keys::Pubkey;

use super::ledger::LedgerError;
use super::receipt::Operation;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Coarse classification of a [`LockBoxError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Bad caller input (zero deposit, zero target).
    Validation,
    /// Caller is not the owner, or the request signature is bad.
    Authorization,
    /// No lockbox for that owner.
    NotFound,
    /// Operation not permitted in the current vault state.
    StateConflict,
    /// Resource already exists.
    Resource,
    /// The custody transfer leg failed (funds or arithmetic).
    CustodyTransfer,
    /// Bookkeeping and custody diverged. Never expected.
    Integrity,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Authorization => "authorization",
            ErrorKind::NotFound => "not-found",
            ErrorKind::StateConflict => "state-conflict",
            ErrorKind::Resource => "resource",
            ErrorKind::CustodyTransfer => "custody-transfer",
            ErrorKind::Integrity => "integrity",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// LockBoxError
// ---------------------------------------------------------------------------

/// Errors that can occur during lockbox operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LockBoxError {
    /// `create` with a target of zero.
    #[error("target amount must be greater than zero")]
    InvalidTargetAmount,

    /// `deposit` of zero units.
    #[error("deposit amount must be greater than zero")]
    InvalidDepositAmount,

    /// The caller is not the owner of the addressed lockbox.
    #[error("caller {caller} is not authorized to act on the lockbox of {owner}")]
    Unauthorized {
        /// Identity that submitted the request.
        caller: Pubkey,
        /// Owner of the addressed lockbox.
        owner: Pubkey,
    },

    /// The request signature does not verify against the claimed caller.
    #[error("request signature does not verify for caller {caller}")]
    InvalidSignature {
        /// The identity the request claims to come from.
        caller: Pubkey,
    },

    /// The owner has no lockbox (never created, or already terminated).
    #[error("no lockbox exists for owner {owner}")]
    NotFound {
        /// Owner that was looked up.
        owner: Pubkey,
    },

    /// The owner already has a lockbox.
    #[error("owner {owner} already has a lockbox")]
    AlreadyExists {
        /// Owner whose lockbox already exists.
        owner: Pubkey,
    },

    /// Withdrawal is still locked: the target has never been reached.
    #[error("target not reached: balance {balance} of {target}")]
    TargetNotReached {
        /// Current vault balance.
        balance: u64,
        /// The target that unlocks withdrawal.
        target: u64,
    },

    /// The vault balance does not allow this operation: a withdrawal of
    /// zero or of more than the balance, an emergency withdrawal of an empty
    /// vault, or a close of a non-empty one.
    #[error("vault balance {available} does not permit {operation}")]
    InsufficientBalance {
        /// Operation that was rejected.
        operation: Operation,
        /// Current vault balance.
        available: u64,
    },

    /// The caller's ledger account cannot cover the transfer.
    #[error("insufficient funds in {account}: required {required}, available {available}")]
    InsufficientFunds {
        /// Ledger account that was to be debited.
        account: Pubkey,
        /// Amount the transfer needed.
        required: u64,
        /// Amount the account holds.
        available: u64,
    },

    /// A balance would exceed `u64::MAX`. Fails closed instead of wrapping.
    #[error("arithmetic overflow: balance update would exceed u64::MAX")]
    ArithmeticOverflow,

    /// The custody pool and the record's books disagree. This is a bug or
    /// a corrupt snapshot; the vault refuses to touch it.
    #[error("custody mismatch on lockbox {lockbox}: {detail}")]
    CustodyMismatch {
        /// The affected lockbox.
        lockbox: Pubkey,
        /// What exactly disagrees.
        detail: String,
    },
}

impl LockBoxError {
    /// The coarse class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LockBoxError::InvalidTargetAmount | LockBoxError::InvalidDepositAmount => {
                ErrorKind::Validation
            }
            LockBoxError::Unauthorized { .. } | LockBoxError::InvalidSignature { .. } => {
                ErrorKind::Authorization
            }
            LockBoxError::NotFound { .. } => ErrorKind::NotFound,
            LockBoxError::TargetNotReached { .. } | LockBoxError::InsufficientBalance { .. } => {
                ErrorKind::StateConflict
            }
            LockBoxError::AlreadyExists { .. } => ErrorKind::Resource,
            LockBoxError::InsufficientFunds { .. } | LockBoxError::ArithmeticOverflow => {
                ErrorKind::CustodyTransfer
            }
            LockBoxError::CustodyMismatch { .. } => ErrorKind::Integrity,
        }
    }

    /// Stable numeric code. Never renumber: clients persist these.
    pub fn code(&self) -> u32 {
        let offset = match self {
            LockBoxError::InvalidTargetAmount => 0,
            LockBoxError::InvalidDepositAmount => 1,
            LockBoxError::Unauthorized { .. } => 2,
            LockBoxError::InvalidSignature { .. } => 3,
            LockBoxError::NotFound { .. } => 4,
            LockBoxError::AlreadyExists { .. } => 5,
            LockBoxError::TargetNotReached { .. } => 6,
            LockBoxError::InsufficientBalance { .. } => 7,
            LockBoxError::InsufficientFunds { .. } => 8,
            LockBoxError::ArithmeticOverflow => 9,
            LockBoxError::CustodyMismatch { .. } => 10,
        };
        ERROR_CODE_BASE + offset
    }
}

impl From<LedgerError> for LockBoxError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds {
                account,
                required,
                available,
            } => LockBoxError::InsufficientFunds {
                account,
                required,
                available,
            },
            LedgerError::Overflow { .. } => LockBoxError::ArithmeticOverflow,
        }
    }
}
