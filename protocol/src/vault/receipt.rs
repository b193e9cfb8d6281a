//! # Operations & Receipts
//!
//! Every successful mutating operation hands back a [`Receipt`] describing
//! exactly what moved. The external boundary shows it to the user; the CLI
//! prints it as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::keys::Pubkey;

/// The five mutating lockbox operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Create,
    Deposit,
    Withdraw,
    EmergencyWithdraw,
    Close,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Deposit => "deposit",
            Operation::Withdraw => "withdraw",
            Operation::EmergencyWithdraw => "emergency-withdraw",
            Operation::Close => "close",
        };
        f.write_str(name)
    }
}

/// Proof of a committed operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Unique receipt identifier.
    pub id: Uuid,
    pub operation: Operation,
    /// Owner of the lockbox.
    pub owner: Pubkey,
    /// Address of the lockbox record.
    pub lockbox: Pubkey,
    /// Units moved between the owner's ledger account and the custody
    /// pool. Zero for `create` and `close`.
    pub amount: u64,
    /// Record deposit moved: reserved on `create`, reclaimed on `close`
    /// and `emergency-withdraw`.
    pub reserve: u64,
    /// Vault balance after the operation. Zero once the record is gone.
    pub balance_after: u64,
    /// Whether the live balance meets the target after the operation.
    pub has_reached_target: bool,
    /// When the operation was committed.
    pub timestamp: DateTime<Utc>,
}

impl Receipt {
    pub(crate) fn new(operation: Operation, owner: Pubkey, lockbox: Pubkey) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation,
            owner,
            lockbox,
            amount: 0,
            reserve: 0,
            balance_after: 0,
            has_reached_target: false,
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn amount(mut self, amount: u64) -> Self {
        self.amount = amount;
        self
    }

    pub(crate) fn reserve(mut self, reserve: u64) -> Self {
        self.reserve = reserve;
        self
    }

    pub(crate) fn balance(mut self, balance_after: u64, has_reached_target: bool) -> Self {
        self.balance_after = balance_after;
        self.has_reached_target = has_reached_target;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_names_are_kebab_case() {
        assert_eq!(Operation::EmergencyWithdraw.to_string(), "emergency-withdraw");
        let json = serde_json::to_string(&Operation::EmergencyWithdraw).unwrap();
        assert_eq!(json, "\"emergency-withdraw\"");
    }

    #[test]
    fn receipts_get_unique_ids() {
        let owner = Pubkey::new([1; 32]);
        let a = Receipt::new(Operation::Deposit, owner, owner);
        let b = Receipt::new(Operation::Deposit, owner, owner);
        assert_ne!(a.id, b.id);
    }
}
