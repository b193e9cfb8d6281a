//! # External Ledger
//!
//! The general-purpose balances of identities, i.e. the money a user has
//! *outside* any lockbox. Deposits debit it, withdrawals credit it.
//!
//! The ledger is a sharded map (`DashMap`), so updates to different
//! accounts do not contend on a single lock. Each individual `credit` or
//! `debit` is atomic with respect to its account; multi-leg atomicity is
//! the registry's job.
//!
//! All arithmetic is checked. Money and wrapping arithmetic do not mix.

use std::collections::BTreeMap;

use dashmap::DashMap;
use thiserror::Error;

use crate::crypto::keys::Pubkey;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during ledger operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Attempted to debit more than the account holds.
    #[error("insufficient funds in {account}: required {required}, available {available}")]
    InsufficientFunds {
        account: Pubkey,
        required: u64,
        available: u64,
    },

    /// A credit would push the account past `u64::MAX`.
    #[error("balance overflow in {account}: current {current}, credit {credit}")]
    Overflow {
        account: Pubkey,
        current: u64,
        credit: u64,
    },
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Identity-keyed external balances.
#[derive(Debug, Default)]
pub struct Ledger {
    accounts: DashMap<Pubkey, u64>,
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger from persisted balances.
    pub fn from_balances(balances: BTreeMap<Pubkey, u64>) -> Self {
        Self {
            accounts: balances.into_iter().collect(),
        }
    }

    /// Balance of `account`; zero for accounts never seen.
    pub fn balance_of(&self, account: &Pubkey) -> u64 {
        self.accounts.get(account).map(|b| *b).unwrap_or(0)
    }

    /// Mints `amount` into `account`. This is the faucet: the only way new
    /// units enter the system.
    pub fn fund(&self, account: &Pubkey, amount: u64) -> Result<u64, LedgerError> {
        let balance = self.credit(account, amount)?;
        tracing::debug!(%account, amount, balance, "ledger account funded");
        Ok(balance)
    }

    /// Adds `amount` to `account`, creating the entry if needed.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] if the credit would exceed `u64::MAX`.
    /// The balance is untouched in that case.
    pub fn credit(&self, account: &Pubkey, amount: u64) -> Result<u64, LedgerError> {
        let mut balance = self.accounts.entry(*account).or_insert(0);
        let updated = balance.checked_add(amount).ok_or(LedgerError::Overflow {
            account: *account,
            current: *balance,
            credit: amount,
        })?;
        *balance = updated;
        Ok(updated)
    }

    /// Removes `amount` from `account`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientFunds`] if the account holds less
    /// than `amount`. The balance is untouched in that case.
    pub fn debit(&self, account: &Pubkey, amount: u64) -> Result<u64, LedgerError> {
        let insufficient = |available| LedgerError::InsufficientFunds {
            account: *account,
            required: amount,
            available,
        };
        // get_mut, not entry: a failed debit must not create an account.
        let Some(mut balance) = self.accounts.get_mut(account) else {
            return if amount == 0 { Ok(0) } else { Err(insufficient(0)) };
        };
        if *balance < amount {
            return Err(insufficient(*balance));
        }
        *balance -= amount;
        Ok(*balance)
    }

    /// Sum of every account, or `None` if it does not fit in a `u64`.
    pub fn total(&self) -> Option<u64> {
        self.accounts
            .iter()
            .try_fold(0u64, |acc, entry| acc.checked_add(*entry.value()))
    }

    /// Point-in-time copy of all balances, sorted by account.
    pub fn balances(&self) -> BTreeMap<Pubkey, u64> {
        self.accounts
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }

    /// Number of accounts ever touched (including zero balances).
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(byte: u8) -> Pubkey {
        Pubkey::new([byte; 32])
    }

    #[test]
    fn unknown_account_has_zero_balance() {
        let ledger = Ledger::new();
        assert_eq!(ledger.balance_of(&account(1)), 0);
    }

    #[test]
    fn credit_accumulates() {
        let ledger = Ledger::new();
        ledger.credit(&account(1), 500).unwrap();
        ledger.credit(&account(1), 300).unwrap();
        assert_eq!(ledger.balance_of(&account(1)), 800);
    }

    #[test]
    fn credit_overflow_rejected_and_balance_kept() {
        let ledger = Ledger::new();
        ledger.fund(&account(1), u64::MAX).unwrap();
        let err = ledger.credit(&account(1), 1).unwrap_err();
        assert!(matches!(err, LedgerError::Overflow { .. }));
        assert_eq!(ledger.balance_of(&account(1)), u64::MAX);
    }

    #[test]
    fn debit_to_zero() {
        let ledger = Ledger::new();
        ledger.fund(&account(1), 500).unwrap();
        assert_eq!(ledger.debit(&account(1), 500).unwrap(), 0);
    }

    #[test]
    fn debit_insufficient_rejected() {
        let ledger = Ledger::new();
        ledger.fund(&account(1), 100).unwrap();
        let err = ledger.debit(&account(1), 200).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                account: account(1),
                required: 200,
                available: 100,
            }
        );
        assert_eq!(ledger.balance_of(&account(1)), 100);
    }

    #[test]
    fn total_sums_all_accounts() {
        let ledger = Ledger::new();
        ledger.fund(&account(1), 10).unwrap();
        ledger.fund(&account(2), 32).unwrap();
        assert_eq!(ledger.total(), Some(42));
        assert_eq!(ledger.account_count(), 2);
    }

    #[test]
    fn total_reports_overflow_as_none() {
        let ledger = Ledger::new();
        ledger.fund(&account(1), u64::MAX).unwrap();
        ledger.fund(&account(2), 1).unwrap();
        assert_eq!(ledger.total(), None);
    }

    #[test]
    fn balances_roundtrip_through_from_balances() {
        let ledger = Ledger::new();
        ledger.fund(&account(1), 7).unwrap();
        ledger.fund(&account(2), 9).unwrap();
        let rebuilt = Ledger::from_balances(ledger.balances());
        assert_eq!(rebuilt.balance_of(&account(1)), 7);
        assert_eq!(rebuilt.balance_of(&account(2)), 9);
    }
}
