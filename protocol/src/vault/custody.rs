//! # Custody Pool
//!
//! The segregated balance that actually holds a lockbox's savings. It is
//! addressed from the lockbox record (`derive([VAULT_SEED, lockbox])`) and
//! must hold exactly the record's `current_balance` at all times.
//!
//! A pool never moves on its own. It is only ever touched from inside its
//! vault's critical section, through the checked helpers below, which
//! return the would-be balance instead of mutating so the caller can stage
//! a whole transition before committing any of it.

use serde::{Deserialize, Serialize};

use crate::crypto::hash::custody_address;
use crate::crypto::keys::Pubkey;

use super::error::LockBoxError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyPool {
    address: Pubkey,
    balance: u64,
}

impl CustodyPool {
    /// An empty pool for the lockbox at `lockbox`.
    pub fn open(lockbox: &Pubkey) -> Self {
        Self {
            address: custody_address(lockbox),
            balance: 0,
        }
    }

    pub fn address(&self) -> Pubkey {
        self.address
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// Balance after receiving `amount`.
    pub fn credited(&self, amount: u64) -> Result<u64, LockBoxError> {
        self.balance
            .checked_add(amount)
            .ok_or(LockBoxError::ArithmeticOverflow)
    }

    /// Balance after paying out `amount`. Callers check sufficiency against
    /// the record first; this only guards the arithmetic.
    pub fn debited(&self, amount: u64) -> Result<u64, LockBoxError> {
        self.balance
            .checked_sub(amount)
            .ok_or(LockBoxError::ArithmeticOverflow)
    }

    pub(crate) fn set_balance(&mut self, balance: u64) {
        self.balance = balance;
    }

    /// Whether this pool sits at the address derived from `lockbox`.
    pub fn belongs_to(&self, lockbox: &Pubkey) -> bool {
        self.address == custody_address(lockbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_pool_is_empty_and_derived() {
        let lockbox = Pubkey::new([9; 32]);
        let pool = CustodyPool::open(&lockbox);
        assert_eq!(pool.balance(), 0);
        assert!(pool.belongs_to(&lockbox));
        assert!(!pool.belongs_to(&Pubkey::new([8; 32])));
    }

    #[test]
    fn staged_arithmetic_does_not_mutate() {
        let mut pool = CustodyPool::open(&Pubkey::new([9; 32]));
        pool.set_balance(10);
        assert_eq!(pool.credited(5).unwrap(), 15);
        assert_eq!(pool.debited(4).unwrap(), 6);
        assert_eq!(pool.balance(), 10);
    }

    #[test]
    fn staged_arithmetic_fails_closed() {
        let mut pool = CustodyPool::open(&Pubkey::new([9; 32]));
        pool.set_balance(u64::MAX);
        assert_eq!(pool.credited(1), Err(LockBoxError::ArithmeticOverflow));
        pool.set_balance(0);
        assert_eq!(pool.debited(1), Err(LockBoxError::ArithmeticOverflow));
    }
}
