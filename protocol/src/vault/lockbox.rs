//! # LockBox State Machine
//!
//! A [`LockBox`] is the bookkeeping record of one owner's savings goal; a
//! [`Vault`] pairs it with the [`CustodyPool`] holding the actual funds.
//! The two are only ever mutated together, by the transition methods on
//! `Vault`, and every transition is all-or-nothing: validation and checked
//! arithmetic happen before the first field is written.
//!
//! ## Phases
//!
//! ```text
//!              deposit                deposit (balance >= target)
//!  ┌──────────┐ ─────► ┌──────────────┐ ─────► ┌───────────────┐
//!  │ Unfunded │        │ Accumulating │        │ TargetReached │
//!  └──────────┘ ◄───── └──────────────┘ ◄───── └───────────────┘
//!                withdraw (only once unlocked)
//! ```
//!
//! Phases are derived from the balance, never stored. The record caches
//! `has_reached_target` (live `balance >= target`) and latches `unlocked`
//! the first time the target is met. The withdrawal gate reads the latch:
//! a saver who reached their goal may draw it down in several steps without
//! re-locking halfway.
//!
//! Termination (`close`, `emergency-withdraw`) is handled by the registry,
//! which deletes the vault after the checks here pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::hash::lockbox_address;
use crate::crypto::keys::Pubkey;

use super::custody::CustodyPool;
use super::error::LockBoxError;
use super::receipt::Operation;

// ---------------------------------------------------------------------------
// VaultPhase
// ---------------------------------------------------------------------------

/// Derived lifecycle phase of a vault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VaultPhase {
    /// Balance is zero.
    Unfunded,
    /// `0 < balance < target`.
    Accumulating,
    /// `balance >= target`.
    TargetReached,
}

impl std::fmt::Display for VaultPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VaultPhase::Unfunded => write!(f, "Unfunded"),
            VaultPhase::Accumulating => write!(f, "Accumulating"),
            VaultPhase::TargetReached => write!(f, "TargetReached"),
        }
    }
}

// ---------------------------------------------------------------------------
// LockBox
// ---------------------------------------------------------------------------

/// The bookkeeping record of a savings vault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockBox {
    /// The only identity allowed to act on this record.
    owner: Pubkey,
    /// Derived from `owner`; the key the registry stores this record under.
    address: Pubkey,
    /// Balance that unlocks withdrawal. Always positive, never changes.
    target_amount: u64,
    /// Units held in custody for this record.
    current_balance: u64,
    /// Cached `current_balance >= target_amount`.
    has_reached_target: bool,
    /// Latched the first time the target was met. Gates `withdraw`.
    unlocked: bool,
    /// Record deposit taken from the owner at creation.
    reserve: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LockBox {
    /// A fresh record at balance zero.
    ///
    /// # Errors
    ///
    /// Returns [`LockBoxError::InvalidTargetAmount`] if `target_amount` is 0.
    pub fn new(owner: Pubkey, target_amount: u64, reserve: u64) -> Result<Self, LockBoxError> {
        if target_amount == 0 {
            return Err(LockBoxError::InvalidTargetAmount);
        }
        let now = Utc::now();
        Ok(Self {
            owner,
            address: lockbox_address(&owner),
            target_amount,
            current_balance: 0,
            has_reached_target: false,
            unlocked: false,
            reserve,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn owner(&self) -> Pubkey {
        self.owner
    }

    pub fn address(&self) -> Pubkey {
        self.address
    }

    pub fn target_amount(&self) -> u64 {
        self.target_amount
    }

    pub fn current_balance(&self) -> u64 {
        self.current_balance
    }

    pub fn has_reached_target(&self) -> bool {
        self.has_reached_target
    }

    /// Whether normal withdrawal is allowed.
    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn reserve(&self) -> u64 {
        self.reserve
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Units still missing to reach the target.
    pub fn remaining_to_target(&self) -> u64 {
        self.target_amount.saturating_sub(self.current_balance)
    }

    pub fn phase(&self) -> VaultPhase {
        if self.current_balance == 0 {
            VaultPhase::Unfunded
        } else if self.current_balance < self.target_amount {
            VaultPhase::Accumulating
        } else {
            VaultPhase::TargetReached
        }
    }

    fn set_balance(&mut self, balance: u64) {
        self.current_balance = balance;
        self.has_reached_target = balance >= self.target_amount;
        if self.has_reached_target {
            self.unlocked = true;
        }
        self.updated_at = Utc::now();
    }
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// A lockbox record and its custody pool, mutated as one unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    lockbox: LockBox,
    custody: CustodyPool,
}

impl Vault {
    /// Opens a vault for `owner` with an empty custody pool.
    pub fn open(owner: Pubkey, target_amount: u64, reserve: u64) -> Result<Self, LockBoxError> {
        let lockbox = LockBox::new(owner, target_amount, reserve)?;
        let custody = CustodyPool::open(&lockbox.address());
        Ok(Self { lockbox, custody })
    }

    pub fn lockbox(&self) -> &LockBox {
        &self.lockbox
    }

    pub fn custody(&self) -> &CustodyPool {
        &self.custody
    }

    pub fn owner(&self) -> Pubkey {
        self.lockbox.owner
    }

    pub fn balance(&self) -> u64 {
        self.lockbox.current_balance
    }

    pub fn phase(&self) -> VaultPhase {
        self.lockbox.phase()
    }

    /// Rejects any caller other than the owner.
    pub fn authorize(&self, caller: &Pubkey) -> Result<(), LockBoxError> {
        if *caller != self.lockbox.owner {
            return Err(LockBoxError::Unauthorized {
                caller: *caller,
                owner: self.lockbox.owner,
            });
        }
        Ok(())
    }

    /// Books `amount` into the record and the custody pool.
    ///
    /// Allowed in every phase. Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`LockBoxError::InvalidDepositAmount`] for zero and
    /// [`LockBoxError::ArithmeticOverflow`] if either balance would wrap.
    pub fn deposit(&mut self, amount: u64) -> Result<u64, LockBoxError> {
        if amount == 0 {
            return Err(LockBoxError::InvalidDepositAmount);
        }
        let balance = self
            .lockbox
            .current_balance
            .checked_add(amount)
            .ok_or(LockBoxError::ArithmeticOverflow)?;
        let pooled = self.custody.credited(amount)?;

        self.lockbox.set_balance(balance);
        self.custody.set_balance(pooled);
        Ok(balance)
    }

    /// Takes `amount` out of the record and the custody pool.
    ///
    /// # Errors
    ///
    /// - [`LockBoxError::TargetNotReached`] while the vault has never met
    ///   its target.
    /// - [`LockBoxError::InsufficientBalance`] unless
    ///   `0 < amount <= balance`.
    pub fn withdraw(&mut self, amount: u64) -> Result<u64, LockBoxError> {
        if !self.lockbox.unlocked {
            return Err(LockBoxError::TargetNotReached {
                balance: self.lockbox.current_balance,
                target: self.lockbox.target_amount,
            });
        }
        if amount == 0 || amount > self.lockbox.current_balance {
            return Err(LockBoxError::InsufficientBalance {
                operation: Operation::Withdraw,
                available: self.lockbox.current_balance,
            });
        }
        let balance = self.lockbox.current_balance - amount;
        let pooled = self.custody.debited(amount)?;

        self.lockbox.set_balance(balance);
        self.custody.set_balance(pooled);
        Ok(balance)
    }

    /// Empties the vault regardless of the target. Returns the amount
    /// drained.
    ///
    /// # Errors
    ///
    /// Returns [`LockBoxError::InsufficientBalance`] on an empty vault:
    /// there is nothing to rescue, use close instead.
    pub fn drain(&mut self) -> Result<u64, LockBoxError> {
        let amount = self.lockbox.current_balance;
        if amount == 0 {
            return Err(LockBoxError::InsufficientBalance {
                operation: Operation::EmergencyWithdraw,
                available: 0,
            });
        }
        let pooled = self.custody.debited(amount)?;

        self.lockbox.set_balance(0);
        self.custody.set_balance(pooled);
        Ok(amount)
    }

    /// Checks that the vault may be closed: nothing left in custody.
    pub fn ensure_closable(&self) -> Result<(), LockBoxError> {
        let held = self.custody.balance().max(self.lockbox.current_balance);
        if held != 0 {
            return Err(LockBoxError::InsufficientBalance {
                operation: Operation::Close,
                available: held,
            });
        }
        Ok(())
    }

    /// Verifies every structural invariant of the vault.
    ///
    /// Run after each committed transition in debug builds and on every
    /// vault loaded from a snapshot.
    pub fn check_invariants(&self) -> Result<(), LockBoxError> {
        let lockbox = &self.lockbox;
        let mismatch = |detail: String| LockBoxError::CustodyMismatch {
            lockbox: lockbox.address,
            detail,
        };

        if lockbox.target_amount == 0 {
            return Err(mismatch("target amount is zero".into()));
        }
        if lockbox.address != lockbox_address(&lockbox.owner) {
            return Err(mismatch("record address is not derived from its owner".into()));
        }
        if !self.custody.belongs_to(&lockbox.address) {
            return Err(mismatch("custody pool is not derived from the record".into()));
        }
        if self.custody.balance() != lockbox.current_balance {
            return Err(mismatch(format!(
                "custody holds {} but record books {}",
                self.custody.balance(),
                lockbox.current_balance
            )));
        }
        if lockbox.has_reached_target != (lockbox.current_balance >= lockbox.target_amount) {
            return Err(mismatch("stale has_reached_target flag".into()));
        }
        if lockbox.has_reached_target && !lockbox.unlocked {
            return Err(mismatch("target reached but withdrawal still locked".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Pubkey {
        Pubkey::new([0xA1; 32])
    }

    fn vault(target: u64) -> Vault {
        Vault::open(owner(), target, 0).unwrap()
    }

    #[test]
    fn open_starts_unfunded() {
        let v = vault(100);
        assert_eq!(v.balance(), 0);
        assert_eq!(v.phase(), VaultPhase::Unfunded);
        assert!(!v.lockbox().has_reached_target());
        assert!(!v.lockbox().is_unlocked());
        assert_eq!(v.lockbox().address(), lockbox_address(&owner()));
        v.check_invariants().unwrap();
    }

    #[test]
    fn zero_target_rejected() {
        assert_eq!(
            Vault::open(owner(), 0, 0).unwrap_err(),
            LockBoxError::InvalidTargetAmount
        );
    }

    #[test]
    fn max_target_accepted() {
        let v = vault(u64::MAX);
        assert_eq!(v.lockbox().target_amount(), u64::MAX);
    }

    #[test]
    fn deposits_accumulate_and_cross_target_inclusively() {
        let mut v = vault(5);
        v.deposit(2).unwrap();
        assert_eq!(v.phase(), VaultPhase::Accumulating);
        assert_eq!(v.lockbox().remaining_to_target(), 3);
        v.deposit(3).unwrap();
        assert_eq!(v.balance(), 5);
        assert_eq!(v.phase(), VaultPhase::TargetReached);
        assert!(v.lockbox().has_reached_target());
        assert!(v.lockbox().is_unlocked());
        assert_eq!(v.custody().balance(), 5);
        v.check_invariants().unwrap();
    }

    #[test]
    fn zero_deposit_rejected() {
        let mut v = vault(5);
        assert_eq!(v.deposit(0), Err(LockBoxError::InvalidDepositAmount));
    }

    #[test]
    fn deposit_overflow_fails_closed() {
        let mut v = vault(10);
        v.deposit(u64::MAX).unwrap();
        let before = v.clone();
        assert_eq!(v.deposit(1), Err(LockBoxError::ArithmeticOverflow));
        assert_eq!(v, before);
    }

    #[test]
    fn withdraw_locked_below_target() {
        let mut v = vault(5);
        v.deposit(4).unwrap();
        assert_eq!(
            v.withdraw(1),
            Err(LockBoxError::TargetNotReached { balance: 4, target: 5 })
        );
        assert_eq!(v.balance(), 4);
    }

    #[test]
    fn withdraw_more_than_balance_rejected() {
        let mut v = vault(5);
        v.deposit(5).unwrap();
        assert!(matches!(
            v.withdraw(6),
            Err(LockBoxError::InsufficientBalance { available: 5, .. })
        ));
        assert_eq!(v.balance(), 5);
    }

    #[test]
    fn withdraw_zero_is_insufficient_balance_once_unlocked() {
        let mut v = vault(5);
        v.deposit(2).unwrap();
        // Still locked: the gate is checked first.
        assert!(matches!(v.withdraw(0), Err(LockBoxError::TargetNotReached { .. })));

        v.deposit(3).unwrap();
        let before = v.clone();
        assert_eq!(
            v.withdraw(0),
            Err(LockBoxError::InsufficientBalance {
                operation: Operation::Withdraw,
                available: 5
            })
        );
        assert_eq!(v, before);
    }

    #[test]
    fn unlock_latches_after_dropping_below_target() {
        let mut v = vault(5);
        v.deposit(5).unwrap();
        assert_eq!(v.withdraw(2).unwrap(), 3);
        assert!(!v.lockbox().has_reached_target());
        assert!(v.lockbox().is_unlocked());
        assert_eq!(v.withdraw(1).unwrap(), 2);
        v.check_invariants().unwrap();
    }

    #[test]
    fn drain_empties_regardless_of_target() {
        let mut v = vault(100);
        v.deposit(7).unwrap();
        assert_eq!(v.drain().unwrap(), 7);
        assert_eq!(v.balance(), 0);
        assert_eq!(v.custody().balance(), 0);
        v.check_invariants().unwrap();
    }

    #[test]
    fn drain_of_empty_vault_rejected() {
        let mut v = vault(100);
        assert!(matches!(
            v.drain(),
            Err(LockBoxError::InsufficientBalance {
                operation: Operation::EmergencyWithdraw,
                available: 0
            })
        ));
    }

    #[test]
    fn closable_only_when_empty() {
        let mut v = vault(3);
        v.ensure_closable().unwrap();
        v.deposit(1).unwrap();
        assert!(matches!(
            v.ensure_closable(),
            Err(LockBoxError::InsufficientBalance {
                operation: Operation::Close,
                available: 1
            })
        ));
    }

    #[test]
    fn authorize_rejects_strangers() {
        let v = vault(3);
        v.authorize(&owner()).unwrap();
        let stranger = Pubkey::new([0xB2; 32]);
        assert_eq!(
            v.authorize(&stranger),
            Err(LockBoxError::Unauthorized {
                caller: stranger,
                owner: owner()
            })
        );
    }

    #[test]
    fn invariants_catch_divergent_custody() {
        let mut v = vault(3);
        v.deposit(2).unwrap();
        v.custody.set_balance(1);
        assert!(matches!(
            v.check_invariants(),
            Err(LockBoxError::CustodyMismatch { .. })
        ));
    }

    #[test]
    fn invariants_catch_stale_flag() {
        let mut v = vault(3);
        v.deposit(3).unwrap();
        v.lockbox.has_reached_target = false;
        assert!(v.check_invariants().is_err());
    }

    #[test]
    fn vault_serialization_roundtrip() {
        let mut v = vault(10);
        v.deposit(4).unwrap();
        let json = serde_json::to_string(&v).expect("serialize");
        let recovered: Vault = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(recovered, v);
        recovered.check_invariants().unwrap();
    }
}
