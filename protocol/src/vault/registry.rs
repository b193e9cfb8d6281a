//! # LockBox Registry
//!
//! The registry maps each owner to at most one [`Vault`] and is the only
//! way to mutate one. It also owns the external [`Ledger`], so that the
//! bookkeeping change and the custody transfer of an operation commit
//! together or not at all.
//!
//! ## Concurrency
//!
//! ```text
//! gate: RwLock<()>                       every operation holds it shared,
//!   │                                    snapshot() holds it exclusive
//!   └─ vaults: RwLock<HashMap<lockbox address, Slot>>
//!        └─ Slot = Arc<Mutex<Option<Vault>>>   one lock per vault
//! ```
//!
//! Operations on different owners only share the index read lock for the
//! instant it takes to clone a slot handle; after that they run in
//! parallel. Operations on the same owner serialize on the slot mutex for
//! the whole validate → stage → transfer → commit sequence.
//!
//! Lock order is always slot, then index. The index lock is never held
//! while waiting on a slot, so retiring a vault (which takes the index
//! write lock with its slot held) cannot deadlock. A retired slot is left
//! as `None`: anyone who cloned the handle before the retirement sees
//! `NotFound` once they get the lock.
//!
//! ## Check order
//!
//! Input validation, then authorization, then existence, then vault state,
//! then the ledger leg. The first failure wins and nothing has been
//! touched.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::config::LockBoxConfig;
use crate::crypto::hash::lockbox_address;
use crate::crypto::keys::Pubkey;
use crate::instruction::{Instruction, Request, SignedRequest};
use crate::storage::snapshot::{RegistrySnapshot, SnapshotError};

use super::error::LockBoxError;
use super::ledger::Ledger;
use super::lockbox::Vault;
use super::receipt::{Operation, Receipt};

type Slot = Arc<Mutex<Option<Vault>>>;

/// Identity-keyed store of lockboxes plus the ledger they draw from.
#[derive(Debug, Default)]
pub struct LockBoxRegistry {
    config: LockBoxConfig,
    ledger: Ledger,
    vaults: RwLock<HashMap<Pubkey, Slot>>,
    gate: RwLock<()>,
}

impl LockBoxRegistry {
    /// An empty registry with an empty ledger.
    pub fn new(config: LockBoxConfig) -> Self {
        Self::with_ledger(config, Ledger::new())
    }

    /// An empty registry drawing on an existing ledger.
    pub fn with_ledger(config: LockBoxConfig, ledger: Ledger) -> Self {
        Self {
            config,
            ledger,
            vaults: RwLock::new(HashMap::new()),
            gate: RwLock::new(()),
        }
    }

    pub fn config(&self) -> &LockBoxConfig {
        &self.config
    }

    /// The external ledger. Use it to fund accounts and read balances.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Number of live lockboxes.
    pub fn len(&self) -> usize {
        self.vaults.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `owner` currently has a lockbox.
    pub fn contains(&self, owner: &Pubkey) -> bool {
        self.read(owner).is_ok()
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Creates the lockbox of `owner` with the given target.
    ///
    /// Reserves [`LockBoxConfig::record_deposit`] from the owner's ledger
    /// account.
    ///
    /// # Errors
    ///
    /// [`LockBoxError::InvalidTargetAmount`], [`LockBoxError::Unauthorized`],
    /// [`LockBoxError::AlreadyExists`], or [`LockBoxError::InsufficientFunds`]
    /// when the owner cannot cover the record deposit.
    pub fn create(
        &self,
        caller: &Pubkey,
        owner: &Pubkey,
        target_amount: u64,
    ) -> Result<Receipt, LockBoxError> {
        let _gate = self.gate.read();
        let result = self.create_inner(caller, owner, target_amount);
        observe(Operation::Create, owner, result)
    }

    fn create_inner(
        &self,
        caller: &Pubkey,
        owner: &Pubkey,
        target_amount: u64,
    ) -> Result<Receipt, LockBoxError> {
        if target_amount == 0 {
            return Err(LockBoxError::InvalidTargetAmount);
        }
        ensure_owner(caller, owner)?;

        let reserve = self.config.record_deposit;
        let vault = Vault::open(*owner, target_amount, reserve)?;
        let address = vault.lockbox().address();

        let mut vaults = self.vaults.write();
        if vaults.contains_key(&address) {
            return Err(LockBoxError::AlreadyExists { owner: *owner });
        }
        if reserve > 0 {
            self.ledger.debit(owner, reserve)?;
        }
        vaults.insert(address, Arc::new(Mutex::new(Some(vault))));

        info!(
            %owner,
            lockbox = %address,
            target_amount,
            reserve,
            "lockbox created"
        );
        Ok(Receipt::new(Operation::Create, *owner, address).reserve(reserve))
    }

    /// Moves `amount` from the caller's ledger account into custody.
    ///
    /// # Errors
    ///
    /// [`LockBoxError::InvalidDepositAmount`], [`LockBoxError::Unauthorized`],
    /// [`LockBoxError::NotFound`], [`LockBoxError::InsufficientFunds`] or
    /// [`LockBoxError::ArithmeticOverflow`].
    pub fn deposit(
        &self,
        caller: &Pubkey,
        owner: &Pubkey,
        amount: u64,
    ) -> Result<Receipt, LockBoxError> {
        let _gate = self.gate.read();
        let result = self.deposit_inner(caller, owner, amount);
        observe(Operation::Deposit, owner, result)
    }

    fn deposit_inner(
        &self,
        caller: &Pubkey,
        owner: &Pubkey,
        amount: u64,
    ) -> Result<Receipt, LockBoxError> {
        if amount == 0 {
            return Err(LockBoxError::InvalidDepositAmount);
        }
        ensure_owner(caller, owner)?;

        let slot = self.slot(owner)?;
        let mut guard = slot.lock();
        let vault = guard.as_mut().ok_or(LockBoxError::NotFound { owner: *owner })?;
        vault.authorize(caller)?;

        let mut staged = vault.clone();
        let balance = staged.deposit(amount)?;
        self.ledger.debit(caller, amount)?;
        *vault = staged;
        debug_assert!(vault.check_invariants().is_ok());

        info!(%owner, amount, balance, phase = %vault.phase(), "deposit applied");
        Ok(Receipt::new(Operation::Deposit, *owner, vault.lockbox().address())
            .amount(amount)
            .balance(balance, vault.lockbox().has_reached_target()))
    }

    /// Moves `amount` from custody back to the owner's ledger account.
    ///
    /// # Errors
    ///
    /// [`LockBoxError::Unauthorized`], [`LockBoxError::NotFound`],
    /// [`LockBoxError::TargetNotReached`],
    /// [`LockBoxError::InsufficientBalance`] (zero, or more than the
    /// balance) or
    /// [`LockBoxError::ArithmeticOverflow`] if the owner's ledger account
    /// cannot absorb the payout.
    pub fn withdraw(
        &self,
        caller: &Pubkey,
        owner: &Pubkey,
        amount: u64,
    ) -> Result<Receipt, LockBoxError> {
        let _gate = self.gate.read();
        let result = self.withdraw_inner(caller, owner, amount);
        observe(Operation::Withdraw, owner, result)
    }

    fn withdraw_inner(
        &self,
        caller: &Pubkey,
        owner: &Pubkey,
        amount: u64,
    ) -> Result<Receipt, LockBoxError> {
        ensure_owner(caller, owner)?;

        let slot = self.slot(owner)?;
        let mut guard = slot.lock();
        let vault = guard.as_mut().ok_or(LockBoxError::NotFound { owner: *owner })?;
        vault.authorize(caller)?;

        let mut staged = vault.clone();
        let balance = staged.withdraw(amount)?;
        self.ledger.credit(owner, amount)?;
        *vault = staged;
        debug_assert!(vault.check_invariants().is_ok());

        info!(%owner, amount, balance, phase = %vault.phase(), "withdrawal applied");
        Ok(Receipt::new(Operation::Withdraw, *owner, vault.lockbox().address())
            .amount(amount)
            .balance(balance, vault.lockbox().has_reached_target()))
    }

    /// Drains the whole vault to the owner, ignoring the target, and
    /// deletes the lockbox. The record deposit is returned as well.
    ///
    /// # Errors
    ///
    /// [`LockBoxError::Unauthorized`], [`LockBoxError::NotFound`],
    /// [`LockBoxError::InsufficientBalance`] on an empty vault, or
    /// [`LockBoxError::ArithmeticOverflow`] if the payout cannot be credited.
    pub fn emergency_withdraw(
        &self,
        caller: &Pubkey,
        owner: &Pubkey,
    ) -> Result<Receipt, LockBoxError> {
        let _gate = self.gate.read();
        let result = self.emergency_withdraw_inner(caller, owner);
        observe(Operation::EmergencyWithdraw, owner, result)
    }

    fn emergency_withdraw_inner(
        &self,
        caller: &Pubkey,
        owner: &Pubkey,
    ) -> Result<Receipt, LockBoxError> {
        ensure_owner(caller, owner)?;

        let slot = self.slot(owner)?;
        let mut guard = slot.lock();
        let vault = guard.as_mut().ok_or(LockBoxError::NotFound { owner: *owner })?;
        vault.authorize(caller)?;

        let mut staged = vault.clone();
        let drained = staged.drain()?;
        let reserve = staged.lockbox().reserve();
        let payout = drained
            .checked_add(reserve)
            .ok_or(LockBoxError::ArithmeticOverflow)?;
        let address = staged.lockbox().address();

        self.ledger.credit(owner, payout)?;
        self.retire(&mut guard, &address);

        info!(%owner, drained, reserve, "lockbox emergency-withdrawn and closed");
        Ok(Receipt::new(Operation::EmergencyWithdraw, *owner, address)
            .amount(drained)
            .reserve(reserve))
    }

    /// Deletes an empty lockbox and returns its record deposit.
    ///
    /// # Errors
    ///
    /// [`LockBoxError::Unauthorized`], [`LockBoxError::NotFound`], or
    /// [`LockBoxError::InsufficientBalance`] if anything is still in custody.
    pub fn close(&self, caller: &Pubkey, owner: &Pubkey) -> Result<Receipt, LockBoxError> {
        let _gate = self.gate.read();
        let result = self.close_inner(caller, owner);
        observe(Operation::Close, owner, result)
    }

    fn close_inner(&self, caller: &Pubkey, owner: &Pubkey) -> Result<Receipt, LockBoxError> {
        ensure_owner(caller, owner)?;

        let slot = self.slot(owner)?;
        let mut guard = slot.lock();
        let vault = guard.as_ref().ok_or(LockBoxError::NotFound { owner: *owner })?;
        vault.authorize(caller)?;
        vault.ensure_closable()?;

        let reserve = vault.lockbox().reserve();
        let address = vault.lockbox().address();
        if reserve > 0 {
            self.ledger.credit(owner, reserve)?;
        }
        self.retire(&mut guard, &address);

        info!(%owner, reserve, "lockbox closed");
        Ok(Receipt::new(Operation::Close, *owner, address).reserve(reserve))
    }

    /// Snapshot of the lockbox of `owner`.
    pub fn read(&self, owner: &Pubkey) -> Result<Vault, LockBoxError> {
        let slot = self.slot(owner)?;
        let guard = slot.lock();
        guard.clone().ok_or(LockBoxError::NotFound { owner: *owner })
    }

    // -----------------------------------------------------------------------
    // Request Dispatch
    // -----------------------------------------------------------------------

    /// Runs a request whose caller has already been authenticated.
    pub fn execute(&self, request: &Request) -> Result<Receipt, LockBoxError> {
        let (caller, owner) = (&request.caller, &request.owner);
        match request.instruction {
            Instruction::Create { target_amount } => self.create(caller, owner, target_amount),
            Instruction::Deposit { amount } => self.deposit(caller, owner, amount),
            Instruction::Withdraw { amount } => self.withdraw(caller, owner, amount),
            Instruction::EmergencyWithdraw => self.emergency_withdraw(caller, owner),
            Instruction::Close => self.close(caller, owner),
        }
    }

    /// Verifies the caller's signature, then runs the request.
    pub fn process(&self, signed: &SignedRequest) -> Result<Receipt, LockBoxError> {
        let request = signed.verify().map_err(|err| {
            debug!(caller = %signed.request.caller, error = %err, "request signature rejected");
            err
        })?;
        self.execute(request)
    }

    // -----------------------------------------------------------------------
    // Integrity & Persistence
    // -----------------------------------------------------------------------

    /// Checks every live vault's invariants.
    pub fn check_invariants(&self) -> Result<(), LockBoxError> {
        let _gate = self.gate.write();
        for slot in self.vaults.read().values() {
            if let Some(vault) = slot.lock().as_ref() {
                vault.check_invariants()?;
            }
        }
        Ok(())
    }

    /// Units held in custody across all vaults.
    pub fn total_in_custody(&self) -> Option<u64> {
        let _gate = self.gate.write();
        self.vaults
            .read()
            .values()
            .filter_map(|slot| slot.lock().as_ref().map(|v| v.custody().balance()))
            .try_fold(0u64, |acc, balance| acc.checked_add(balance))
    }

    /// Consistent copy of the whole registry. Waits for in-flight
    /// operations to finish and holds new ones off while copying.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let _gate = self.gate.write();
        let mut vaults: Vec<Vault> = self
            .vaults
            .read()
            .values()
            .filter_map(|slot| slot.lock().clone())
            .collect();
        vaults.sort_by_key(|v| v.owner());
        RegistrySnapshot::new(self.config, self.ledger.balances(), vaults)
    }

    /// Rebuilds a registry from a snapshot, re-validating every invariant.
    pub fn restore(snapshot: RegistrySnapshot) -> Result<Self, SnapshotError> {
        snapshot.validate()?;
        let registry =
            Self::with_ledger(snapshot.config, Ledger::from_balances(snapshot.ledger));
        {
            let mut index = registry.vaults.write();
            for vault in snapshot.vaults {
                index.insert(vault.lockbox().address(), Arc::new(Mutex::new(Some(vault))));
            }
        }
        info!(vaults = registry.len(), "registry restored from snapshot");
        Ok(registry)
    }

    // -----------------------------------------------------------------------
    // Internal Helpers
    // -----------------------------------------------------------------------

    fn slot(&self, owner: &Pubkey) -> Result<Slot, LockBoxError> {
        self.vaults
            .read()
            .get(&lockbox_address(owner))
            .cloned()
            .ok_or(LockBoxError::NotFound { owner: *owner })
    }

    /// Unlinks a vault. Must be called with its slot locked.
    fn retire(&self, guard: &mut Option<Vault>, address: &Pubkey) {
        let mut vaults = self.vaults.write();
        vaults.remove(address);
        *guard = None;
    }
}

fn ensure_owner(caller: &Pubkey, owner: &Pubkey) -> Result<(), LockBoxError> {
    if caller != owner {
        return Err(LockBoxError::Unauthorized {
            caller: *caller,
            owner: *owner,
        });
    }
    Ok(())
}

fn observe<T>(
    operation: Operation,
    owner: &Pubkey,
    result: Result<T, LockBoxError>,
) -> Result<T, LockBoxError> {
    if let Err(err) = &result {
        debug!(
            %owner,
            %operation,
            kind = %err.kind(),
            code = err.code(),
            error = %err,
            "lockbox operation rejected"
        );
    }
    result
}
