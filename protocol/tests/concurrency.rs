//! Concurrency tests for the registry.
//!
//! Many threads hammer the registry at once. Whatever interleaving the
//! scheduler picks, every vault must stay consistent with its custody pool
//! and the total across ledger and custody must not move.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use lockbox_protocol::crypto::{Keypair, Pubkey};
use lockbox_protocol::vault::LockBoxError;
use lockbox_protocol::{LockBoxConfig, LockBoxRegistry};

const THREADS: usize = 8;
const ROUNDS: u64 = 200;

fn conserved(registry: &LockBoxRegistry) -> u64 {
    let snapshot = registry.snapshot();
    let ledger: u64 = snapshot.ledger.values().sum();
    let held: u64 = snapshot
        .vaults
        .iter()
        .map(|v| v.custody().balance() + v.lockbox().reserve())
        .sum();
    ledger + held
}

#[test]
fn independent_owners_run_in_parallel() {
    let registry = LockBoxRegistry::new(LockBoxConfig::with_record_deposit(2));
    let owners: Vec<Pubkey> = (0..THREADS).map(|_| Keypair::generate().pubkey()).collect();
    for owner in &owners {
        registry.ledger().fund(owner, 1_000).unwrap();
    }
    let minted = conserved(&registry);

    thread::scope(|s| {
        for owner in &owners {
            let registry = &registry;
            s.spawn(move || {
                registry.create(owner, owner, ROUNDS).unwrap();
                for _ in 0..ROUNDS {
                    registry.deposit(owner, owner, 1).unwrap();
                }
                for _ in 0..ROUNDS / 2 {
                    registry.withdraw(owner, owner, 1).unwrap();
                }
            });
        }
    });

    registry.check_invariants().unwrap();
    assert_eq!(conserved(&registry), minted);
    for owner in &owners {
        let vault = registry.read(owner).unwrap();
        assert_eq!(vault.balance(), ROUNDS / 2);
        assert_eq!(registry.ledger().balance_of(owner), 1_000 - 2 - ROUNDS / 2);
    }
}

#[test]
fn same_owner_deposits_are_not_lost() {
    let registry = LockBoxRegistry::default();
    let owner = Keypair::generate().pubkey();
    registry.ledger().fund(&owner, THREADS as u64 * ROUNDS).unwrap();
    registry.create(&owner, &owner, u64::MAX).unwrap();

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..ROUNDS {
                    registry.deposit(&owner, &owner, 1).unwrap();
                }
            });
        }
    });

    let vault = registry.read(&owner).unwrap();
    assert_eq!(vault.balance(), THREADS as u64 * ROUNDS);
    assert_eq!(vault.custody().balance(), vault.balance());
    assert_eq!(registry.ledger().balance_of(&owner), 0);
}

#[test]
fn racing_withdrawals_never_overdraw() {
    let registry = LockBoxRegistry::default();
    let owner = Keypair::generate().pubkey();
    registry.ledger().fund(&owner, 100).unwrap();
    registry.create(&owner, &owner, 100).unwrap();
    registry.deposit(&owner, &owner, 100).unwrap();

    let paid = AtomicU64::new(0);
    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| loop {
                match registry.withdraw(&owner, &owner, 3) {
                    Ok(_) => {
                        paid.fetch_add(3, Ordering::Relaxed);
                    }
                    Err(LockBoxError::InsufficientBalance { available, .. }) => {
                        assert!(available < 3);
                        break;
                    }
                    Err(other) => panic!("unexpected error: {other}"),
                }
            });
        }
    });

    // 33 withdrawals of 3 fit in 100.
    assert_eq!(paid.load(Ordering::Relaxed), 99);
    assert_eq!(registry.read(&owner).unwrap().balance(), 1);
    assert_eq!(registry.ledger().balance_of(&owner), 99);
}

#[test]
fn exactly_one_terminal_operation_wins() {
    let registry = LockBoxRegistry::default();
    let owner = Keypair::generate().pubkey();
    registry.ledger().fund(&owner, 50).unwrap();
    registry.create(&owner, &owner, 1_000).unwrap();
    registry.deposit(&owner, &owner, 50).unwrap();

    let winners = AtomicU64::new(0);
    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| match registry.emergency_withdraw(&owner, &owner) {
                Ok(receipt) => {
                    assert_eq!(receipt.amount, 50);
                    winners.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => assert_eq!(err, LockBoxError::NotFound { owner }),
            });
        }
    });

    assert_eq!(winners.load(Ordering::Relaxed), 1);
    assert!(!registry.contains(&owner));
    assert_eq!(registry.ledger().balance_of(&owner), 50);
}

#[test]
fn racing_creates_yield_one_lockbox() {
    let registry = LockBoxRegistry::default();
    let owner = Keypair::generate().pubkey();

    let created = AtomicU64::new(0);
    thread::scope(|s| {
        for target in 1..=THREADS as u64 {
            let (registry, created) = (&registry, &created);
            s.spawn(move || match registry.create(&owner, &owner, target) {
                Ok(_) => {
                    created.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => assert_eq!(err, LockBoxError::AlreadyExists { owner }),
            });
        }
    });

    assert_eq!(created.load(Ordering::Relaxed), 1);
    assert_eq!(registry.len(), 1);
}

#[test]
fn snapshots_taken_mid_flight_are_consistent() {
    let registry = LockBoxRegistry::default();
    let owners: Vec<Pubkey> = (0..4).map(|_| Keypair::generate().pubkey()).collect();
    for owner in &owners {
        registry.ledger().fund(owner, ROUNDS).unwrap();
        registry.create(owner, owner, ROUNDS).unwrap();
    }
    let minted = conserved(&registry);

    thread::scope(|s| {
        for owner in &owners {
            let registry = &registry;
            s.spawn(move || {
                for _ in 0..ROUNDS {
                    registry.deposit(owner, owner, 1).unwrap();
                }
                registry.emergency_withdraw(owner, owner).unwrap();
            });
        }
        s.spawn(|| {
            for _ in 0..50 {
                let snapshot = registry.snapshot();
                snapshot.validate().unwrap();
                let ledger: u64 = snapshot.ledger.values().sum();
                let custody: u64 = snapshot.vaults.iter().map(|v| v.balance()).sum();
                assert_eq!(ledger + custody, minted);
            }
        });
    });

    assert!(registry.is_empty());
    assert_eq!(conserved(&registry), minted);
}
