// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # LockBox Protocol — Core Library
//!
//! Personal savings vaults with a declared target. An owner locks funds in
//! a lockbox, deposits as often as they like, and can only withdraw once the
//! balance has reached the target. The escape hatch is an emergency
//! withdrawal, which returns everything and permanently closes the lockbox.
//!
//! This crate is the state machine and its custody and authorization
//! invariants. Transport, wallets and UI are someone else's problem: the
//! core takes requests and returns receipts or typed errors.
//!
//! ## Architecture
//!
//! - **config** — Seeds, error code base, runtime [`LockBoxConfig`].
//! - **crypto** — Ed25519 identities and deterministic address derivation.
//! - **instruction** — Requests, instructions and signed requests.
//! - **vault** — Records, custody pools, the ledger and the registry.
//! - **storage** — Versioned, self-validating registry snapshots.
//!
//! ## Example
//!
//! ```
//! use lockbox_protocol::crypto::Keypair;
//! use lockbox_protocol::{LockBoxConfig, LockBoxRegistry};
//!
//! let registry = LockBoxRegistry::new(LockBoxConfig::default());
//! let alice = Keypair::generate().pubkey();
//! registry.ledger().fund(&alice, 10).unwrap();
//!
//! registry.create(&alice, &alice, 5).unwrap();
//! registry.deposit(&alice, &alice, 5).unwrap();
//! let receipt = registry.withdraw(&alice, &alice, 2).unwrap();
//! assert_eq!(receipt.balance_after, 3);
//! ```
//!
//! [`LockBoxConfig`]: config::LockBoxConfig

pub mod config;
pub mod crypto;
pub mod instruction;
pub mod storage;
pub mod vault;

pub use config::LockBoxConfig;
pub use instruction::{Instruction, Request, SignedRequest};
pub use vault::{ErrorKind, LockBoxError, LockBoxRegistry, Receipt, Vault};
