//! # Requests & Instructions
//!
//! What an external caller submits: who they are, whose lockbox they are
//! addressing, and what they want done. A [`SignedRequest`] additionally
//! carries the caller's Ed25519 signature, so the registry can authenticate
//! the caller itself instead of trusting the transport.
//!
//! ## Canonical encoding
//!
//! Signatures cover a fixed binary layout, not JSON, so that two encoders
//! can never disagree about field order or whitespace:
//!
//! ```text
//! REQUEST_SIGNING_DOMAIN || caller (32) || owner (32) || tag (1) || amount (8, LE)
//! ```
//!
//! `amount` is the target for `create`, the amount for `deposit` and
//! `withdraw`, and zero otherwise.

use serde::{Deserialize, Serialize};

use crate::config::REQUEST_SIGNING_DOMAIN;
use crate::crypto::keys::{Keypair, Pubkey, Signature};
use crate::vault::error::LockBoxError;
use crate::vault::receipt::Operation;

/// One of the five mutating lockbox operations, with its arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Instruction {
    Create { target_amount: u64 },
    Deposit { amount: u64 },
    Withdraw { amount: u64 },
    EmergencyWithdraw,
    Close,
}

impl Instruction {
    pub fn operation(&self) -> Operation {
        match self {
            Instruction::Create { .. } => Operation::Create,
            Instruction::Deposit { .. } => Operation::Deposit,
            Instruction::Withdraw { .. } => Operation::Withdraw,
            Instruction::EmergencyWithdraw => Operation::EmergencyWithdraw,
            Instruction::Close => Operation::Close,
        }
    }

    fn tag(&self) -> u8 {
        match self {
            Instruction::Create { .. } => 0,
            Instruction::Deposit { .. } => 1,
            Instruction::Withdraw { .. } => 2,
            Instruction::EmergencyWithdraw => 3,
            Instruction::Close => 4,
        }
    }

    fn argument(&self) -> u64 {
        match *self {
            Instruction::Create { target_amount } => target_amount,
            Instruction::Deposit { amount } | Instruction::Withdraw { amount } => amount,
            Instruction::EmergencyWithdraw | Instruction::Close => 0,
        }
    }
}

/// An operation request from `caller` against the lockbox of `owner`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub caller: Pubkey,
    pub owner: Pubkey,
    pub instruction: Instruction,
}

impl Request {
    /// A request by `owner` against their own lockbox. The common case.
    pub fn by_owner(owner: Pubkey, instruction: Instruction) -> Self {
        Self {
            caller: owner,
            owner,
            instruction,
        }
    }

    /// The bytes a caller signs.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(REQUEST_SIGNING_DOMAIN.len() + 32 + 32 + 1 + 8);
        bytes.extend_from_slice(REQUEST_SIGNING_DOMAIN);
        bytes.extend_from_slice(self.caller.as_bytes());
        bytes.extend_from_slice(self.owner.as_bytes());
        bytes.push(self.instruction.tag());
        bytes.extend_from_slice(&self.instruction.argument().to_le_bytes());
        bytes
    }

    /// Signs the request. The keypair should be the caller's; if it is
    /// not, the result simply fails verification.
    pub fn sign(self, keypair: &Keypair) -> SignedRequest {
        let signature = keypair.sign(&self.signing_bytes());
        SignedRequest {
            request: self,
            signature,
        }
    }
}

/// A request plus the caller's signature over its canonical bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRequest {
    pub request: Request,
    pub signature: Signature,
}

impl SignedRequest {
    /// Returns the request if the signature is the claimed caller's.
    pub fn verify(&self) -> Result<&Request, LockBoxError> {
        let caller = self.request.caller;
        if !caller.verify(&self.request.signing_bytes(), &self.signature) {
            return Err(LockBoxError::InvalidSignature { caller });
        }
        Ok(&self.request)
    }
}
