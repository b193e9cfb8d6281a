//! # Key Management
//!
//! Ed25519 identities for LockBox owners, plus the [`Pubkey`] type that
//! doubles as an address for derived (keyless) accounts such as lockbox
//! records and custody pools.
//!
//! ## Security considerations
//!
//! - Private keys are zeroized on drop (ed25519-dalek does this for us).
//! - Key generation uses `OsRng`.
//! - Secret bytes are never logged and never implement `Serialize`. Export
//!   them with [`Keypair::to_hex`] when writing a key file, on purpose.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::config::{PUBKEY_LENGTH, SIGNATURE_LENGTH};

/// Errors that can occur while parsing or reconstructing keys.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid secret key bytes: expected 32 bytes of hex")]
    InvalidSecretKey,

    #[error("invalid public key: expected 32 bytes of base58")]
    InvalidPublicKey,

    #[error("invalid signature: expected 64 bytes of hex")]
    InvalidSignature,
}

// ---------------------------------------------------------------------------
// Pubkey
// ---------------------------------------------------------------------------

/// A 32-byte account address.
///
/// For owners this is an Ed25519 verifying key. For lockbox records and
/// custody pools it is a derived address (see
/// [`derive_address`](super::hash::derive_address)) that nobody holds a
/// private key for. Either way the canonical text form is base58.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Pubkey([u8; PUBKEY_LENGTH]);

impl Pubkey {
    /// Wraps raw bytes. No curve check: derived addresses are off-curve.
    pub const fn new(bytes: [u8; PUBKEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Builds a pubkey from a slice, checking only the length.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; PUBKEY_LENGTH] =
            slice.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; PUBKEY_LENGTH] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; PUBKEY_LENGTH] {
        self.0
    }

    /// Base58 text form, the same alphabet users see in wallets.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// Verifies an Ed25519 signature made by the holder of this key.
    ///
    /// Returns `false` for derived addresses, which are not valid verifying
    /// keys, rather than erroring: nobody can sign for them, so no signature
    /// is ever valid.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let dalek_sig = DalekSignature::from_bytes(&signature.0);
        verifying_key.verify_strict(message, &dalek_sig).is_ok()
    }
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; PUBKEY_LENGTH]> for Pubkey {
    fn from(bytes: [u8; PUBKEY_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self.to_base58())
    }
}

impl FromStr for Pubkey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| KeyError::InvalidPublicKey)?;
        Self::try_from_slice(&bytes)
    }
}

impl Serialize for Pubkey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Pubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// A 64-byte Ed25519 signature, hex-encoded on the wire.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_LENGTH]);

impl Signature {
    pub const fn new(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|_| KeyError::InvalidSignature)?;
        let arr: [u8; SIGNATURE_LENGTH] =
            bytes.try_into().map_err(|_| KeyError::InvalidSignature)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}..)", &self.to_hex()[..16])
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Keypair
// ---------------------------------------------------------------------------

/// An owner identity: an Ed25519 signing key.
///
/// Does not implement `Serialize`. Writing a secret key to disk should be a
/// conscious call to [`to_hex`](Self::to_hex), never a side effect of
/// dumping a struct to JSON.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generates a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic keypair from a 32-byte seed. Handy in tests; in
    /// production the seed must come from a CSPRNG or KDF.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parses a hex-encoded 32-byte secret key, as written by
    /// [`to_hex`](Self::to_hex).
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| KeyError::InvalidSecretKey)?;
        let seed: [u8; 32] = bytes.try_into().map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// Hex-encoded secret key. **Handle with care.**
    pub fn to_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// The owner identity of this keypair.
    pub fn pubkey(&self) -> Pubkey {
        Pubkey(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material, not even partially.
        write!(f, "Keypair(pub={})", self.pubkey())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"deposit 100");
        assert!(kp.pubkey().verify(b"deposit 100", &sig));
        assert!(!kp.pubkey().verify(b"deposit 101", &sig));
    }

    #[test]
    fn signature_from_other_key_rejected() {
        let alice = Keypair::generate();
        let mallory = Keypair::generate();
        let sig = mallory.sign(b"withdraw 5");
        assert!(!alice.pubkey().verify(b"withdraw 5", &sig));
    }

    #[test]
    fn seeded_keypair_is_deterministic() {
        let a = Keypair::from_seed(&[7u8; 32]);
        let b = Keypair::from_seed(&[7u8; 32]);
        assert_eq!(a.pubkey(), b.pubkey());
    }

    #[test]
    fn secret_hex_roundtrip_preserves_identity() {
        let kp = Keypair::generate();
        let restored = Keypair::from_hex(&kp.to_hex()).unwrap();
        assert_eq!(kp.pubkey(), restored.pubkey());
    }

    #[test]
    fn malformed_secret_rejected() {
        assert_eq!(Keypair::from_hex("zz").unwrap_err(), KeyError::InvalidSecretKey);
        assert_eq!(Keypair::from_hex("abcd").unwrap_err(), KeyError::InvalidSecretKey);
    }

    #[test]
    fn pubkey_parses_base58() {
        let pk = Keypair::generate().pubkey();
        let parsed: Pubkey = pk.to_string().parse().unwrap();
        assert_eq!(parsed, pk);
        assert!("not-base58!".parse::<Pubkey>().is_err());
        assert!("abc".parse::<Pubkey>().is_err());
    }

    #[test]
    fn pubkey_serializes_as_base58_string() {
        let pk = Pubkey::new([1u8; 32]);
        let json = serde_json::to_string(&pk).unwrap();
        assert_eq!(json, format!("\"{}\"", pk.to_base58()));
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = Keypair::generate();
        let dbg = format!("{kp:?}");
        assert!(!dbg.contains(&kp.to_hex()));
    }

    #[test]
    fn off_curve_address_never_verifies() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"x");
        // All-0xFF is not a valid compressed Edwards point.
        assert!(!Pubkey::new([0xFF; 32]).verify(b"x", &sig));
    }
}
