//! # Registry Snapshots
//!
//! A [`RegistrySnapshot`] is the whole registry as one serde value: config,
//! ledger balances and every live vault. The format is versioned JSON. It
//! is the persistence boundary of the core; what stores the bytes (a file
//! here, anything else elsewhere) is the caller's business.
//!
//! Snapshots are structurally validated on the way in.
//! [`RegistrySnapshot::validate`] re-checks every vault invariant and the
//! one-vault-per-owner rule before a registry is rebuilt from one. That is
//! consistency, not authenticity: a snapshot can be consistent and still
//! forged, e.g. inflated ledger balances, or `unlocked` set on a vault that
//! never reached its target. Keep the file where only its owner can write it.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{LockBoxConfig, SNAPSHOT_VERSION};
use crate::crypto::keys::Pubkey;
use crate::vault::error::LockBoxError;
use crate::vault::lockbox::Vault;

/// Errors raised while persisting or loading a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("snapshot is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),

    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("snapshot holds two lockboxes for owner {0}")]
    DuplicateOwner(Pubkey),

    #[error("snapshot holds an inconsistent vault: {0}")]
    CorruptVault(#[from] LockBoxError),
}

/// Serializable image of a registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub version: u32,
    pub config: LockBoxConfig,
    /// External ledger balances by account.
    pub ledger: BTreeMap<Pubkey, u64>,
    /// Live vaults, sorted by owner.
    pub vaults: Vec<Vault>,
}

impl RegistrySnapshot {
    pub fn new(config: LockBoxConfig, ledger: BTreeMap<Pubkey, u64>, vaults: Vec<Vault>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            config,
            ledger,
            vaults,
        }
    }

    /// An empty registry image with the given config.
    pub fn empty(config: LockBoxConfig) -> Self {
        Self::new(config, BTreeMap::new(), Vec::new())
    }

    /// Checks the version, per-vault invariants and owner uniqueness.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        let mut owners = HashSet::with_capacity(self.vaults.len());
        for vault in &self.vaults {
            vault.check_invariants()?;
            if !owners.insert(vault.owner()) {
                return Err(SnapshotError::DuplicateOwner(vault.owner()));
            }
        }
        Ok(())
    }
}

/// Writes `snapshot` to `path` as pretty JSON.
///
/// Writes to a sibling temp file first and renames it into place, so a
/// crash mid-write leaves the previous snapshot intact.
pub fn save(path: &Path, snapshot: &RegistrySnapshot) -> Result<(), SnapshotError> {
    let json = serde_json::to_vec_pretty(snapshot)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), vaults = snapshot.vaults.len(), "snapshot saved");
    Ok(())
}

/// Reads and validates the snapshot at `path`.
pub fn load(path: &Path) -> Result<RegistrySnapshot, SnapshotError> {
    let bytes = fs::read(path)?;
    let snapshot: RegistrySnapshot = serde_json::from_slice(&bytes)?;
    snapshot.validate()?;
    tracing::debug!(path = %path.display(), vaults = snapshot.vaults.len(), "snapshot loaded");
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault(byte: u8, deposit: u64) -> Vault {
        let mut v = Vault::open(Pubkey::new([byte; 32]), 10, 0).unwrap();
        if deposit > 0 {
            v.deposit(deposit).unwrap();
        }
        v
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut ledger = BTreeMap::new();
        ledger.insert(Pubkey::new([1; 32]), 99);
        let snapshot = RegistrySnapshot::new(LockBoxConfig::default(), ledger, vec![vault(1, 4)]);

        save(&path, &snapshot).unwrap();
        assert_eq!(load(&path).unwrap(), snapshot);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn wrong_version_rejected() {
        let mut snapshot = RegistrySnapshot::empty(LockBoxConfig::default());
        snapshot.version = 99;
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn duplicate_owner_rejected() {
        let snapshot =
            RegistrySnapshot::new(LockBoxConfig::default(), BTreeMap::new(), vec![vault(1, 0), vault(1, 2)]);
        assert!(matches!(snapshot.validate(), Err(SnapshotError::DuplicateOwner(_))));
    }

    #[test]
    fn tampered_custody_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let snapshot =
            RegistrySnapshot::new(LockBoxConfig::default(), BTreeMap::new(), vec![vault(1, 4)]);
        let json = serde_json::to_string(&snapshot).unwrap();
        // Inflate the books without touching custody.
        let tampered = json.replace("\"current_balance\":4", "\"current_balance\":9");
        assert_ne!(json, tampered);
        fs::write(&path, tampered).unwrap();

        assert!(matches!(
            load(&path),
            Err(SnapshotError::CorruptVault(LockBoxError::CustodyMismatch { .. }))
        ));
    }

    #[test]
    fn consistent_forgery_passes_validation() {
        let snapshot =
            RegistrySnapshot::new(LockBoxConfig::default(), BTreeMap::new(), vec![vault(1, 4)]);
        let json = serde_json::to_string(&snapshot).unwrap();
        let forged = json.replace("\"unlocked\":false", "\"unlocked\":true");
        assert_ne!(json, forged);

        let forged: RegistrySnapshot = serde_json::from_str(&forged).unwrap();
        forged.validate().unwrap();
        assert!(forged.vaults[0].lockbox().is_unlocked());
        assert!(!forged.vaults[0].lockbox().has_reached_target());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load(&dir.path().join("absent.json")),
            Err(SnapshotError::Io(_))
        ));
    }
}
