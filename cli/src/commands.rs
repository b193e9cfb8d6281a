//! # Command Handlers
//!
//! One function per subcommand. Every handler takes explicit paths so it
//! can be driven from tests against a temporary directory.
//!
//! Mutating commands follow the same cycle: load and validate the snapshot,
//! sign a request with the caller's key, process it, save the new snapshot,
//! and print the receipt as JSON on stdout.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::json;

use lockbox_protocol::crypto::{Keypair, Pubkey};
use lockbox_protocol::storage::{self, RegistrySnapshot};
use lockbox_protocol::vault::Receipt;
use lockbox_protocol::{Instruction, LockBoxConfig, LockBoxRegistry, Request};

// ---------------------------------------------------------------------------
// Local Utilities
// ---------------------------------------------------------------------------

/// Writes an empty registry to `state`.
pub fn init_state(state: &Path, record_deposit: u64, force: bool) -> Result<()> {
    if state.exists() && !force {
        bail!(
            "state file {} already exists (pass --force to overwrite)",
            state.display()
        );
    }
    if let Some(parent) = state.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let config = LockBoxConfig::with_record_deposit(record_deposit);
    storage::save(state, &RegistrySnapshot::empty(config))
        .with_context(|| format!("failed to write state file {}", state.display()))?;

    tracing::info!(state = %state.display(), record_deposit, "state initialized");
    println!("{}", json!({ "state": state.display().to_string(), "record_deposit": record_deposit }));
    Ok(())
}

/// Generates a keypair and writes its hex secret key to `out`.
pub fn keygen(out: &Path, force: bool) -> Result<Pubkey> {
    if out.exists() && !force {
        bail!("key file {} already exists (pass --force to overwrite)", out.display());
    }

    let keypair = Keypair::generate();
    fs::write(out, keypair.to_hex())
        .with_context(|| format!("failed to write key file {}", out.display()))?;

    // Restrict permissions on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(out, fs::Permissions::from_mode(0o600))?;
    }

    let pubkey = keypair.pubkey();
    tracing::info!(%pubkey, key_path = %out.display(), "keypair generated");
    println!("{}", json!({ "pubkey": pubkey, "key_file": out.display().to_string() }));
    Ok(pubkey)
}

/// Credits `amount` to `to` in the external ledger.
pub fn airdrop(state: &Path, to: &Pubkey, amount: u64) -> Result<u64> {
    let registry = open_registry(state)?;
    let balance = registry
        .ledger()
        .fund(to, amount)
        .with_context(|| format!("failed to credit {to}"))?;
    persist(state, &registry)?;

    println!("{}", json!({ "account": to, "balance": balance }));
    Ok(balance)
}

// ---------------------------------------------------------------------------
// Registry Operations
// ---------------------------------------------------------------------------

/// Signs `instruction` with the key at `key` and runs it against `state`.
pub fn submit(
    state: &Path,
    key: Option<&Path>,
    owner: Option<Pubkey>,
    instruction: Instruction,
) -> Result<Receipt> {
    let keypair = load_keypair(key)?;
    let registry = open_registry(state)?;

    let request = Request {
        caller: keypair.pubkey(),
        owner: owner.unwrap_or_else(|| keypair.pubkey()),
        instruction,
    };
    let receipt = match registry.process(&request.sign(&keypair)) {
        Ok(receipt) => receipt,
        Err(err) => bail!(
            "{} rejected [{} {}]: {}",
            instruction.operation(),
            err.kind(),
            err.code(),
            err
        ),
    };
    persist(state, &registry)?;

    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(receipt)
}

/// Prints the lockbox of `owner` (or of the key file's identity).
pub fn show(state: &Path, key: Option<&Path>, owner: Option<Pubkey>) -> Result<()> {
    let owner = resolve(key, owner)?;
    let registry = open_registry(state)?;
    let vault = registry
        .read(&owner)
        .with_context(|| format!("no lockbox for {owner}"))?;

    let view = json!({
        "phase": vault.phase(),
        "remaining_to_target": vault.lockbox().remaining_to_target(),
        "vault": vault,
    });
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

/// Prints the external balance of `account` (or of the key file's identity).
pub fn balance(state: &Path, key: Option<&Path>, account: Option<Pubkey>) -> Result<u64> {
    let account = resolve(key, account)?;
    let registry = open_registry(state)?;
    let balance = registry.ledger().balance_of(&account);
    println!("{}", json!({ "account": account, "balance": balance }));
    Ok(balance)
}

/// Prints version information to stdout.
pub fn print_version() {
    println!("lockbox   {}", env!("CARGO_PKG_VERSION"));
    println!("protocol  {}", lockbox_protocol::config::PROTOCOL_VERSION);
    println!("snapshot  v{}", lockbox_protocol::config::SNAPSHOT_VERSION);
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_registry(state: &Path) -> Result<LockBoxRegistry> {
    if !state.exists() {
        bail!(
            "no state file at {} (run `lockbox init` first)",
            state.display()
        );
    }
    let snapshot = storage::load(state)
        .with_context(|| format!("failed to load state file {}", state.display()))?;
    LockBoxRegistry::restore(snapshot)
        .with_context(|| format!("state file {} is inconsistent", state.display()))
}

fn persist(state: &Path, registry: &LockBoxRegistry) -> Result<()> {
    storage::save(state, &registry.snapshot())
        .with_context(|| format!("failed to write state file {}", state.display()))
}

fn load_keypair(key: Option<&Path>) -> Result<Keypair> {
    let Some(path) = key else {
        bail!("no key file given (pass --key or set LOCKBOX_KEY)");
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read key file {}", path.display()))?;
    Keypair::from_hex(contents.trim())
        .with_context(|| format!("key file {} is not a valid secret key", path.display()))
}

/// An explicit identity wins; otherwise the key file's.
fn resolve(key: Option<&Path>, explicit: Option<Pubkey>) -> Result<Pubkey> {
    match explicit {
        Some(pubkey) => Ok(pubkey),
        None => Ok(load_keypair(key)?.pubkey()),
    }
}
