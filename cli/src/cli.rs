//! # CLI Interface
//!
//! Defines the command-line argument structure for `lockbox` using `clap`
//! derive. Global flags locate the state file and the caller's key file;
//! each subcommand maps to one registry operation or a local utility.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use lockbox_protocol::crypto::Pubkey;

use crate::logging::LogFormat;

/// LockBox savings vaults.
///
/// Lock funds toward a target and withdraw once it is reached, or give up
/// with an emergency withdrawal. State lives in a local JSON snapshot.
#[derive(Parser, Debug)]
#[command(
    name = "lockbox",
    about = "Target-gated savings vaults",
    version,
    propagate_version = true
)]
pub struct LockBoxCli {
    /// Path to the registry state file.
    #[arg(long, short = 's', global = true, env = "LOCKBOX_STATE", default_value = "lockbox.json")]
    pub state: PathBuf,

    /// Path to the caller's hex-encoded Ed25519 key file.
    #[arg(long, short = 'k', global = true, env = "LOCKBOX_KEY")]
    pub key: Option<PathBuf>,

    /// Log output format.
    #[arg(long, global = true, env = "LOCKBOX_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Log more: `-v` shows why operations were rejected, `-vv` traces
    /// ledger and snapshot activity.
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the `lockbox` binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an empty state file.
    Init(InitArgs),
    /// Generate a new keypair and write its secret key to a file.
    Keygen(KeygenArgs),
    /// Credit an account's external balance. Local development only.
    Airdrop(AirdropArgs),
    /// Create your lockbox with a savings target.
    Create(CreateArgs),
    /// Move funds from your balance into your lockbox.
    Deposit(AmountArgs),
    /// Take funds out of your lockbox once the target is reached.
    Withdraw(AmountArgs),
    /// Drain your lockbox regardless of the target and delete it.
    EmergencyWithdraw(OwnerArgs),
    /// Delete your empty lockbox.
    Close(OwnerArgs),
    /// Print a lockbox record.
    Show(OwnerArgs),
    /// Print an account's external balance.
    Balance(AccountArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `init` subcommand.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Units reserved from the owner's balance for each lockbox record.
    #[arg(long, default_value_t = 0)]
    pub record_deposit: u64,

    /// Overwrite an existing state file.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `keygen` subcommand.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Where to write the secret key.
    #[arg(long, short = 'o')]
    pub out: PathBuf,

    /// Overwrite an existing key file.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `airdrop` subcommand.
#[derive(Args, Debug)]
pub struct AirdropArgs {
    /// Account to credit (base58).
    #[arg(long)]
    pub to: Pubkey,

    /// Units to credit.
    #[arg(long)]
    pub amount: u64,
}

/// Arguments for the `create` subcommand.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Savings target in the smallest unit. Must be positive.
    #[arg(long)]
    pub target: u64,

    #[command(flatten)]
    pub owner: OwnerArgs,
}

/// Arguments for `deposit` and `withdraw`.
#[derive(Args, Debug)]
pub struct AmountArgs {
    /// Units to move.
    #[arg(long)]
    pub amount: u64,

    #[command(flatten)]
    pub owner: OwnerArgs,
}

/// Selects the lockbox to act on.
#[derive(Args, Debug)]
pub struct OwnerArgs {
    /// Owner of the lockbox (base58). Defaults to the key file's identity.
    #[arg(long)]
    pub owner: Option<Pubkey>,
}

/// Arguments for the `balance` subcommand.
#[derive(Args, Debug)]
pub struct AccountArgs {
    /// Account to query (base58). Defaults to the key file's identity.
    #[arg(long)]
    pub account: Option<Pubkey>,
}
