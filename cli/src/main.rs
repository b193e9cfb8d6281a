// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # LockBox CLI
//!
//! Entry point for the `lockbox` binary. Parses CLI arguments, initializes
//! logging and dispatches to a command handler.
//!
//! - `init`, `keygen`, `airdrop` — local setup
//! - `create`, `deposit`, `withdraw`, `emergency-withdraw`, `close` — signed
//!   registry operations
//! - `show`, `balance` — read-only queries
//! - `version` — print build version information

mod cli;
mod commands;
mod logging;

use anyhow::Result;
use clap::Parser;

use lockbox_protocol::Instruction;

use cli::{Commands, LockBoxCli};

fn main() -> Result<()> {
    let LockBoxCli {
        state,
        key,
        log_format,
        verbose,
        command,
    } = LockBoxCli::parse();

    logging::init_logging(verbose, log_format);

    let key = key.as_deref();
    match command {
        Commands::Init(args) => commands::init_state(&state, args.record_deposit, args.force),
        Commands::Keygen(args) => commands::keygen(&args.out, args.force).map(drop),
        Commands::Airdrop(args) => commands::airdrop(&state, &args.to, args.amount).map(drop),
        Commands::Create(args) => commands::submit(
            &state,
            key,
            args.owner.owner,
            Instruction::Create {
                target_amount: args.target,
            },
        )
        .map(drop),
        Commands::Deposit(args) => commands::submit(
            &state,
            key,
            args.owner.owner,
            Instruction::Deposit {
                amount: args.amount,
            },
        )
        .map(drop),
        Commands::Withdraw(args) => commands::submit(
            &state,
            key,
            args.owner.owner,
            Instruction::Withdraw {
                amount: args.amount,
            },
        )
        .map(drop),
        Commands::EmergencyWithdraw(args) => {
            commands::submit(&state, key, args.owner, Instruction::EmergencyWithdraw).map(drop)
        }
        Commands::Close(args) => {
            commands::submit(&state, key, args.owner, Instruction::Close).map(drop)
        }
        Commands::Show(args) => commands::show(&state, key, args.owner),
        Commands::Balance(args) => commands::balance(&state, key, args.account).map(drop),
        Commands::Version => {
            commands::print_version();
            Ok(())
        }
    }
}
