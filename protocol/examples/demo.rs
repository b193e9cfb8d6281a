//! Terminal walkthrough of a LockBox lifecycle.
//!
//! Alice saves toward a target, fails an early withdrawal, reaches the
//! target, withdraws in steps and closes the lockbox. Bob gives up on the
//! goal and emergency-withdraws. Every step goes through signed requests,
//! and the output uses ANSI escape codes for a storytelling-style rendering.
//!
//! Run with:
//!   cargo run --example demo --release

use std::time::Instant;

use lockbox_protocol::crypto::{Keypair, Pubkey};
use lockbox_protocol::vault::Receipt;
use lockbox_protocol::{Instruction, LockBoxConfig, LockBoxRegistry, Request};

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

const BG_BLUE: &str = "\x1b[44m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn banner() {
    println!();
    println!("{BG_BLUE}{BOLD}{WHITE}                                                          {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}    LOCKBOX  --  Target-Gated Savings Demo                {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}                                                          {RESET}");
    println!();
}

fn section(num: u32, title: &str) {
    println!();
    println!("{BOLD}{CYAN}===[{YELLOW} Step {num} {CYAN}]================================================{RESET}");
    println!("{BOLD}{WHITE}  {title}{RESET}");
}

fn success(text: &str) {
    println!("{GREEN}  [OK] {text}{RESET}");
}

fn rejected(text: &str) {
    println!("{RED}  [REJECTED] {text}{RESET}");
}

fn timing(label: &str, elapsed: std::time::Duration) {
    let ms = elapsed.as_secs_f64() * 1000.0;
    println!("{DIM}{MAGENTA}  [{label}: {ms:.3} ms]{RESET}");
}

fn balances(registry: &LockBoxRegistry, name: &str, owner: &Pubkey) {
    let wallet = registry.ledger().balance_of(owner);
    match registry.read(owner) {
        Ok(vault) => println!(
            "  {BOLD}{name:<6}{RESET} wallet {WHITE}{wallet:>5}{RESET}  lockbox {WHITE}{:>5}{RESET} / {} {DIM}({}){RESET}",
            vault.balance(),
            vault.lockbox().target_amount(),
            vault.phase(),
        ),
        Err(_) => println!("  {BOLD}{name:<6}{RESET} wallet {WHITE}{wallet:>5}{RESET}  {DIM}no lockbox{RESET}"),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Sign and submit a request on behalf of `keypair`.
fn submit(registry: &LockBoxRegistry, keypair: &Keypair, instruction: Instruction) {
    let signed = Request::by_owner(keypair.pubkey(), instruction).sign(keypair);
    let start = Instant::now();
    let result = registry.process(&signed);
    let elapsed = start.elapsed();
    match result {
        Ok(receipt) => {
            success(&describe(&receipt));
            timing("process", elapsed);
        }
        Err(err) => rejected(&format!("{} (code {}, {})", err, err.code(), err.kind())),
    }
}

fn describe(receipt: &Receipt) -> String {
    format!(
        "{} amount={} balance_after={} reached={}",
        receipt.operation, receipt.amount, receipt.balance_after, receipt.has_reached_target
    )
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    banner();

    let registry = LockBoxRegistry::new(LockBoxConfig::with_record_deposit(1));
    let alice = Keypair::generate();
    let bob = Keypair::generate();

    section(1, "Fund wallets");
    for (name, kp) in [("alice", &alice), ("bob", &bob)] {
        if let Err(err) = registry.ledger().fund(&kp.pubkey(), 20) {
            rejected(&err.to_string());
            return;
        }
        println!("  {BOLD}{name}{RESET}  {DIM}{}{RESET}", kp.pubkey());
    }
    balances(&registry, "alice", &alice.pubkey());
    balances(&registry, "bob", &bob.pubkey());

    section(2, "Alice locks savings toward a target of 5");
    submit(&registry, &alice, Instruction::Create { target_amount: 5 });
    submit(&registry, &alice, Instruction::Deposit { amount: 2 });
    submit(&registry, &alice, Instruction::Deposit { amount: 2 });
    balances(&registry, "alice", &alice.pubkey());

    section(3, "An early withdrawal is refused");
    submit(&registry, &alice, Instruction::Withdraw { amount: 1 });

    section(4, "Alice reaches the target and withdraws in steps");
    submit(&registry, &alice, Instruction::Deposit { amount: 1 });
    submit(&registry, &alice, Instruction::Withdraw { amount: 2 });
    submit(&registry, &alice, Instruction::Withdraw { amount: 3 });
    submit(&registry, &alice, Instruction::Close);
    balances(&registry, "alice", &alice.pubkey());

    section(5, "Bob abandons the goal");
    submit(&registry, &bob, Instruction::Create { target_amount: 100 });
    submit(&registry, &bob, Instruction::Deposit { amount: 7 });
    balances(&registry, "bob", &bob.pubkey());
    submit(&registry, &bob, Instruction::EmergencyWithdraw);
    balances(&registry, "bob", &bob.pubkey());

    section(6, "Integrity");
    match registry.check_invariants() {
        Ok(()) => success("every vault matches its custody pool"),
        Err(err) => rejected(&err.to_string()),
    }
    println!();
}
