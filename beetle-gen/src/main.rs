//! Random workload generator for the beetle-kv ledger engine.
//!
//! Generates accounts and transfers, applies them to an engine over the
//! in-memory store, and finishes with a conservation audit: across every
//! generated account, posted debits must equal posted credits and no pending
//! balance may survive once all two-phase transfers are resolved.
//!
//! # Usage
//!
//! ```bash
//! # 100 accounts, 1000 transfers
//! beetle-gen --accounts 100 --transfers 1000
//!
//! # Route a third of the volume through the two-phase path
//! beetle-gen --accounts 50 --transfers 500 --pending 33
//!
//! # Keep balance history and use a custom ledger
//! beetle-gen --accounts 20 --transfers 100 --history --ledger 7
//! ```

use clap::Parser;
use rand::Rng;

use beetle_kv::{
    Account, AccountFlags, CreateResult, Engine, MemStore, Transfer, TransferFlags,
};

/// Random workload generator for the beetle-kv ledger engine.
#[derive(Parser, Debug)]
#[command(name = "beetle-gen")]
#[command(about = "Generate and apply test workloads to an embedded ledger engine")]
struct Args {
    /// Number of accounts to create
    #[arg(long, default_value_t = 100)]
    accounts: u32,

    /// Number of transfers to create
    #[arg(long, default_value_t = 0)]
    transfers: u32,

    /// Ledger for all accounts and transfers
    #[arg(short, long, default_value_t = 1)]
    ledger: u32,

    /// Account and transfer code
    #[arg(long, default_value_t = 1)]
    code: u16,

    /// Maximum transfer amount
    #[arg(long, default_value_t = 10000)]
    max_amount: u128,

    /// Percentage of transfers routed through the two-phase path (0-100);
    /// each pending transfer is alternately posted and voided
    #[arg(long, default_value_t = 0)]
    pending: u8,

    /// Create accounts with balance history enabled
    #[arg(long)]
    history: bool,

    /// Records per engine batch
    #[arg(short, long, default_value_t = 1000)]
    batch_size: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Dry run - generate data but don't apply it
    #[arg(long)]
    dry_run: bool,
}

/// Generate a batch of random accounts.
fn generate_accounts(count: u32, ledger: u32, code: u16, history: bool) -> Vec<Account> {
    let flags = if history {
        AccountFlags::HISTORY
    } else {
        AccountFlags::empty()
    };
    let mut accounts = Vec::with_capacity(count as usize);

    for _ in 0..count {
        accounts.push(Account {
            id: beetle_kv::id(),
            ledger,
            code,
            flags,
            ..Default::default()
        });
    }

    accounts
}

/// Generate a batch of random transfers between accounts.
///
/// `pending_pct` of them carry the `PENDING` flag.
fn generate_transfers(
    count: u32,
    account_ids: &[u128],
    ledger: u32,
    code: u16,
    max_amount: u128,
    pending_pct: u8,
) -> Vec<Transfer> {
    assert!(
        account_ids.len() >= 2,
        "Need at least 2 accounts for transfers"
    );

    let mut rng = rand::thread_rng();
    let mut transfers = Vec::with_capacity(count as usize);

    for _ in 0..count {
        // Pick random debit and credit accounts (must be different)
        let debit_idx = rng.gen_range(0..account_ids.len());
        let mut credit_idx = rng.gen_range(0..account_ids.len());
        while credit_idx == debit_idx {
            credit_idx = rng.gen_range(0..account_ids.len());
        }

        let amount = rng.gen_range(1..=max_amount);
        let flags = if rng.gen_range(0..100) < pending_pct as u32 {
            TransferFlags::PENDING
        } else {
            TransferFlags::empty()
        };

        transfers.push(Transfer {
            id: beetle_kv::id(),
            debit_account_id: account_ids[debit_idx],
            credit_account_id: account_ids[credit_idx],
            amount,
            ledger,
            code,
            flags,
            ..Default::default()
        });
    }

    transfers
}

/// Build the resolutions for a slice of pending transfers, posting and
/// voiding alternately.
fn generate_resolutions(pendings: &[Transfer]) -> Vec<Transfer> {
    pendings
        .iter()
        .enumerate()
        .map(|(i, pending)| Transfer {
            id: beetle_kv::id(),
            debit_account_id: pending.debit_account_id,
            credit_account_id: pending.credit_account_id,
            amount: 0,
            pending_id: pending.id,
            ledger: pending.ledger,
            code: pending.code,
            flags: if i % 2 == 0 {
                TransferFlags::POST_PENDING
            } else {
                TransferFlags::VOID_PENDING
            },
            ..Default::default()
        })
        .collect()
}

/// Apply records in chunks, returning (created, failed) counts.
fn apply_in_batches<T: Copy>(
    records: &[T],
    batch_size: u32,
    mut apply: impl FnMut(&[T]) -> beetle_kv::Result<Vec<CreateResult>>,
) -> beetle_kv::Result<(u32, u32)> {
    let mut created = 0;
    let mut failed = 0;
    for chunk in records.chunks(batch_size.max(1) as usize) {
        let results = apply(chunk)?;
        for result in results {
            if result.is_ok() {
                created += 1;
            } else {
                failed += 1;
                tracing::warn!(code = result.code(), "record rejected: {result:?}");
            }
        }
    }
    Ok((created, failed))
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        accounts = args.accounts,
        transfers = args.transfers,
        ledger = args.ledger,
        pending_pct = args.pending,
        "generating workload"
    );

    if args.accounts == 0 {
        println!("No accounts to create. Exiting.");
        return Ok(());
    }
    if args.transfers > 0 && args.accounts < 2 {
        return Err("Need at least 2 accounts to create transfers".into());
    }
    if args.pending > 100 {
        return Err("--pending is a percentage (0-100)".into());
    }

    let accounts = generate_accounts(args.accounts, args.ledger, args.code, args.history);
    let account_ids: Vec<u128> = accounts.iter().map(|a| a.id).collect();

    let transfers = if args.transfers > 0 {
        generate_transfers(
            args.transfers,
            &account_ids,
            args.ledger,
            args.code,
            args.max_amount,
            args.pending,
        )
    } else {
        Vec::new()
    };

    if args.dry_run {
        println!("Dry run mode - not applying");
        println!("Sample account: {:032x}", accounts[0].id);
        if !transfers.is_empty() {
            println!(
                "Sample transfer: {:032x} ({} units)",
                transfers[0].id, transfers[0].amount
            );
        }
        return Ok(());
    }

    let mut engine = Engine::new(MemStore::new());

    tracing::info!("applying accounts");
    let (accounts_created, accounts_failed) =
        apply_in_batches(&accounts, args.batch_size, |chunk| {
            engine.create_accounts(chunk)
        })?;

    let mut transfers_created = 0;
    let mut transfers_failed = 0;
    if !transfers.is_empty() {
        tracing::info!("applying transfers");
        let (created, failed) = apply_in_batches(&transfers, args.batch_size, |chunk| {
            engine.create_transfers(chunk)
        })?;
        transfers_created = created;
        transfers_failed = failed;

        let pendings: Vec<Transfer> = transfers
            .iter()
            .filter(|t| t.flags.contains(TransferFlags::PENDING))
            .copied()
            .collect();
        if !pendings.is_empty() {
            tracing::info!(count = pendings.len(), "resolving pending transfers");
            let resolutions = generate_resolutions(&pendings);
            let (created, failed) =
                apply_in_batches(&resolutions, args.batch_size, |chunk| {
                    engine.create_transfers(chunk)
                })?;
            transfers_created += created;
            transfers_failed += failed;
        }
    }

    // Conservation audit over everything we created.
    let mut debits_posted = 0u128;
    let mut credits_posted = 0u128;
    let mut debits_pending = 0u128;
    let mut credits_pending = 0u128;
    for &id in &account_ids {
        if let Some(account) = engine.lookup_account(id)? {
            debits_posted += account.debits_posted;
            credits_posted += account.credits_posted;
            debits_pending += account.debits_pending;
            credits_pending += account.credits_pending;
        }
    }

    println!("Accounts:  {} created, {} failed", accounts_created, accounts_failed);
    println!("Transfers: {} created, {} failed", transfers_created, transfers_failed);
    println!("Posted:    {} debits / {} credits", debits_posted, credits_posted);
    println!("Pending:   {} debits / {} credits", debits_pending, credits_pending);

    if debits_posted != credits_posted || debits_pending != credits_pending {
        return Err("conservation audit failed: debit and credit sums diverge".into());
    }
    println!("Conservation audit passed.");

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    run(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_accounts() {
        let accounts = generate_accounts(10, 1, 100, false);

        assert_eq!(accounts.len(), 10);
        for account in &accounts {
            assert_ne!(account.id, 0);
            assert_eq!(account.ledger, 1);
            assert_eq!(account.code, 100);
            assert!(account.flags.is_empty());
        }

        // Verify all IDs are unique
        let mut ids: Vec<u128> = accounts.iter().map(|a| a.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn test_generate_accounts_with_history() {
        let accounts = generate_accounts(3, 1, 1, true);
        assert!(accounts
            .iter()
            .all(|a| a.flags.contains(AccountFlags::HISTORY)));
    }

    #[test]
    fn test_generate_transfers() {
        let account_ids: Vec<u128> = (1..=5).map(|i| i as u128).collect();
        let transfers = generate_transfers(20, &account_ids, 1, 50, 1000, 0);

        assert_eq!(transfers.len(), 20);
        for transfer in &transfers {
            assert_ne!(transfer.id, 0);
            assert_eq!(transfer.ledger, 1);
            assert_eq!(transfer.code, 50);
            assert!(transfer.flags.is_empty());
            assert!(transfer.amount >= 1 && transfer.amount <= 1000);
            assert!(account_ids.contains(&transfer.debit_account_id));
            assert!(account_ids.contains(&transfer.credit_account_id));
            assert_ne!(transfer.debit_account_id, transfer.credit_account_id);
        }
    }

    #[test]
    fn test_generate_transfers_all_pending() {
        let account_ids: Vec<u128> = vec![1, 2, 3];
        let transfers = generate_transfers(10, &account_ids, 1, 1, 100, 100);
        assert!(transfers
            .iter()
            .all(|t| t.flags.contains(TransferFlags::PENDING)));
    }

    #[test]
    #[should_panic(expected = "Need at least 2 accounts")]
    fn test_generate_transfers_requires_two_accounts() {
        let account_ids = vec![1u128];
        generate_transfers(1, &account_ids, 1, 1, 100, 0);
    }

    #[test]
    fn test_generated_workload_conserves() {
        let accounts = generate_accounts(4, 9, 7, false);
        let ids: Vec<u128> = accounts.iter().map(|a| a.id).collect();
        let transfers = generate_transfers(50, &ids, 9, 7, 500, 40);
        let pendings: Vec<Transfer> = transfers
            .iter()
            .filter(|t| t.flags.contains(TransferFlags::PENDING))
            .copied()
            .collect();
        let resolutions = generate_resolutions(&pendings);

        let mut engine = Engine::new(MemStore::new());
        for result in engine.create_accounts(&accounts).unwrap() {
            assert!(result.is_ok());
        }
        for result in engine.create_transfers(&transfers).unwrap() {
            assert!(result.is_ok());
        }
        for result in engine.create_transfers(&resolutions).unwrap() {
            assert!(result.is_ok());
        }

        let mut debits = 0u128;
        let mut credits = 0u128;
        for &id in &ids {
            let account = engine.lookup_account(id).unwrap().unwrap();
            debits += account.debits_posted;
            credits += account.credits_posted;
            assert_eq!(account.debits_pending, 0);
            assert_eq!(account.credits_pending, 0);
        }
        assert_eq!(debits, credits);
    }
}
