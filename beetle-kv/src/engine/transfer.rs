//! The transfer state machine.
//!
//! Validates one transfer record against the staged view of the store and, on
//! success, stages its effects: the mutated account balances, the immutable
//! transfer record, the resolution marker for post/void, both index entries,
//! and balance snapshots for `HISTORY` accounts. Every violation is returned
//! as a result code; `Err` is reserved for store failures, which abort the
//! invocation.

use crate::clock::TimestampOracle;
use crate::error::EngineError;
use crate::index::{IndexEntry, Side};
use crate::store::{keys, Store};
use crate::wire::codec;
use crate::wire::types::{
    Account, AccountFlags, BalanceSnapshot, CreateResult, Transfer, TransferFlags,
};

use super::staging::{Resolution, Staging};

pub(crate) fn apply<S: Store>(
    store: &mut S,
    clock: &TimestampOracle,
    staging: &mut Staging,
    t: &Transfer,
) -> Result<CreateResult, EngineError> {
    let flags = t.flags;

    if flags.bits() & !TransferFlags::all().bits() != 0 {
        return Ok(CreateResult::ReservedNonzero);
    }

    let pending_class = flags
        & (TransferFlags::PENDING | TransferFlags::POST_PENDING | TransferFlags::VOID_PENDING);
    if pending_class.bits().count_ones() > 1 {
        return Ok(CreateResult::FlagsAreMutuallyExclusive);
    }
    let resolving =
        flags.intersects(TransferFlags::POST_PENDING | TransferFlags::VOID_PENDING);
    let balancing =
        flags.intersects(TransferFlags::BALANCING_DEBIT | TransferFlags::BALANCING_CREDIT);
    if resolving && balancing {
        return Ok(CreateResult::FlagsAreMutuallyExclusive);
    }

    if t.id == 0 {
        return Ok(CreateResult::IdMustNotBeZero);
    }
    if t.debit_account_id == 0 {
        return Ok(CreateResult::DebitAccountIdMustNotBeZero);
    }
    if t.credit_account_id == 0 {
        return Ok(CreateResult::CreditAccountIdMustNotBeZero);
    }
    if t.debit_account_id == t.credit_account_id {
        return Ok(CreateResult::AccountsMustBeDifferent);
    }
    if t.ledger == 0 {
        return Ok(CreateResult::LedgerMustNotBeZero);
    }
    if t.code == 0 {
        return Ok(CreateResult::CodeMustNotBeZero);
    }

    if resolving {
        if t.pending_id == 0 {
            return Ok(CreateResult::PendingIdMustNotBeZero);
        }
        if t.pending_id == t.id {
            return Ok(CreateResult::PendingIdMustBeDifferent);
        }
    } else if t.pending_id != 0 {
        return Ok(CreateResult::PendingIdMustBeZero);
    }

    if t.timeout != 0 && !flags.contains(TransferFlags::PENDING) {
        return Ok(CreateResult::TimeoutReservedForPendingTransfer);
    }
    // Zero amounts mean "the full pending amount" when resolving and "as much
    // as the balances allow" when balancing; otherwise they are an error.
    if t.amount == 0 && !resolving && !balancing {
        return Ok(CreateResult::AmountMustNotBeZero);
    }

    if let Some(existing) = staging.transfer(store, t.id)? {
        return Ok(existing_code(&existing, t));
    }

    let Some(mut debit) = staging.account(store, t.debit_account_id)? else {
        return Ok(CreateResult::DebitAccountNotFound);
    };
    let Some(mut credit) = staging.account(store, t.credit_account_id)? else {
        return Ok(CreateResult::CreditAccountNotFound);
    };
    if debit.ledger != t.ledger || credit.ledger != t.ledger {
        return Ok(CreateResult::LedgerMustMatch);
    }

    let stored_amount: u128;
    let mut resolution = None;

    if resolving {
        let Some(pending) = staging.transfer(store, t.pending_id)? else {
            return Ok(CreateResult::PendingTransferNotFound);
        };
        if !pending.flags.contains(TransferFlags::PENDING) {
            return Ok(CreateResult::PendingTransferNotPending);
        }
        if pending.debit_account_id != t.debit_account_id {
            return Ok(CreateResult::PendingTransferHasDifferentDebitAccountId);
        }
        if pending.credit_account_id != t.credit_account_id {
            return Ok(CreateResult::PendingTransferHasDifferentCreditAccountId);
        }
        if pending.ledger != t.ledger {
            return Ok(CreateResult::PendingTransferHasDifferentLedger);
        }
        match staging.resolution(store, t.pending_id)? {
            Some(Resolution::Posted) => return Ok(CreateResult::PendingTransferAlreadyPosted),
            Some(Resolution::Voided) => return Ok(CreateResult::PendingTransferAlreadyVoided),
            None => {}
        }

        if flags.contains(TransferFlags::POST_PENDING) {
            let posted = if t.amount == 0 { pending.amount } else { t.amount };
            if posted > pending.amount {
                return Ok(CreateResult::ExceedsPendingTransferAmount);
            }
            let Some(value) = debit.debits_posted.checked_add(posted) else {
                return Ok(CreateResult::OverflowsDebitsPosted);
            };
            debit.debits_posted = value;
            let Some(value) = credit.credits_posted.checked_add(posted) else {
                return Ok(CreateResult::OverflowsCreditsPosted);
            };
            credit.credits_posted = value;
            stored_amount = posted;
            resolution = Some(Resolution::Posted);
        } else {
            if t.amount != 0 && t.amount != pending.amount {
                return Ok(CreateResult::PendingTransferHasDifferentAmount);
            }
            stored_amount = pending.amount;
            resolution = Some(Resolution::Voided);
        }

        // The reservation is released in full either way; it cannot underflow
        // while the resolution marker guards against double release.
        debit.debits_pending = debit.debits_pending.saturating_sub(pending.amount);
        credit.credits_pending = credit.credits_pending.saturating_sub(pending.amount);
    } else {
        let amount = effective_amount(t, &debit, &credit);
        if flags.contains(TransferFlags::PENDING) {
            let Some(value) = debit.debits_pending.checked_add(amount) else {
                return Ok(CreateResult::OverflowsDebitsPending);
            };
            debit.debits_pending = value;
            let Some(value) = credit.credits_pending.checked_add(amount) else {
                return Ok(CreateResult::OverflowsCreditsPending);
            };
            credit.credits_pending = value;
        } else {
            let Some(value) = debit.debits_posted.checked_add(amount) else {
                return Ok(CreateResult::OverflowsDebitsPosted);
            };
            debit.debits_posted = value;
            let Some(value) = credit.credits_posted.checked_add(amount) else {
                return Ok(CreateResult::OverflowsCreditsPosted);
            };
            credit.credits_posted = value;
        }
        if let Some(code) = constraint_violation(&debit, &credit) {
            return Ok(code);
        }
        stored_amount = amount;
    }

    let timestamp = clock.next(store)?;
    let mut stored = *t;
    stored.amount = stored_amount;
    stored.timestamp = timestamp;

    staging.stage_transfer(stored);
    staging.stage_account(debit);
    staging.stage_account(credit);
    if let Some(resolution) = resolution {
        staging.stage_resolution(t.pending_id, resolution);
    }

    let debit_entry = IndexEntry {
        timestamp,
        transfer_id: stored.id,
        side: Side::Debit,
    };
    staging.stage_append(
        keys::transfer_index(debit.id),
        debit_entry.encode().to_vec(),
    );
    let credit_entry = IndexEntry {
        timestamp,
        transfer_id: stored.id,
        side: Side::Credit,
    };
    staging.stage_append(
        keys::transfer_index(credit.id),
        credit_entry.encode().to_vec(),
    );

    for account in [&debit, &credit] {
        if account.flags.contains(AccountFlags::HISTORY) {
            let snapshot = BalanceSnapshot {
                timestamp,
                debits_pending: account.debits_pending,
                debits_posted: account.debits_posted,
                credits_pending: account.credits_pending,
                credits_posted: account.credits_posted,
            };
            staging.stage_append(
                keys::balance_history(account.id),
                codec::encode_balance_snapshot(&snapshot).to_vec(),
            );
        }
    }

    Ok(CreateResult::Ok)
}

/// The amount a transfer actually moves, after any balancing clamp.
///
/// `BALANCING_DEBIT` caps the amount at what the debit account can cover
/// without its debits exceeding its credits; `BALANCING_CREDIT` symmetrically
/// for the credit account. With both flags the smaller cap wins. An input
/// amount of zero means "up to the full available balance".
fn effective_amount(t: &Transfer, debit: &Account, credit: &Account) -> u128 {
    if !t
        .flags
        .intersects(TransferFlags::BALANCING_DEBIT | TransferFlags::BALANCING_CREDIT)
    {
        return t.amount;
    }
    let mut amount = if t.amount == 0 { u128::MAX } else { t.amount };
    if t.flags.contains(TransferFlags::BALANCING_DEBIT) {
        let available = debit
            .credits_posted
            .saturating_add(debit.credits_pending)
            .saturating_sub(debit.debits_posted)
            .saturating_sub(debit.debits_pending);
        amount = amount.min(available);
    }
    if t.flags.contains(TransferFlags::BALANCING_CREDIT) {
        let available = credit
            .debits_posted
            .saturating_add(credit.debits_pending)
            .saturating_sub(credit.credits_posted)
            .saturating_sub(credit.credits_pending);
        amount = amount.min(available);
    }
    amount
}

/// Check the mutated pair against their balance-constraint flags.
///
/// Uses posted+pending totals: a pending reservation counts against the
/// constraint just like a posted amount.
fn constraint_violation(debit: &Account, credit: &Account) -> Option<CreateResult> {
    let Some(debits_total) = debit.debits_pending.checked_add(debit.debits_posted) else {
        return Some(CreateResult::OverflowsDebits);
    };
    let Some(credits_total) = credit.credits_pending.checked_add(credit.credits_posted) else {
        return Some(CreateResult::OverflowsCredits);
    };
    if debit
        .flags
        .contains(AccountFlags::DEBITS_MUST_NOT_EXCEED_CREDITS)
        && debits_total > debit.credits_posted
    {
        return Some(CreateResult::ExceedsCredits);
    }
    if credit
        .flags
        .contains(AccountFlags::CREDITS_MUST_NOT_EXCEED_DEBITS)
        && credits_total > credit.debits_posted
    {
        return Some(CreateResult::ExceedsDebits);
    }
    None
}

/// Deep-compare an incoming transfer against the stored record with the same
/// id: identical non-timestamp content is the idempotent `Exists`, anything
/// else names the first differing field.
fn existing_code(existing: &Transfer, t: &Transfer) -> CreateResult {
    if existing.flags != t.flags {
        return CreateResult::ExistsWithDifferentFlags;
    }
    if existing.debit_account_id != t.debit_account_id {
        return CreateResult::ExistsWithDifferentDebitAccountId;
    }
    if existing.credit_account_id != t.credit_account_id {
        return CreateResult::ExistsWithDifferentCreditAccountId;
    }
    // A resolving retry with amount 0 asked for the full pending amount,
    // which is what the stored record holds.
    let amount = if t.amount == 0
        && t.flags
            .intersects(TransferFlags::POST_PENDING | TransferFlags::VOID_PENDING)
    {
        existing.amount
    } else {
        t.amount
    };
    if existing.amount != amount {
        return CreateResult::ExistsWithDifferentAmount;
    }
    if existing.pending_id != t.pending_id {
        return CreateResult::ExistsWithDifferentPendingId;
    }
    if existing.timeout != t.timeout {
        return CreateResult::ExistsWithDifferentTimeout;
    }
    if existing.user_data_128 != t.user_data_128
        || existing.user_data_64 != t.user_data_64
        || existing.user_data_32 != t.user_data_32
    {
        return CreateResult::ExistsWithDifferentUserData;
    }
    if existing.ledger != t.ledger {
        return CreateResult::ExistsWithDifferentLedger;
    }
    if existing.code != t.code {
        return CreateResult::ExistsWithDifferentCode;
    }
    CreateResult::Exists
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;

    fn account(id: u128, flags: AccountFlags) -> Account {
        Account {
            id,
            ledger: 700,
            code: 10,
            flags,
            ..Default::default()
        }
    }

    fn transfer(id: u128, debit: u128, credit: u128, amount: u128) -> Transfer {
        Transfer {
            id,
            debit_account_id: debit,
            credit_account_id: credit,
            amount,
            ledger: 700,
            code: 10,
            ..Default::default()
        }
    }

    fn apply_one(staging: &mut Staging, t: &Transfer) -> CreateResult {
        let mut store = MemStore::new();
        let clock = TimestampOracle::new();
        apply(&mut store, &clock, staging, t).unwrap()
    }

    #[test]
    fn test_structural_codes() {
        let mut staging = Staging::default();
        staging.stage_account(account(1, AccountFlags::empty()));
        staging.stage_account(account(2, AccountFlags::empty()));

        let cases = [
            (transfer(0, 1, 2, 10), CreateResult::IdMustNotBeZero),
            (transfer(5, 0, 2, 10), CreateResult::DebitAccountIdMustNotBeZero),
            (transfer(5, 1, 0, 10), CreateResult::CreditAccountIdMustNotBeZero),
            (transfer(5, 1, 1, 10), CreateResult::AccountsMustBeDifferent),
            (transfer(5, 1, 2, 0), CreateResult::AmountMustNotBeZero),
        ];
        for (t, expected) in cases {
            assert_eq!(apply_one(&mut staging, &t), expected, "{t:?}");
        }

        let mut t = transfer(5, 1, 2, 10);
        t.ledger = 0;
        assert_eq!(apply_one(&mut staging, &t), CreateResult::LedgerMustNotBeZero);
        let mut t = transfer(5, 1, 2, 10);
        t.code = 0;
        assert_eq!(apply_one(&mut staging, &t), CreateResult::CodeMustNotBeZero);
    }

    #[test]
    fn test_flag_exclusivity() {
        let mut staging = Staging::default();
        let mut t = transfer(5, 1, 2, 10);
        t.flags = TransferFlags::PENDING | TransferFlags::POST_PENDING;
        assert_eq!(
            apply_one(&mut staging, &t),
            CreateResult::FlagsAreMutuallyExclusive
        );

        t.flags = TransferFlags::POST_PENDING | TransferFlags::BALANCING_DEBIT;
        t.pending_id = 4;
        assert_eq!(
            apply_one(&mut staging, &t),
            CreateResult::FlagsAreMutuallyExclusive
        );

        t.flags = TransferFlags::from_bits_retain(1 << 9);
        assert_eq!(apply_one(&mut staging, &t), CreateResult::ReservedNonzero);
    }

    #[test]
    fn test_pending_id_policy() {
        let mut staging = Staging::default();
        let mut t = transfer(5, 1, 2, 10);
        t.pending_id = 3;
        assert_eq!(apply_one(&mut staging, &t), CreateResult::PendingIdMustBeZero);

        let mut t = transfer(5, 1, 2, 0);
        t.flags = TransferFlags::POST_PENDING;
        assert_eq!(
            apply_one(&mut staging, &t),
            CreateResult::PendingIdMustNotBeZero
        );
        t.pending_id = 5;
        assert_eq!(
            apply_one(&mut staging, &t),
            CreateResult::PendingIdMustBeDifferent
        );
    }

    #[test]
    fn test_timeout_reserved_for_pending() {
        let mut staging = Staging::default();
        let mut t = transfer(5, 1, 2, 10);
        t.timeout = 60;
        assert_eq!(
            apply_one(&mut staging, &t),
            CreateResult::TimeoutReservedForPendingTransfer
        );
    }

    #[test]
    fn test_effective_amount_clamps() {
        let mut debit = account(1, AccountFlags::empty());
        debit.credits_posted = 100;
        debit.debits_posted = 30;
        let credit = account(2, AccountFlags::empty());

        let mut t = transfer(5, 1, 2, 1_000);
        t.flags = TransferFlags::BALANCING_DEBIT;
        assert_eq!(effective_amount(&t, &debit, &credit), 70);

        // Below the cap the requested amount stands.
        t.amount = 50;
        assert_eq!(effective_amount(&t, &debit, &credit), 50);

        // Zero asks for everything available.
        t.amount = 0;
        assert_eq!(effective_amount(&t, &debit, &credit), 70);

        // An exhausted account clamps to zero.
        debit.debits_posted = 100;
        t.amount = 10;
        assert_eq!(effective_amount(&t, &debit, &credit), 0);
    }

    #[test]
    fn test_constraint_violation() {
        let mut debit = account(1, AccountFlags::DEBITS_MUST_NOT_EXCEED_CREDITS);
        debit.credits_posted = 100;
        debit.debits_posted = 90;
        debit.debits_pending = 10;
        let credit = account(2, AccountFlags::empty());
        assert_eq!(constraint_violation(&debit, &credit), None);

        debit.debits_pending = 11;
        assert_eq!(
            constraint_violation(&debit, &credit),
            Some(CreateResult::ExceedsCredits)
        );

        let debit = account(1, AccountFlags::empty());
        let mut credit = account(2, AccountFlags::CREDITS_MUST_NOT_EXCEED_DEBITS);
        credit.credits_posted = 5;
        assert_eq!(
            constraint_violation(&debit, &credit),
            Some(CreateResult::ExceedsDebits)
        );
    }

    #[test]
    fn test_existing_code_ranks_fields() {
        let stored = transfer(5, 1, 2, 10);
        assert_eq!(existing_code(&stored, &stored), CreateResult::Exists);

        let mut t = stored;
        t.amount = 11;
        assert_eq!(
            existing_code(&stored, &t),
            CreateResult::ExistsWithDifferentAmount
        );

        let mut t = stored;
        t.user_data_64 = 1;
        assert_eq!(
            existing_code(&stored, &t),
            CreateResult::ExistsWithDifferentUserData
        );

        let mut t = stored;
        t.flags = TransferFlags::PENDING;
        t.user_data_64 = 1;
        assert_eq!(
            existing_code(&stored, &t),
            CreateResult::ExistsWithDifferentFlags
        );
    }

    #[test]
    fn test_resolving_retry_with_zero_amount_is_exists() {
        let mut stored = transfer(6, 1, 2, 600);
        stored.flags = TransferFlags::POST_PENDING;
        stored.pending_id = 5;

        let mut retry = stored;
        retry.amount = 0;
        assert_eq!(existing_code(&stored, &retry), CreateResult::Exists);
    }
}
