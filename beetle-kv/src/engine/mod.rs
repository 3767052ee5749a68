//! The ledger engine.
//!
//! [`Engine`] owns the store and exposes the eight atomic operations, each of
//! which runs to completion as one serializable unit: reads go through an
//! invocation-scoped staging overlay and every mutation of the invocation
//! lands in a single atomic write batch. Linked chains within a batch commit
//! or roll back together.

mod query;
mod staging;
mod transfer;

pub use query::DEFAULT_LIMIT;

use crate::clock::TimestampOracle;
use crate::error::Result;
use crate::store::{keys, Store};
use crate::wire::codec::{self, ACCOUNT_SIZE, TRANSFER_SIZE};
use crate::wire::operation::Operation;
use crate::wire::types::{
    Account, AccountFilter, AccountFlags, BalanceSnapshot, CreateResult, Transfer, TransferFlags,
};

use staging::Staging;

/// One slot in a create batch: a decoded record, or a chunk that was too
/// short to decode and fails with [`CreateResult::Malformed`].
enum BatchEvent<T> {
    Record(T),
    Malformed,
}

fn decode_events<T>(
    payload: &[u8],
    record_size: usize,
    decode: fn(&[u8]) -> Result<T>,
) -> Vec<BatchEvent<T>> {
    payload
        .chunks(record_size)
        .map(|chunk| match decode(chunk) {
            Ok(record) => BatchEvent::Record(record),
            Err(_) => BatchEvent::Malformed,
        })
        .collect()
}

fn existing_account_code(existing: &Account, account: &Account) -> CreateResult {
    if existing.flags != account.flags {
        return CreateResult::ExistsWithDifferentFlags;
    }
    if existing.user_data_128 != account.user_data_128
        || existing.user_data_64 != account.user_data_64
        || existing.user_data_32 != account.user_data_32
    {
        return CreateResult::ExistsWithDifferentUserData;
    }
    if existing.ledger != account.ledger {
        return CreateResult::ExistsWithDifferentLedger;
    }
    if existing.code != account.code {
        return CreateResult::ExistsWithDifferentCode;
    }
    CreateResult::Exists
}

/// The double-entry ledger kernel over a key-value store.
pub struct Engine<S> {
    store: S,
    clock: TimestampOracle,
}

impl<S: Store> Engine<S> {
    /// Create an engine over `store`.
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: TimestampOracle::new(),
        }
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutably borrow the underlying store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consume the engine, yielding the store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Create a single account.
    pub fn create_account(&mut self, account: &Account) -> Result<CreateResult> {
        Ok(self.create_accounts(std::slice::from_ref(account))?[0])
    }

    /// Create a batch of accounts with linked-chain semantics.
    ///
    /// Returns one result per record, in input order.
    pub fn create_accounts(&mut self, accounts: &[Account]) -> Result<Vec<CreateResult>> {
        let events: Vec<BatchEvent<Account>> =
            accounts.iter().map(|a| BatchEvent::Record(*a)).collect();
        self.process_chains(
            &events,
            |account: &Account| account.flags.contains(AccountFlags::LINKED),
            |engine, staging, record| engine.apply_account(staging, record),
        )
    }

    /// Create a batch of accounts from concatenated 128-byte records.
    ///
    /// A trailing partial record occupies a slot that fails with
    /// [`CreateResult::Malformed`] and takes its chain down with it.
    pub fn create_accounts_blob(&mut self, payload: &[u8]) -> Result<Vec<CreateResult>> {
        let events = decode_events(payload, ACCOUNT_SIZE, codec::decode_account);
        self.process_chains(
            &events,
            |account: &Account| account.flags.contains(AccountFlags::LINKED),
            |engine, staging, record| engine.apply_account(staging, record),
        )
    }

    /// Create a single transfer.
    pub fn create_transfer(&mut self, t: &Transfer) -> Result<CreateResult> {
        Ok(self.create_transfers(std::slice::from_ref(t))?[0])
    }

    /// Create a batch of transfers with linked-chain semantics.
    pub fn create_transfers(&mut self, transfers: &[Transfer]) -> Result<Vec<CreateResult>> {
        let events: Vec<BatchEvent<Transfer>> =
            transfers.iter().map(|t| BatchEvent::Record(*t)).collect();
        self.process_chains(
            &events,
            |t: &Transfer| t.flags.contains(TransferFlags::LINKED),
            |engine, staging, record| {
                transfer::apply(&mut engine.store, &engine.clock, staging, record)
            },
        )
    }

    /// Create a batch of transfers from concatenated 128-byte records.
    pub fn create_transfers_blob(&mut self, payload: &[u8]) -> Result<Vec<CreateResult>> {
        let events = decode_events(payload, TRANSFER_SIZE, codec::decode_transfer);
        self.process_chains(
            &events,
            |t: &Transfer| t.flags.contains(TransferFlags::LINKED),
            |engine, staging, record| {
                transfer::apply(&mut engine.store, &engine.clock, staging, record)
            },
        )
    }

    /// Look up an account by id. Pure read; never assigns timestamps.
    pub fn lookup_account(&self, id: u128) -> Result<Option<Account>> {
        match self.store.get(&keys::account(id))? {
            Some(blob) => Ok(Some(codec::decode_account(&blob)?)),
            None => Ok(None),
        }
    }

    /// Look up a transfer by id. Pure read.
    pub fn lookup_transfer(&self, id: u128) -> Result<Option<Transfer>> {
        match self.store.get(&keys::transfer(id))? {
            Some(blob) => Ok(Some(codec::decode_transfer(&blob)?)),
            None => Ok(None),
        }
    }

    /// Range-query the transfers affecting an account, filter-ordered.
    pub fn get_account_transfers(&self, filter: &AccountFilter) -> Result<Vec<Transfer>> {
        query::account_transfers(&self.store, filter)
    }

    /// Range-query an account's balance history.
    ///
    /// Empty unless the account exists and carries [`AccountFlags::HISTORY`].
    pub fn get_account_balances(&self, filter: &AccountFilter) -> Result<Vec<BalanceSnapshot>> {
        query::account_balances(&self.store, filter)
    }

    /// Blob-in/blob-out entry point for external dispatchers.
    ///
    /// Single-record creates return exactly one code byte, linked creates one
    /// byte per record, lookups a 128-byte record or an empty blob, queries a
    /// concatenation of records. A lookup or query argument of the wrong size
    /// is a dispatcher contract violation and surfaces as a malformed-argument
    /// error rather than a result code.
    pub fn dispatch(&mut self, operation: Operation, payload: &[u8]) -> Result<Vec<u8>> {
        match operation {
            Operation::CreateAccount => {
                if payload.len() != ACCOUNT_SIZE {
                    return Ok(vec![CreateResult::Malformed.code()]);
                }
                let results = self.create_accounts_blob(payload)?;
                Ok(results.iter().map(|r| r.code()).collect())
            }
            Operation::CreateTransfer => {
                if payload.len() != TRANSFER_SIZE {
                    return Ok(vec![CreateResult::Malformed.code()]);
                }
                let results = self.create_transfers_blob(payload)?;
                Ok(results.iter().map(|r| r.code()).collect())
            }
            Operation::CreateLinkedAccounts => {
                let results = self.create_accounts_blob(payload)?;
                Ok(results.iter().map(|r| r.code()).collect())
            }
            Operation::CreateLinkedTransfers => {
                let results = self.create_transfers_blob(payload)?;
                Ok(results.iter().map(|r| r.code()).collect())
            }
            Operation::LookupAccount => {
                let id = codec::decode_id(payload)?;
                Ok(match self.lookup_account(id)? {
                    Some(account) => codec::encode_account(&account).to_vec(),
                    None => Vec::new(),
                })
            }
            Operation::LookupTransfer => {
                let id = codec::decode_id(payload)?;
                Ok(match self.lookup_transfer(id)? {
                    Some(t) => codec::encode_transfer(&t).to_vec(),
                    None => Vec::new(),
                })
            }
            Operation::GetAccountTransfers => {
                let filter = codec::decode_account_filter(payload)?;
                let transfers = self.get_account_transfers(&filter)?;
                let mut out = Vec::with_capacity(transfers.len() * TRANSFER_SIZE);
                for t in &transfers {
                    out.extend_from_slice(&codec::encode_transfer(t));
                }
                Ok(out)
            }
            Operation::GetAccountBalances => {
                let filter = codec::decode_account_filter(payload)?;
                let snapshots = self.get_account_balances(&filter)?;
                let mut out = Vec::new();
                for snapshot in &snapshots {
                    out.extend_from_slice(&codec::encode_balance_snapshot(snapshot));
                }
                Ok(out)
            }
        }
    }

    /// Run a batch of create events, chain by chain.
    ///
    /// A chain is a run of consecutive `LINKED` records closed by one record
    /// with `LINKED` clear; a record outside any chain is a chain of one. On
    /// a failure inside a chain the staging overlay rolls back to the chain's
    /// checkpoint, the offender keeps its native code and every other member
    /// reports `LinkedEventFailed`; a chain still open at the end of the
    /// batch fails the same way with `LinkedEventChainOpen` on its last
    /// record. Everything the surviving chains staged commits as one atomic
    /// batch.
    fn process_chains<T>(
        &mut self,
        events: &[BatchEvent<T>],
        is_linked: fn(&T) -> bool,
        mut apply_one: impl FnMut(&mut Self, &mut Staging, &T) -> Result<CreateResult>,
    ) -> Result<Vec<CreateResult>> {
        let mut results = vec![CreateResult::Ok; events.len()];
        let mut staging = Staging::default();
        let mut start = 0;
        while start < events.len() {
            let mut end = start;
            let mut open = false;
            loop {
                let linked = match &events[end] {
                    BatchEvent::Record(record) => is_linked(record),
                    BatchEvent::Malformed => false,
                };
                if !linked {
                    break;
                }
                if end + 1 == events.len() {
                    open = true;
                    break;
                }
                end += 1;
            }

            let checkpoint = staging.clone();
            let mut failure = None;
            if open {
                failure = Some((end, CreateResult::LinkedEventChainOpen));
            } else {
                for index in start..=end {
                    let code = match &events[index] {
                        BatchEvent::Record(record) => apply_one(self, &mut staging, record)?,
                        BatchEvent::Malformed => CreateResult::Malformed,
                    };
                    if !code.is_ok() {
                        failure = Some((index, code));
                        break;
                    }
                    results[index] = CreateResult::Ok;
                }
            }

            if let Some((offender, code)) = failure {
                staging = checkpoint;
                for index in start..=end {
                    results[index] = CreateResult::LinkedEventFailed;
                }
                results[offender] = code;
            }
            start = end + 1;
        }

        if !staging.is_empty() {
            self.store.commit(staging.into_batch())?;
        }
        Ok(results)
    }

    fn apply_account(
        &mut self,
        staging: &mut Staging,
        account: &Account,
    ) -> Result<CreateResult> {
        if account.flags.bits() & !AccountFlags::all().bits() != 0 {
            return Ok(CreateResult::ReservedNonzero);
        }
        if account.reserved != 0 {
            return Ok(CreateResult::ReservedNonzero);
        }
        if account.id == 0 {
            return Ok(CreateResult::IdMustNotBeZero);
        }
        if account
            .flags
            .contains(AccountFlags::DEBITS_MUST_NOT_EXCEED_CREDITS)
            && account
                .flags
                .contains(AccountFlags::CREDITS_MUST_NOT_EXCEED_DEBITS)
        {
            return Ok(CreateResult::FlagsAreMutuallyExclusive);
        }
        if account.ledger == 0 {
            return Ok(CreateResult::LedgerMustNotBeZero);
        }
        if account.code == 0 {
            return Ok(CreateResult::CodeMustNotBeZero);
        }

        if let Some(existing) = staging.account(&self.store, account.id)? {
            return Ok(existing_account_code(&existing, account));
        }

        let timestamp = self.clock.next(&mut self.store)?;
        let created = Account {
            debits_pending: 0,
            debits_posted: 0,
            credits_pending: 0,
            credits_posted: 0,
            timestamp,
            ..*account
        };
        staging.stage_account(created);
        Ok(CreateResult::Ok)
    }
}
