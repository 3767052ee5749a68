//! Speculative write overlay for one engine invocation.

use crate::error::EngineError;
use crate::store::{keys, Store, WriteBatch};
use crate::wire::codec;
use crate::wire::types::{Account, Transfer};
use std::collections::BTreeMap;

/// How a pending transfer was resolved.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Resolution {
    /// Resolved by a post-pending transfer.
    Posted,
    /// Resolved by a void-pending transfer.
    Voided,
}

impl Resolution {
    pub(crate) fn as_byte(self) -> u8 {
        match self {
            Resolution::Posted => 1,
            Resolution::Voided => 2,
        }
    }

    fn from_marker(marker: &[u8]) -> Result<Resolution, EngineError> {
        match marker.first() {
            Some(1) => Ok(Resolution::Posted),
            Some(2) => Ok(Resolution::Voided),
            _ => Err(EngineError::Corrupt(format!(
                "resolution marker holds {marker:?}"
            ))),
        }
    }
}

/// Buffered state for the records an invocation has touched.
///
/// Reads fall through to the store when the overlay has no entry, so records
/// staged by an earlier chain of the same invocation are visible to later
/// ones. The whole overlay converts into a single [`WriteBatch`] at commit
/// time; a failed chain restores the checkpoint clone instead.
#[derive(Clone, Debug, Default)]
pub(crate) struct Staging {
    accounts: BTreeMap<u128, Account>,
    transfers: BTreeMap<u128, Transfer>,
    resolutions: BTreeMap<u128, Resolution>,
    appends: Vec<(String, Vec<u8>)>,
}

impl Staging {
    /// Read an account through the overlay.
    pub(crate) fn account<S: Store>(
        &self,
        store: &S,
        id: u128,
    ) -> Result<Option<Account>, EngineError> {
        if let Some(account) = self.accounts.get(&id) {
            return Ok(Some(*account));
        }
        match store.get(&keys::account(id))? {
            Some(blob) => Ok(Some(codec::decode_account(&blob)?)),
            None => Ok(None),
        }
    }

    /// Read a transfer through the overlay.
    pub(crate) fn transfer<S: Store>(
        &self,
        store: &S,
        id: u128,
    ) -> Result<Option<Transfer>, EngineError> {
        if let Some(transfer) = self.transfers.get(&id) {
            return Ok(Some(*transfer));
        }
        match store.get(&keys::transfer(id))? {
            Some(blob) => Ok(Some(codec::decode_transfer(&blob)?)),
            None => Ok(None),
        }
    }

    /// Read a pending transfer's resolution through the overlay.
    pub(crate) fn resolution<S: Store>(
        &self,
        store: &S,
        pending_id: u128,
    ) -> Result<Option<Resolution>, EngineError> {
        if let Some(resolution) = self.resolutions.get(&pending_id) {
            return Ok(Some(*resolution));
        }
        match store.get(&keys::resolved(pending_id))? {
            Some(marker) => Ok(Some(Resolution::from_marker(&marker)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn stage_account(&mut self, account: Account) {
        self.accounts.insert(account.id, account);
    }

    pub(crate) fn stage_transfer(&mut self, transfer: Transfer) {
        self.transfers.insert(transfer.id, transfer);
    }

    pub(crate) fn stage_resolution(&mut self, pending_id: u128, resolution: Resolution) {
        self.resolutions.insert(pending_id, resolution);
    }

    pub(crate) fn stage_append(&mut self, key: String, entry: Vec<u8>) {
        self.appends.push((key, entry));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.accounts.is_empty()
            && self.transfers.is_empty()
            && self.resolutions.is_empty()
            && self.appends.is_empty()
    }

    /// Convert the overlay into a write batch: record puts first, then the
    /// index and history appends in staging order.
    pub(crate) fn into_batch(self) -> WriteBatch {
        let mut batch = WriteBatch::new();
        for (id, account) in &self.accounts {
            batch.put(keys::account(*id), codec::encode_account(account).to_vec());
        }
        for (id, transfer) in &self.transfers {
            batch.put(keys::transfer(*id), codec::encode_transfer(transfer).to_vec());
        }
        for (pending_id, resolution) in &self.resolutions {
            batch.put(keys::resolved(*pending_id), vec![resolution.as_byte()]);
        }
        for (key, entry) in self.appends {
            batch.append(key, entry);
        }
        batch
    }
}
