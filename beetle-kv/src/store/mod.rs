//! Store adapter.
//!
//! The only component that touches the underlying key-value substrate. The
//! kernel reads through [`Store`] directly but funnels every mutation into a
//! [`WriteBatch`] that the substrate applies atomically, so a failure
//! anywhere in an invocation leaves no partial write behind.

mod memory;

pub use memory::MemStore;

use std::error::Error;
use std::fmt;

/// Errors surfaced by a store implementation.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying substrate failure (IO, backend error).
    Backend(String),
    /// A stored value had an impossible shape for its key.
    Corrupt(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Backend(msg) => write!(f, "backend error: {}", msg),
            StoreError::Corrupt(msg) => write!(f, "corrupt value: {}", msg),
        }
    }
}

impl Error for StoreError {}

/// A single buffered mutation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WriteOp {
    /// Set `key` to `value`, replacing any existing value.
    Put {
        /// Target key.
        key: String,
        /// Full value to store.
        value: Vec<u8>,
    },
    /// Append `entry` to the list at `key`, creating it if absent.
    Append {
        /// Target list key.
        key: String,
        /// Fixed-size entry to concatenate.
        entry: Vec<u8>,
    },
}

/// An ordered set of mutations applied atomically by [`Store::commit`].
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a put.
    pub fn put(&mut self, key: String, value: Vec<u8>) {
        self.ops.push(WriteOp::Put { key, value });
    }

    /// Buffer a list append.
    pub fn append(&mut self, key: String, entry: Vec<u8>) {
        self.ops.push(WriteOp::Append { key, entry });
    }

    /// Number of buffered mutations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Consume the batch, yielding its mutations in buffer order.
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Abstract key-value substrate.
///
/// Lists are constant-size entries concatenated into one value; `entry_size`
/// tells the adapter how to slice them. Invocations are serialized by the
/// embedding harness, so implementations need no internal locking beyond
/// what [`Store::commit`] requires for atomicity.
pub trait Store {
    /// Read the value at `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Set `key` to `value` outside any batch.
    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Returns true if `key` holds a value.
    fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Append one fixed-size entry to the list at `key`, outside any batch.
    fn append(&mut self, key: &str, entry: &[u8]) -> Result<(), StoreError>;

    /// Number of `entry_size`-byte entries in the list at `key`.
    fn list_len(&self, key: &str, entry_size: usize) -> Result<u64, StoreError>;

    /// Read `count` entries starting at entry index `start`, clamped to the
    /// list's end. A missing key reads as an empty list.
    fn list_range(
        &self,
        key: &str,
        entry_size: usize,
        start: u64,
        count: u64,
    ) -> Result<Vec<u8>, StoreError>;

    /// Increment and return the named persistent counter. The first call
    /// returns 1; values are strictly increasing for the life of the store.
    fn counter_next(&mut self, name: &str) -> Result<u64, StoreError>;

    /// Apply every mutation in `batch`, atomically: either all of them become
    /// visible or none do.
    fn commit(&mut self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Remove every key and counter, leaving a brand-new store.
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// Key schema shared by the kernel, indexer and query engine.
pub mod keys {
    /// Counter backing the timestamp oracle.
    pub const TIMESTAMP_COUNTER: &str = "ts";

    /// Account record: 128-byte blob.
    pub fn account(id: u128) -> String {
        format!("acc:{id}")
    }

    /// Transfer record: 128-byte blob.
    pub fn transfer(id: u128) -> String {
        format!("tx:{id}")
    }

    /// Per-account transfer index: append-only 24-byte entries.
    pub fn transfer_index(account_id: u128) -> String {
        format!("acc:{account_id}:tx")
    }

    /// Per-account balance history: append-only 64-byte entries.
    pub fn balance_history(account_id: u128) -> String {
        format!("acc:{account_id}:bh")
    }

    /// Resolution marker for a pending transfer: 1 byte.
    pub fn resolved(pending_id: u128) -> String {
        format!("tx:{pending_id}:resolved")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_schema() {
        assert_eq!(keys::account(10), "acc:10");
        assert_eq!(keys::transfer(u128::MAX), format!("tx:{}", u128::MAX));
        assert_eq!(keys::transfer_index(10), "acc:10:tx");
        assert_eq!(keys::balance_history(10), "acc:10:bh");
        assert_eq!(keys::resolved(7), "tx:7:resolved");
    }

    #[test]
    fn test_write_batch_order() {
        let mut batch = WriteBatch::new();
        assert!(batch.is_empty());
        batch.put("a".into(), vec![1]);
        batch.append("b".into(), vec![2]);
        batch.put("a".into(), vec![3]);
        let ops = batch.into_ops();
        assert_eq!(ops.len(), 3);
        assert_eq!(
            ops[2],
            WriteOp::Put {
                key: "a".into(),
                value: vec![3]
            }
        );
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Backend("disk full".into());
        assert_eq!(format!("{}", err), "backend error: disk full");
    }
}
