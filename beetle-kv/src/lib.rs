//! Embedded double-entry accounting kernel over a key-value store.
//!
//! This crate provides a transactional ledger engine whose records and result
//! codes are wire-compatible with the [TigerBeetle](https://tigerbeetle.com)
//! data model: 128-byte little-endian Account and Transfer records with
//! unsigned 128-bit ids and balances.
//!
//! # Features
//!
//! - **Two-phase transfers**: pending / post-pending / void-pending with
//!   resolution tracking
//! - **Balance constraints**: per-account debits-must-not-exceed-credits and
//!   the symmetric flag, plus balancing transfers that clamp automatically
//! - **Linked chains**: all-or-nothing batches with per-record result codes
//! - **Range queries**: per-account transfer indexes and optional balance
//!   history, filtered by side, timestamp window, direction and limit
//!
//! The engine depends only on the [`store::Store`] trait; anything offering
//! point reads, list appends, a counter and an atomic write batch can back
//! it. [`store::MemStore`] is the bundled in-memory implementation.
//!
//! # Quick Start
//!
//! ```
//! use beetle_kv::{Account, Engine, MemStore, Transfer};
//!
//! let mut engine = Engine::new(MemStore::new());
//!
//! for id in [10, 11] {
//!     let account = Account { id, ledger: 700, code: 10, ..Default::default() };
//!     assert!(engine.create_account(&account).unwrap().is_ok());
//! }
//!
//! let transfer = Transfer {
//!     id: 1,
//!     debit_account_id: 10,
//!     credit_account_id: 11,
//!     amount: 1000,
//!     ledger: 700,
//!     code: 10,
//!     ..Default::default()
//! };
//! assert!(engine.create_transfer(&transfer).unwrap().is_ok());
//!
//! let debit = engine.lookup_account(10).unwrap().unwrap();
//! assert_eq!(debit.debits_posted, 1000);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod engine;
pub mod error;
pub mod index;
pub mod store;
pub mod wire;

// Re-export main types
pub use engine::{Engine, DEFAULT_LIMIT};
pub use error::{EngineError, Result};
pub use store::{MemStore, Store, StoreError, WriteBatch};

// Re-export record types
pub use wire::{
    Account, AccountFilter, AccountFilterFlags, AccountFlags, BalanceSnapshot, CreateResult,
    Operation, Transfer, TransferFlags,
};

/// Mint a time-ordered unique record ID.
///
/// The top 48 bits hold wall-clock milliseconds and the low 80 bits are
/// random, so ids sort roughly by mint time without any coordination and a
/// ledger's account and transfer indexes stay close to insertion order.
/// Engine timestamps come from the store-backed oracle, never from here;
/// this helper only mints ids for new records.
///
/// # Example
///
/// ```
/// let debit_account = beetle_kv::id();
/// let credit_account = beetle_kv::id();
/// assert_ne!(debit_account, credit_account);
/// ```
pub fn id() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64 & 0xFFFF_FFFF_FFFF)
        .unwrap_or(0);

    let entropy = rand::random::<u128>() & ((1u128 << 80) - 1);

    ((millis as u128) << 80) | entropy
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_id_unique_and_nonzero() {
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let id = id();
            assert_ne!(id, 0);
            assert!(seen.insert(id), "duplicate id minted");
        }
    }

    #[test]
    fn test_id_sorts_by_mint_time() {
        let earlier = id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let later = id();

        // The millisecond prefix dominates the comparison, so whole ids
        // order by mint time regardless of the random tail.
        assert!(later > earlier);
    }

    #[test]
    fn test_id_layout() {
        let id = id();
        let millis = id >> 80;
        assert!(millis > 0);
        assert!(millis < 1 << 48);
    }
}
