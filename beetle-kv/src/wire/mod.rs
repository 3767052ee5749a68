//! Record formats and the operation surface.
//!
//! This module contains the TigerBeetle-compatible record types, the
//! little-endian codec that maps them to their fixed-size blob forms, and the
//! operation tags an external dispatcher uses to address the engine.

pub mod codec;
pub mod operation;
pub mod types;

// Re-export commonly used items
pub use codec::{
    ACCOUNT_FILTER_SIZE, ACCOUNT_SIZE, BALANCE_SNAPSHOT_SIZE, ID_SIZE, TRANSFER_SIZE,
};
pub use operation::Operation;
pub use types::{
    Account, AccountFilter, AccountFilterFlags, AccountFlags, BalanceSnapshot, CreateResult,
    Transfer, TransferFlags,
};
