//! Little-endian record codec.
//!
//! Converts the fixed-size record blobs to and from the typed records in
//! [`crate::wire::types`]. Every multi-byte integer is little-endian and every
//! field sits at a fixed offset, so the encoders allocate nothing per field.
//! Decoding rejects inputs shorter than the declared record size; trailing
//! reserved bytes are ignored on input (validation of the explicit reserved
//! fields happens in the kernel).

use crate::error::EngineError;
use crate::wire::types::{
    Account, AccountFilter, AccountFilterFlags, AccountFlags, BalanceSnapshot, Transfer,
    TransferFlags,
};

/// Encoded size of an [`Account`].
pub const ACCOUNT_SIZE: usize = 128;
/// Encoded size of a [`Transfer`].
pub const TRANSFER_SIZE: usize = 128;
/// Encoded size of an [`AccountFilter`].
pub const ACCOUNT_FILTER_SIZE: usize = 128;
/// Encoded size of a [`BalanceSnapshot`].
pub const BALANCE_SNAPSHOT_SIZE: usize = 64;
/// Encoded size of a record ID argument.
pub const ID_SIZE: usize = 16;

const _: () = assert!(std::mem::size_of::<Account>() == ACCOUNT_SIZE);
const _: () = assert!(std::mem::size_of::<Transfer>() == TRANSFER_SIZE);
const _: () = assert!(std::mem::size_of::<AccountFilter>() == ACCOUNT_FILTER_SIZE);

// Account field offsets.
const ACC_ID: usize = 0;
const ACC_DEBITS_PENDING: usize = 16;
const ACC_DEBITS_POSTED: usize = 32;
const ACC_CREDITS_PENDING: usize = 48;
const ACC_CREDITS_POSTED: usize = 64;
const ACC_USER_DATA_128: usize = 80;
const ACC_USER_DATA_64: usize = 96;
const ACC_USER_DATA_32: usize = 104;
const ACC_RESERVED: usize = 108;
const ACC_LEDGER: usize = 112;
const ACC_CODE: usize = 116;
const ACC_FLAGS: usize = 118;
const ACC_TIMESTAMP: usize = 120;

// Transfer field offsets.
const TX_ID: usize = 0;
const TX_DEBIT_ACCOUNT_ID: usize = 16;
const TX_CREDIT_ACCOUNT_ID: usize = 32;
const TX_AMOUNT: usize = 48;
const TX_PENDING_ID: usize = 64;
const TX_USER_DATA_128: usize = 80;
const TX_USER_DATA_64: usize = 96;
const TX_USER_DATA_32: usize = 104;
const TX_TIMEOUT: usize = 108;
const TX_LEDGER: usize = 112;
const TX_CODE: usize = 116;
const TX_FLAGS: usize = 118;
const TX_TIMESTAMP: usize = 120;

// AccountFilter field offsets.
const FLT_ACCOUNT_ID: usize = 0;
const FLT_USER_DATA_128: usize = 16;
const FLT_USER_DATA_64: usize = 32;
const FLT_USER_DATA_32: usize = 40;
const FLT_CODE: usize = 46;
const FLT_TIMESTAMP_MIN: usize = 48;
const FLT_TIMESTAMP_MAX: usize = 56;
const FLT_LIMIT: usize = 64;
const FLT_FLAGS: usize = 68;

// BalanceSnapshot field offsets.
const BAL_TIMESTAMP: usize = 0;
const BAL_DEBITS_PENDING: usize = 8;
const BAL_DEBITS_POSTED: usize = 24;
const BAL_CREDITS_PENDING: usize = 40;
const BAL_CREDITS_POSTED: usize = 56;

fn read_u128(buf: &[u8], offset: usize) -> u128 {
    u128::from_le_bytes(buf[offset..offset + 16].try_into().unwrap())
}

fn read_u64(buf: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(buf[offset..offset + 8].try_into().unwrap())
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
}

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(buf[offset..offset + 2].try_into().unwrap())
}

fn write_u128(buf: &mut [u8], offset: usize, value: u128) {
    buf[offset..offset + 16].copy_from_slice(&value.to_le_bytes());
}

fn write_u64(buf: &mut [u8], offset: usize, value: u64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn write_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn check_len(buf: &[u8], expected: usize) -> Result<(), EngineError> {
    if buf.len() < expected {
        return Err(EngineError::Malformed {
            expected,
            got: buf.len(),
        });
    }
    Ok(())
}

/// Encode an account into its 128-byte form.
pub fn encode_account(account: &Account) -> [u8; ACCOUNT_SIZE] {
    let mut buf = [0u8; ACCOUNT_SIZE];
    write_u128(&mut buf, ACC_ID, account.id);
    write_u128(&mut buf, ACC_DEBITS_PENDING, account.debits_pending);
    write_u128(&mut buf, ACC_DEBITS_POSTED, account.debits_posted);
    write_u128(&mut buf, ACC_CREDITS_PENDING, account.credits_pending);
    write_u128(&mut buf, ACC_CREDITS_POSTED, account.credits_posted);
    write_u128(&mut buf, ACC_USER_DATA_128, account.user_data_128);
    write_u64(&mut buf, ACC_USER_DATA_64, account.user_data_64);
    write_u32(&mut buf, ACC_USER_DATA_32, account.user_data_32);
    write_u32(&mut buf, ACC_RESERVED, account.reserved);
    write_u32(&mut buf, ACC_LEDGER, account.ledger);
    write_u16(&mut buf, ACC_CODE, account.code);
    write_u16(&mut buf, ACC_FLAGS, account.flags.bits());
    write_u64(&mut buf, ACC_TIMESTAMP, account.timestamp);
    buf
}

/// Decode an account from its 128-byte form.
///
/// Unknown flag bits are preserved so the kernel can reject them.
pub fn decode_account(buf: &[u8]) -> Result<Account, EngineError> {
    check_len(buf, ACCOUNT_SIZE)?;
    Ok(Account {
        id: read_u128(buf, ACC_ID),
        debits_pending: read_u128(buf, ACC_DEBITS_PENDING),
        debits_posted: read_u128(buf, ACC_DEBITS_POSTED),
        credits_pending: read_u128(buf, ACC_CREDITS_PENDING),
        credits_posted: read_u128(buf, ACC_CREDITS_POSTED),
        user_data_128: read_u128(buf, ACC_USER_DATA_128),
        user_data_64: read_u64(buf, ACC_USER_DATA_64),
        user_data_32: read_u32(buf, ACC_USER_DATA_32),
        reserved: read_u32(buf, ACC_RESERVED),
        ledger: read_u32(buf, ACC_LEDGER),
        code: read_u16(buf, ACC_CODE),
        flags: AccountFlags::from_bits_retain(read_u16(buf, ACC_FLAGS)),
        timestamp: read_u64(buf, ACC_TIMESTAMP),
    })
}

/// Encode a transfer into its 128-byte form.
pub fn encode_transfer(transfer: &Transfer) -> [u8; TRANSFER_SIZE] {
    let mut buf = [0u8; TRANSFER_SIZE];
    write_u128(&mut buf, TX_ID, transfer.id);
    write_u128(&mut buf, TX_DEBIT_ACCOUNT_ID, transfer.debit_account_id);
    write_u128(&mut buf, TX_CREDIT_ACCOUNT_ID, transfer.credit_account_id);
    write_u128(&mut buf, TX_AMOUNT, transfer.amount);
    write_u128(&mut buf, TX_PENDING_ID, transfer.pending_id);
    write_u128(&mut buf, TX_USER_DATA_128, transfer.user_data_128);
    write_u64(&mut buf, TX_USER_DATA_64, transfer.user_data_64);
    write_u32(&mut buf, TX_USER_DATA_32, transfer.user_data_32);
    write_u32(&mut buf, TX_TIMEOUT, transfer.timeout);
    write_u32(&mut buf, TX_LEDGER, transfer.ledger);
    write_u16(&mut buf, TX_CODE, transfer.code);
    write_u16(&mut buf, TX_FLAGS, transfer.flags.bits());
    write_u64(&mut buf, TX_TIMESTAMP, transfer.timestamp);
    buf
}

/// Decode a transfer from its 128-byte form.
pub fn decode_transfer(buf: &[u8]) -> Result<Transfer, EngineError> {
    check_len(buf, TRANSFER_SIZE)?;
    Ok(Transfer {
        id: read_u128(buf, TX_ID),
        debit_account_id: read_u128(buf, TX_DEBIT_ACCOUNT_ID),
        credit_account_id: read_u128(buf, TX_CREDIT_ACCOUNT_ID),
        amount: read_u128(buf, TX_AMOUNT),
        pending_id: read_u128(buf, TX_PENDING_ID),
        user_data_128: read_u128(buf, TX_USER_DATA_128),
        user_data_64: read_u64(buf, TX_USER_DATA_64),
        user_data_32: read_u32(buf, TX_USER_DATA_32),
        timeout: read_u32(buf, TX_TIMEOUT),
        ledger: read_u32(buf, TX_LEDGER),
        code: read_u16(buf, TX_CODE),
        flags: TransferFlags::from_bits_retain(read_u16(buf, TX_FLAGS)),
        timestamp: read_u64(buf, TX_TIMESTAMP),
    })
}

/// Encode an account filter into its 128-byte form.
pub fn encode_account_filter(filter: &AccountFilter) -> [u8; ACCOUNT_FILTER_SIZE] {
    let mut buf = [0u8; ACCOUNT_FILTER_SIZE];
    write_u128(&mut buf, FLT_ACCOUNT_ID, filter.account_id);
    write_u128(&mut buf, FLT_USER_DATA_128, filter.user_data_128);
    write_u64(&mut buf, FLT_USER_DATA_64, filter.user_data_64);
    write_u32(&mut buf, FLT_USER_DATA_32, filter.user_data_32);
    write_u16(&mut buf, FLT_CODE, filter.code);
    write_u64(&mut buf, FLT_TIMESTAMP_MIN, filter.timestamp_min);
    write_u64(&mut buf, FLT_TIMESTAMP_MAX, filter.timestamp_max);
    write_u32(&mut buf, FLT_LIMIT, filter.limit);
    write_u32(&mut buf, FLT_FLAGS, filter.flags.bits());
    buf
}

/// Decode an account filter from its 128-byte form.
pub fn decode_account_filter(buf: &[u8]) -> Result<AccountFilter, EngineError> {
    check_len(buf, ACCOUNT_FILTER_SIZE)?;
    Ok(AccountFilter {
        account_id: read_u128(buf, FLT_ACCOUNT_ID),
        user_data_128: read_u128(buf, FLT_USER_DATA_128),
        user_data_64: read_u64(buf, FLT_USER_DATA_64),
        user_data_32: read_u32(buf, FLT_USER_DATA_32),
        reserved: [0; 2],
        code: read_u16(buf, FLT_CODE),
        timestamp_min: read_u64(buf, FLT_TIMESTAMP_MIN),
        timestamp_max: read_u64(buf, FLT_TIMESTAMP_MAX),
        limit: read_u32(buf, FLT_LIMIT),
        flags: AccountFilterFlags::from_bits_retain(read_u32(buf, FLT_FLAGS)),
        reserved_tail: [0; 56],
    })
}

/// Encode a balance snapshot into its 64-byte form.
///
/// `credits_posted` is stored as its low 64 bits; the record has no room for
/// a fourth full-width balance after the timestamp.
pub fn encode_balance_snapshot(snapshot: &BalanceSnapshot) -> [u8; BALANCE_SNAPSHOT_SIZE] {
    let mut buf = [0u8; BALANCE_SNAPSHOT_SIZE];
    write_u64(&mut buf, BAL_TIMESTAMP, snapshot.timestamp);
    write_u128(&mut buf, BAL_DEBITS_PENDING, snapshot.debits_pending);
    write_u128(&mut buf, BAL_DEBITS_POSTED, snapshot.debits_posted);
    write_u128(&mut buf, BAL_CREDITS_PENDING, snapshot.credits_pending);
    write_u64(&mut buf, BAL_CREDITS_POSTED, snapshot.credits_posted as u64);
    buf
}

/// Decode a balance snapshot from its 64-byte form.
pub fn decode_balance_snapshot(buf: &[u8]) -> Result<BalanceSnapshot, EngineError> {
    check_len(buf, BALANCE_SNAPSHOT_SIZE)?;
    Ok(BalanceSnapshot {
        timestamp: read_u64(buf, BAL_TIMESTAMP),
        debits_pending: read_u128(buf, BAL_DEBITS_PENDING),
        debits_posted: read_u128(buf, BAL_DEBITS_POSTED),
        credits_pending: read_u128(buf, BAL_CREDITS_PENDING),
        credits_posted: read_u64(buf, BAL_CREDITS_POSTED) as u128,
    })
}

/// Decode a 16-byte record ID argument.
pub fn decode_id(buf: &[u8]) -> Result<u128, EngineError> {
    if buf.len() != ID_SIZE {
        return Err(EngineError::Malformed {
            expected: ID_SIZE,
            got: buf.len(),
        });
    }
    Ok(read_u128(buf, 0))
}
