//! Ledger record types.
//!
//! These types match the exact byte layout of the TigerBeetle-compatible
//! record formats. All record types use `#[repr(C)]` to ensure a C-compatible
//! memory layout; the on-disk form is produced by the explicit little-endian
//! codec in [`crate::wire::codec`].

use bitflags::bitflags;

/// Ledger account (128 bytes).
///
/// Accounts are the fundamental unit of accounting. They track debits and
/// credits with pending and posted balances.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Account {
    /// Unique identifier for the account.
    pub id: u128,
    /// Sum of pending debit transfers.
    pub debits_pending: u128,
    /// Sum of posted debit transfers.
    pub debits_posted: u128,
    /// Sum of pending credit transfers.
    pub credits_pending: u128,
    /// Sum of posted credit transfers.
    pub credits_posted: u128,
    /// Opaque user data for external linking (128-bit).
    pub user_data_128: u128,
    /// Opaque user data for external linking (64-bit).
    pub user_data_64: u64,
    /// Opaque user data for external linking (32-bit).
    pub user_data_32: u32,
    /// Reserved; must be zero.
    pub reserved: u32,
    /// The ledger this account belongs to.
    pub ledger: u32,
    /// Chart of accounts code describing the account type.
    pub code: u16,
    /// Account flags.
    pub flags: AccountFlags,
    /// Timestamp when the account was created (assigned by the engine).
    pub timestamp: u64,
}

const _: () = assert!(std::mem::size_of::<Account>() == 128);

bitflags! {
    /// Flags for Account configuration.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
    pub struct AccountFlags: u16 {
        /// Link this account with the next in a chain.
        const LINKED = 1 << 0;
        /// Enforce that debits do not exceed credits.
        const DEBITS_MUST_NOT_EXCEED_CREDITS = 1 << 1;
        /// Enforce that credits do not exceed debits.
        const CREDITS_MUST_NOT_EXCEED_DEBITS = 1 << 2;
        /// Record a balance snapshot for every transfer touching this account.
        const HISTORY = 1 << 3;
    }
}

/// Ledger transfer (128 bytes).
///
/// Transfers move value between two accounts of the same ledger by debiting
/// one and crediting the other. A transfer is immutable once created.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Transfer {
    /// Unique identifier for the transfer.
    pub id: u128,
    /// Account to debit.
    pub debit_account_id: u128,
    /// Account to credit.
    pub credit_account_id: u128,
    /// Amount to transfer.
    pub amount: u128,
    /// ID of the pending transfer to post or void (0 if not applicable).
    pub pending_id: u128,
    /// Opaque user data for external linking (128-bit).
    pub user_data_128: u128,
    /// Opaque user data for external linking (64-bit).
    pub user_data_64: u64,
    /// Opaque user data for external linking (32-bit).
    pub user_data_32: u32,
    /// Timeout in seconds for pending transfers. Recorded, not enforced.
    pub timeout: u32,
    /// The ledger this transfer operates on.
    pub ledger: u32,
    /// Chart of accounts code describing the transfer type.
    pub code: u16,
    /// Transfer flags.
    pub flags: TransferFlags,
    /// Timestamp when the transfer was created (assigned by the engine).
    pub timestamp: u64,
}

const _: () = assert!(std::mem::size_of::<Transfer>() == 128);

bitflags! {
    /// Flags for Transfer configuration.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
    pub struct TransferFlags: u16 {
        /// Link this transfer with the next in a chain.
        const LINKED = 1 << 0;
        /// Create a pending (two-phase) transfer.
        const PENDING = 1 << 1;
        /// Post a pending transfer.
        const POST_PENDING = 1 << 2;
        /// Void a pending transfer.
        const VOID_PENDING = 1 << 3;
        /// Clamp the amount to what the debit account can cover.
        const BALANCING_DEBIT = 1 << 4;
        /// Clamp the amount to what the credit account can cover.
        const BALANCING_CREDIT = 1 << 5;
    }
}

/// Filter for per-account queries (128 bytes).
///
/// Selects a side (debits/credits/both), an inclusive timestamp window, a
/// direction and a result cap. The `user_data_*` and `code` fields are
/// accepted for forward compatibility and currently ignored.
#[repr(C)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AccountFilter {
    /// Account to query.
    pub account_id: u128,
    /// Filter by user_data_128 (0 for no filter).
    pub user_data_128: u128,
    /// Filter by user_data_64 (0 for no filter).
    pub user_data_64: u64,
    /// Filter by user_data_32 (0 for no filter).
    pub user_data_32: u32,
    /// Reserved; ignored.
    pub reserved: [u8; 2],
    /// Filter by code (0 for no filter).
    pub code: u16,
    /// Minimum timestamp (inclusive, 0 for no lower bound).
    pub timestamp_min: u64,
    /// Maximum timestamp (inclusive, 0 for no upper bound).
    pub timestamp_max: u64,
    /// Maximum number of results (0 for the default cap).
    pub limit: u32,
    /// Query flags.
    pub flags: AccountFilterFlags,
    /// Reserved tail; ignored.
    pub reserved_tail: [u8; 56],
}

impl Default for AccountFilter {
    fn default() -> Self {
        Self {
            account_id: 0,
            user_data_128: 0,
            user_data_64: 0,
            user_data_32: 0,
            reserved: [0; 2],
            code: 0,
            timestamp_min: 0,
            timestamp_max: 0,
            limit: 0,
            flags: AccountFilterFlags::empty(),
            reserved_tail: [0; 56],
        }
    }
}

const _: () = assert!(std::mem::size_of::<AccountFilter>() == 128);

bitflags! {
    /// Flags for AccountFilter queries.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
    pub struct AccountFilterFlags: u32 {
        /// Include transfers that debit the account.
        const DEBITS = 1 << 0;
        /// Include transfers that credit the account.
        const CREDITS = 1 << 1;
        /// Return results in descending timestamp order.
        const REVERSED = 1 << 2;
    }
}

/// An account's balances immediately after a committed transfer.
///
/// Encoded as a 64-byte record: the u64 timestamp, then the balances in the
/// order below. `credits_posted` is stored truncated to its low 64 bits; the
/// other three balances keep their full 128-bit width.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BalanceSnapshot {
    /// Timestamp of the transfer that produced this snapshot.
    pub timestamp: u64,
    /// Pending debits at this timestamp.
    pub debits_pending: u128,
    /// Posted debits at this timestamp.
    pub debits_posted: u128,
    /// Pending credits at this timestamp.
    pub credits_pending: u128,
    /// Posted credits at this timestamp.
    pub credits_posted: u128,
}

/// Result codes for account and transfer creation.
///
/// Accounts and transfers share one numbering space; the values are stable
/// and appear verbatim in result blobs.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CreateResult {
    /// Record created successfully.
    Ok = 0,
    /// A linked record in the chain failed, so this record was not applied.
    LinkedEventFailed = 1,
    /// A linked chain was not closed by a record with `LINKED` cleared.
    LinkedEventChainOpen = 2,
    /// The record bytes were shorter than the declared record size.
    Malformed = 3,
    /// A reserved field or flag bit was set to a non-zero value.
    ReservedNonzero = 4,
    /// ID must not be zero.
    IdMustNotBeZero = 5,
    /// Mutually exclusive flags were set together.
    FlagsAreMutuallyExclusive = 6,
    /// Ledger must not be zero.
    LedgerMustNotBeZero = 7,
    /// Code must not be zero.
    CodeMustNotBeZero = 8,
    /// Debit account ID must not be zero.
    DebitAccountIdMustNotBeZero = 9,
    /// Credit account ID must not be zero.
    CreditAccountIdMustNotBeZero = 10,
    /// Amount must not be zero.
    AmountMustNotBeZero = 11,
    /// `pending_id` must be zero unless posting or voiding.
    PendingIdMustBeZero = 12,
    /// `pending_id` must not be zero when posting or voiding.
    PendingIdMustNotBeZero = 13,
    /// `pending_id` must differ from the transfer's own ID.
    PendingIdMustBeDifferent = 14,
    /// Record already exists with identical content (idempotent success).
    Exists = 21,
    /// Transfer exists with a different debit account.
    ExistsWithDifferentDebitAccountId = 22,
    /// Transfer exists with a different credit account.
    ExistsWithDifferentCreditAccountId = 23,
    /// Transfer exists with a different amount.
    ExistsWithDifferentAmount = 24,
    /// Transfer exists with a different `pending_id`.
    ExistsWithDifferentPendingId = 25,
    /// Record exists with different user data.
    ExistsWithDifferentUserData = 26,
    /// Record exists with a different ledger.
    ExistsWithDifferentLedger = 27,
    /// Record exists with a different code.
    ExistsWithDifferentCode = 28,
    /// Record exists with different flags.
    ExistsWithDifferentFlags = 29,
    /// Referenced transfer is not pending.
    PendingTransferNotPending = 30,
    /// Referenced pending transfer has a different debit account.
    PendingTransferHasDifferentDebitAccountId = 31,
    /// Referenced pending transfer has a different credit account.
    PendingTransferHasDifferentCreditAccountId = 32,
    /// Referenced pending transfer has a different ledger.
    PendingTransferHasDifferentLedger = 33,
    /// Referenced pending transfer not found.
    PendingTransferNotFound = 34,
    /// Referenced pending transfer was already posted.
    PendingTransferAlreadyPosted = 35,
    /// Referenced pending transfer was already voided.
    PendingTransferAlreadyVoided = 36,
    /// Post amount exceeds the pending transfer's amount.
    ExceedsPendingTransferAmount = 37,
    /// Debit account not found.
    DebitAccountNotFound = 38,
    /// Credit account not found.
    CreditAccountNotFound = 39,
    /// Debit and credit accounts must be different.
    AccountsMustBeDifferent = 40,
    /// Void amount differs from the pending transfer's amount.
    PendingTransferHasDifferentAmount = 41,
    /// Transfer would push the debit account's debits above its credits.
    ExceedsCredits = 42,
    /// Transfer would push the credit account's credits above its debits.
    ExceedsDebits = 43,
    /// Transfer would overflow the debit account's `debits_pending`.
    OverflowsDebitsPending = 44,
    /// Transfer would overflow the credit account's `credits_pending`.
    OverflowsCreditsPending = 45,
    /// Transfer would overflow the debit account's `debits_posted`.
    OverflowsDebitsPosted = 46,
    /// Transfer would overflow the credit account's `credits_posted`.
    OverflowsCreditsPosted = 47,
    /// Transfer would overflow the debit account's total debits.
    OverflowsDebits = 48,
    /// Transfer would overflow the credit account's total credits.
    OverflowsCredits = 49,
    /// Timeout is only valid for pending transfers.
    TimeoutReservedForPendingTransfer = 50,
    /// Transfer exists with a different timeout.
    ExistsWithDifferentTimeout = 51,
    /// Transfer and account ledgers must all match.
    LedgerMustMatch = 52,
}

impl CreateResult {
    /// The numeric wire value of this result.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Returns true for `Ok`.
    pub const fn is_ok(self) -> bool {
        matches!(self, CreateResult::Ok)
    }
}

impl TryFrom<u8> for CreateResult {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CreateResult::Ok),
            1 => Ok(CreateResult::LinkedEventFailed),
            2 => Ok(CreateResult::LinkedEventChainOpen),
            3 => Ok(CreateResult::Malformed),
            4 => Ok(CreateResult::ReservedNonzero),
            5 => Ok(CreateResult::IdMustNotBeZero),
            6 => Ok(CreateResult::FlagsAreMutuallyExclusive),
            7 => Ok(CreateResult::LedgerMustNotBeZero),
            8 => Ok(CreateResult::CodeMustNotBeZero),
            9 => Ok(CreateResult::DebitAccountIdMustNotBeZero),
            10 => Ok(CreateResult::CreditAccountIdMustNotBeZero),
            11 => Ok(CreateResult::AmountMustNotBeZero),
            12 => Ok(CreateResult::PendingIdMustBeZero),
            13 => Ok(CreateResult::PendingIdMustNotBeZero),
            14 => Ok(CreateResult::PendingIdMustBeDifferent),
            21 => Ok(CreateResult::Exists),
            22 => Ok(CreateResult::ExistsWithDifferentDebitAccountId),
            23 => Ok(CreateResult::ExistsWithDifferentCreditAccountId),
            24 => Ok(CreateResult::ExistsWithDifferentAmount),
            25 => Ok(CreateResult::ExistsWithDifferentPendingId),
            26 => Ok(CreateResult::ExistsWithDifferentUserData),
            27 => Ok(CreateResult::ExistsWithDifferentLedger),
            28 => Ok(CreateResult::ExistsWithDifferentCode),
            29 => Ok(CreateResult::ExistsWithDifferentFlags),
            30 => Ok(CreateResult::PendingTransferNotPending),
            31 => Ok(CreateResult::PendingTransferHasDifferentDebitAccountId),
            32 => Ok(CreateResult::PendingTransferHasDifferentCreditAccountId),
            33 => Ok(CreateResult::PendingTransferHasDifferentLedger),
            34 => Ok(CreateResult::PendingTransferNotFound),
            35 => Ok(CreateResult::PendingTransferAlreadyPosted),
            36 => Ok(CreateResult::PendingTransferAlreadyVoided),
            37 => Ok(CreateResult::ExceedsPendingTransferAmount),
            38 => Ok(CreateResult::DebitAccountNotFound),
            39 => Ok(CreateResult::CreditAccountNotFound),
            40 => Ok(CreateResult::AccountsMustBeDifferent),
            41 => Ok(CreateResult::PendingTransferHasDifferentAmount),
            42 => Ok(CreateResult::ExceedsCredits),
            43 => Ok(CreateResult::ExceedsDebits),
            44 => Ok(CreateResult::OverflowsDebitsPending),
            45 => Ok(CreateResult::OverflowsCreditsPending),
            46 => Ok(CreateResult::OverflowsDebitsPosted),
            47 => Ok(CreateResult::OverflowsCreditsPosted),
            48 => Ok(CreateResult::OverflowsDebits),
            49 => Ok(CreateResult::OverflowsCredits),
            50 => Ok(CreateResult::TimeoutReservedForPendingTransfer),
            51 => Ok(CreateResult::ExistsWithDifferentTimeout),
            52 => Ok(CreateResult::LedgerMustMatch),
            _ => Err(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_size() {
        assert_eq!(std::mem::size_of::<Account>(), 128);
        assert_eq!(std::mem::align_of::<Account>(), 16);
    }

    #[test]
    fn test_transfer_size() {
        assert_eq!(std::mem::size_of::<Transfer>(), 128);
        assert_eq!(std::mem::align_of::<Transfer>(), 16);
    }

    #[test]
    fn test_account_filter_size() {
        assert_eq!(std::mem::size_of::<AccountFilter>(), 128);
    }

    #[test]
    fn test_account_flags() {
        let flags = AccountFlags::LINKED | AccountFlags::HISTORY;
        assert_eq!(flags.bits(), 0b1001);
        assert_eq!(AccountFlags::DEBITS_MUST_NOT_EXCEED_CREDITS.bits(), 0x02);
        assert_eq!(AccountFlags::CREDITS_MUST_NOT_EXCEED_DEBITS.bits(), 0x04);
    }

    #[test]
    fn test_transfer_flags() {
        let flags = TransferFlags::PENDING | TransferFlags::LINKED;
        assert_eq!(flags.bits(), 0b11);
        assert_eq!(TransferFlags::POST_PENDING.bits(), 0x04);
        assert_eq!(TransferFlags::VOID_PENDING.bits(), 0x08);
        assert_eq!(TransferFlags::BALANCING_DEBIT.bits(), 0x10);
        assert_eq!(TransferFlags::BALANCING_CREDIT.bits(), 0x20);
    }

    #[test]
    fn test_filter_flags() {
        assert_eq!(AccountFilterFlags::DEBITS.bits(), 0x01);
        assert_eq!(AccountFilterFlags::CREDITS.bits(), 0x02);
        assert_eq!(AccountFilterFlags::REVERSED.bits(), 0x04);
    }

    #[test]
    fn test_result_code_values() {
        // The pinned subset of the taxonomy.
        assert_eq!(CreateResult::Ok.code(), 0);
        assert_eq!(CreateResult::LinkedEventFailed.code(), 1);
        assert_eq!(CreateResult::LinkedEventChainOpen.code(), 2);
        assert_eq!(CreateResult::Exists.code(), 21);
        assert_eq!(CreateResult::ExistsWithDifferentFlags.code(), 29);
        assert_eq!(CreateResult::PendingTransferNotFound.code(), 34);
        assert_eq!(CreateResult::PendingTransferAlreadyPosted.code(), 35);
        assert_eq!(CreateResult::PendingTransferAlreadyVoided.code(), 36);
        assert_eq!(CreateResult::DebitAccountNotFound.code(), 38);
        assert_eq!(CreateResult::CreditAccountNotFound.code(), 39);
        assert_eq!(CreateResult::AccountsMustBeDifferent.code(), 40);
        assert_eq!(CreateResult::ExceedsCredits.code(), 42);
        assert_eq!(CreateResult::ExceedsDebits.code(), 43);
        assert_eq!(CreateResult::LedgerMustMatch.code(), 52);
    }

    #[test]
    fn test_result_code_try_from() {
        assert_eq!(CreateResult::try_from(0), Ok(CreateResult::Ok));
        assert_eq!(CreateResult::try_from(21), Ok(CreateResult::Exists));
        assert_eq!(CreateResult::try_from(52), Ok(CreateResult::LedgerMustMatch));
        assert_eq!(CreateResult::try_from(15), Err(15)); // unassigned
        assert_eq!(CreateResult::try_from(200), Err(200));
    }
}
