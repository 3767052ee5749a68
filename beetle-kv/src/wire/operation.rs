//! The atomic operation surface.

/// Operations exposed by the engine.
///
/// Each operation takes one binary argument blob and returns one binary
/// result; an external dispatcher addresses operations either by numeric tag
/// or by name.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Operation {
    /// Create a single account (128-byte argument, 1-byte result).
    CreateAccount = 1,
    /// Create a single transfer (128-byte argument, 1-byte result).
    CreateTransfer = 2,
    /// Create a batch of accounts with linked-chain semantics (N result bytes).
    CreateLinkedAccounts = 3,
    /// Create a batch of transfers with linked-chain semantics (N result bytes).
    CreateLinkedTransfers = 4,
    /// Look up an account by ID (16-byte argument, 128 bytes or empty).
    LookupAccount = 5,
    /// Look up a transfer by ID (16-byte argument, 128 bytes or empty).
    LookupTransfer = 6,
    /// Range-query an account's transfers (128-byte filter argument).
    GetAccountTransfers = 7,
    /// Range-query an account's balance history (128-byte filter argument).
    GetAccountBalances = 8,
}

impl Operation {
    /// The operation's stable name.
    pub const fn name(self) -> &'static str {
        match self {
            Operation::CreateAccount => "create_account",
            Operation::CreateTransfer => "create_transfer",
            Operation::CreateLinkedAccounts => "create_linked_accounts",
            Operation::CreateLinkedTransfers => "create_linked_transfers",
            Operation::LookupAccount => "lookup_account",
            Operation::LookupTransfer => "lookup_transfer",
            Operation::GetAccountTransfers => "get_account_transfers",
            Operation::GetAccountBalances => "get_account_balances",
        }
    }

    /// Resolve an operation from its stable name.
    pub fn from_name(name: &str) -> Option<Operation> {
        match name {
            "create_account" => Some(Operation::CreateAccount),
            "create_transfer" => Some(Operation::CreateTransfer),
            "create_linked_accounts" => Some(Operation::CreateLinkedAccounts),
            "create_linked_transfers" => Some(Operation::CreateLinkedTransfers),
            "lookup_account" => Some(Operation::LookupAccount),
            "lookup_transfer" => Some(Operation::LookupTransfer),
            "get_account_transfers" => Some(Operation::GetAccountTransfers),
            "get_account_balances" => Some(Operation::GetAccountBalances),
            _ => None,
        }
    }

    /// Returns true if this operation takes a batch of records.
    pub const fn is_batched(self) -> bool {
        matches!(
            self,
            Operation::CreateLinkedAccounts | Operation::CreateLinkedTransfers
        )
    }

    /// Returns true if this operation never mutates the store.
    pub const fn is_read_only(self) -> bool {
        matches!(
            self,
            Operation::LookupAccount
                | Operation::LookupTransfer
                | Operation::GetAccountTransfers
                | Operation::GetAccountBalances
        )
    }
}

impl TryFrom<u8> for Operation {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Operation::CreateAccount),
            2 => Ok(Operation::CreateTransfer),
            3 => Ok(Operation::CreateLinkedAccounts),
            4 => Ok(Operation::CreateLinkedTransfers),
            5 => Ok(Operation::LookupAccount),
            6 => Ok(Operation::LookupTransfer),
            7 => Ok(Operation::GetAccountTransfers),
            8 => Ok(Operation::GetAccountBalances),
            _ => Err(value),
        }
    }
}
