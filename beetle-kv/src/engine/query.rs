//! Filter evaluation over the per-account logs.

use crate::error::EngineError;
use crate::index::{IndexEntry, Side, INDEX_ENTRY_SIZE};
use crate::store::{keys, Store};
use crate::wire::codec;
use crate::wire::codec::BALANCE_SNAPSHOT_SIZE;
use crate::wire::types::{
    AccountFilter, AccountFilterFlags, AccountFlags, BalanceSnapshot, Transfer,
};

/// Result cap applied when a filter's `limit` is zero: the compatible wire
/// protocol's 1 MiB body divided by the 128-byte record.
pub const DEFAULT_LIMIT: u32 = 8190;

struct Window {
    timestamp_min: u64,
    timestamp_max: u64,
    limit: usize,
    reversed: bool,
}

impl Window {
    fn from_filter(filter: &AccountFilter) -> Window {
        Window {
            timestamp_min: filter.timestamp_min,
            timestamp_max: if filter.timestamp_max == 0 {
                u64::MAX
            } else {
                filter.timestamp_max
            },
            limit: if filter.limit == 0 {
                DEFAULT_LIMIT as usize
            } else {
                filter.limit as usize
            },
            reversed: filter.flags.contains(AccountFilterFlags::REVERSED),
        }
    }
}

/// Evaluate an [`AccountFilter`] against the account's transfer index.
///
/// Entries are appended in timestamp order, so a forward scan yields
/// ascending results and a backward scan descending ones; no sort is needed.
pub(crate) fn account_transfers<S: Store>(
    store: &S,
    filter: &AccountFilter,
) -> Result<Vec<Transfer>, EngineError> {
    let window = Window::from_filter(filter);
    let side_flags = filter.flags & (AccountFilterFlags::DEBITS | AccountFilterFlags::CREDITS);
    // Neither side selected means both.
    let want_debits = side_flags.contains(AccountFilterFlags::DEBITS) || side_flags.is_empty();
    let want_credits = side_flags.contains(AccountFilterFlags::CREDITS) || side_flags.is_empty();

    let key = keys::transfer_index(filter.account_id);
    let count = store.list_len(&key, INDEX_ENTRY_SIZE)?;
    if count == 0 {
        return Ok(Vec::new());
    }
    let raw = store.list_range(&key, INDEX_ENTRY_SIZE, 0, count)?;

    let mut out = Vec::new();
    let chunks = raw.chunks_exact(INDEX_ENTRY_SIZE);
    let entries: Box<dyn Iterator<Item = &[u8]> + '_> = if window.reversed {
        Box::new(chunks.rev())
    } else {
        Box::new(chunks)
    };

    for chunk in entries {
        if out.len() == window.limit {
            break;
        }
        let entry = IndexEntry::decode(chunk)?;
        if entry.timestamp > window.timestamp_max {
            if window.reversed {
                continue;
            }
            break;
        }
        if entry.timestamp < window.timestamp_min {
            if window.reversed {
                break;
            }
            continue;
        }
        let wanted = match entry.side {
            Side::Debit => want_debits,
            Side::Credit => want_credits,
        };
        if !wanted {
            continue;
        }
        let Some(blob) = store.get(&keys::transfer(entry.transfer_id))? else {
            return Err(EngineError::Corrupt(format!(
                "index of account {} names missing transfer {}",
                filter.account_id, entry.transfer_id
            )));
        };
        out.push(codec::decode_transfer(&blob)?);
    }
    Ok(out)
}

/// Evaluate an [`AccountFilter`] against the account's balance history.
///
/// Empty for unknown accounts and for accounts without the `HISTORY` flag.
/// The debit/credit side flags do not apply to snapshots and are ignored.
pub(crate) fn account_balances<S: Store>(
    store: &S,
    filter: &AccountFilter,
) -> Result<Vec<BalanceSnapshot>, EngineError> {
    let Some(blob) = store.get(&keys::account(filter.account_id))? else {
        return Ok(Vec::new());
    };
    let account = codec::decode_account(&blob)?;
    if !account.flags.contains(AccountFlags::HISTORY) {
        return Ok(Vec::new());
    }

    let window = Window::from_filter(filter);
    let key = keys::balance_history(filter.account_id);
    let count = store.list_len(&key, BALANCE_SNAPSHOT_SIZE)?;
    if count == 0 {
        return Ok(Vec::new());
    }
    let raw = store.list_range(&key, BALANCE_SNAPSHOT_SIZE, 0, count)?;

    let mut out = Vec::new();
    let chunks = raw.chunks_exact(BALANCE_SNAPSHOT_SIZE);
    let snapshots: Box<dyn Iterator<Item = &[u8]> + '_> = if window.reversed {
        Box::new(chunks.rev())
    } else {
        Box::new(chunks)
    };

    for chunk in snapshots {
        if out.len() == window.limit {
            break;
        }
        let snapshot = codec::decode_balance_snapshot(chunk)?;
        if snapshot.timestamp > window.timestamp_max {
            if window.reversed {
                continue;
            }
            break;
        }
        if snapshot.timestamp < window.timestamp_min {
            if window.reversed {
                break;
            }
            continue;
        }
        out.push(snapshot);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_defaults() {
        let window = Window::from_filter(&AccountFilter::default());
        assert_eq!(window.timestamp_min, 0);
        assert_eq!(window.timestamp_max, u64::MAX);
        assert_eq!(window.limit, DEFAULT_LIMIT as usize);
        assert!(!window.reversed);
    }

    #[test]
    fn test_window_explicit_bounds() {
        let filter = AccountFilter {
            timestamp_min: 10,
            timestamp_max: 20,
            limit: 2,
            flags: AccountFilterFlags::REVERSED,
            ..Default::default()
        };
        let window = Window::from_filter(&filter);
        assert_eq!(window.timestamp_min, 10);
        assert_eq!(window.timestamp_max, 20);
        assert_eq!(window.limit, 2);
        assert!(window.reversed);
    }
}
