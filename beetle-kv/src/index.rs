//! Per-account transfer index entries.
//!
//! Each account owns an append-only log with one 24-byte entry per transfer
//! that touched it, recording the transfer's timestamp, its full 128-bit id,
//! and which side of the transfer the account was on. Timestamps are monotone
//! by construction, so append order is timestamp order and range queries scan
//! without sorting.

use crate::error::EngineError;

/// Encoded size of an index entry.
pub const INDEX_ENTRY_SIZE: usize = 24;

// The side rides in the top bit of the timestamp word; the oracle never
// produces timestamps that reach it.
const SIDE_BIT: u64 = 1 << 63;

/// Which side of a transfer an account was on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Side {
    /// The account was debited.
    Debit,
    /// The account was credited.
    Credit,
}

/// One entry in an account's transfer index.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IndexEntry {
    /// Timestamp of the transfer.
    pub timestamp: u64,
    /// ID of the transfer record.
    pub transfer_id: u128,
    /// Side of the transfer the indexed account was on.
    pub side: Side,
}

impl IndexEntry {
    /// Encode into the 24-byte entry form.
    pub fn encode(&self) -> [u8; INDEX_ENTRY_SIZE] {
        debug_assert!(self.timestamp & SIDE_BIT == 0);
        let word = match self.side {
            Side::Debit => self.timestamp,
            Side::Credit => self.timestamp | SIDE_BIT,
        };
        let mut buf = [0u8; INDEX_ENTRY_SIZE];
        buf[0..8].copy_from_slice(&word.to_le_bytes());
        buf[8..24].copy_from_slice(&self.transfer_id.to_le_bytes());
        buf
    }

    /// Decode from the 24-byte entry form.
    pub fn decode(buf: &[u8]) -> Result<IndexEntry, EngineError> {
        if buf.len() < INDEX_ENTRY_SIZE {
            return Err(EngineError::Malformed {
                expected: INDEX_ENTRY_SIZE,
                got: buf.len(),
            });
        }
        let word = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        Ok(IndexEntry {
            timestamp: word & !SIDE_BIT,
            transfer_id: u128::from_le_bytes(buf[8..24].try_into().unwrap()),
            side: if word & SIDE_BIT == 0 {
                Side::Debit
            } else {
                Side::Credit
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_both_sides() {
        for side in [Side::Debit, Side::Credit] {
            let entry = IndexEntry {
                timestamp: 123_456_789,
                transfer_id: u128::MAX - 5,
                side,
            };
            let buf = entry.encode();
            assert_eq!(buf.len(), INDEX_ENTRY_SIZE);
            assert_eq!(IndexEntry::decode(&buf).unwrap(), entry);
        }
    }

    #[test]
    fn test_side_does_not_disturb_timestamp() {
        let entry = IndexEntry {
            timestamp: (1 << 63) - 1,
            transfer_id: 1,
            side: Side::Credit,
        };
        let decoded = IndexEntry::decode(&entry.encode()).unwrap();
        assert_eq!(decoded.timestamp, (1 << 63) - 1);
        assert_eq!(decoded.side, Side::Credit);
    }

    #[test]
    fn test_short_entry_rejected() {
        assert!(IndexEntry::decode(&[0u8; 23]).is_err());
    }
}
