//! [`WalEntry`] and [`OpCode`] — the WAL record shape (spec §4.4.1).

use serde::{Deserialize, Serialize};

/// The operation a WAL entry records. A closed sum type (spec §9) rather
/// than string dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpCode {
    /// `register_type`
    RegisterType,
    /// `insert`
    Insert,
    /// `update`
    Update,
    /// `delete`
    Delete,
    /// `update_type`
    UpdateType,
    /// `truncate_type`
    TruncateType,
    /// `truncate_all`
    TruncateAll,
}

/// One record in the write-ahead log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalEntry {
    /// Wall-clock time the entry was appended, milliseconds since epoch.
    pub timestamp: i64,
    /// Monotonic, globally unique sequence number.
    pub sequence_num: u64,
    /// Grouping id for entries committed as one transaction (spec §4.4.2).
    pub transaction_id: Option<u64>,
    /// The operation this entry records.
    pub op_code: OpCode,
    /// Entity type the operation targets (empty for `truncate_all`).
    pub entity_type: String,
    /// Entity id the operation targets (empty for type-level operations).
    pub id: String,
    /// Codec-encoded operation payload (already compressed if block
    /// compression is enabled).
    pub data: Vec<u8>,
    /// Set on the last entry of a transaction group; recovery treats a
    /// transaction whose entries never set this flag as incomplete and
    /// skips the whole group (spec §4.4.2).
    pub is_last_in_txn: bool,
}

/// The KV store key for a WAL entry: `wal:<20-digit-zero-padded-seq>:<type>:<id>`.
///
/// Zero-padding to 20 digits (enough for any `u64`) makes lexicographic
/// key order equal sequence order, so the KV store's ordered prefix
/// iteration yields entries in a total order (spec §4.4.1).
pub fn wal_key(sequence_num: u64, entity_type: &str, id: &str) -> Vec<u8> {
    format!("wal:{sequence_num:020}:{entity_type}:{id}").into_bytes()
}

/// The fixed key prefix every WAL entry key starts with.
pub const WAL_PREFIX: &[u8] = b"wal:";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wal_keys_sort_in_sequence_order() {
        let a = wal_key(1, "users", "1");
        let b = wal_key(2, "users", "2");
        let c = wal_key(10, "users", "3");
        assert!(a < b);
        assert!(b < c);
    }
}
