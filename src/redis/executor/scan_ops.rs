//! Scan command implementations for CommandExecutor.
//!
//! Handles: SCAN
//!
//! # TigerStyle Invariants
//!
//! - SCAN returns [cursor, keys_array] where cursor is "0" when complete
//! - COUNT bounds the keyspace slots examined, not the keys returned, so a
//!   batch may be empty while the cursor is still non-zero
//! - Keys come back in slot (creation) order; see `Keyspace` for the guarantees

use super::CommandExecutor;
use crate::redis::resp::RespValue;

pub(crate) const DEFAULT_SCAN_COUNT: usize = 10;

impl CommandExecutor {
    pub(super) fn execute_scan(
        &mut self,
        cursor: u64,
        pattern: Option<&str>,
        count: Option<usize>,
    ) -> RespValue {
        let count = count.unwrap_or(DEFAULT_SCAN_COUNT);

        // TigerStyle: Precondition - count must be reasonable
        debug_assert!(count > 0, "Precondition: SCAN count must be positive");

        let (examined, next_cursor) = self.keyspace.scan(cursor, count);
        let examined_len = examined.len();
        let keys: Vec<RespValue> = examined
            .into_iter()
            .filter(|k| pattern.map_or(true, |p| Self::matches_glob_pattern(k, p)))
            .map(|k| RespValue::bulk(k.as_bytes()))
            .collect();

        // TigerStyle: Postconditions
        debug_assert!(
            keys.len() <= examined_len && examined_len <= count,
            "Postcondition violated: SCAN result count must not exceed requested count"
        );

        RespValue::Array(Some(vec![
            RespValue::bulk(next_cursor.to_string().as_bytes()),
            RespValue::Array(Some(keys)),
        ]))
    }
}
