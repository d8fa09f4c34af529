//! Key command implementations for CommandExecutor.
//!
//! Handles: DEL, EXISTS, TYPE, FLUSHDB, FLUSHALL
//!
//! # TigerStyle Invariants
//!
//! - DEL count is the number of keys that existed and were removed
//! - EXISTS count is always in range [0, keys.len()]
//! - FLUSH leaves the keyspace empty

use super::CommandExecutor;
use crate::redis::resp::RespValue;

impl CommandExecutor {
    pub(super) fn execute_del(&mut self, keys: &[String]) -> RespValue {
        #[cfg(debug_assertions)]
        let pre_len = self.keyspace.len();

        let mut count = 0i64;
        for key in keys {
            if self.keyspace.remove(key).is_some() {
                count += 1;
            }
        }

        // TigerStyle: Postconditions
        debug_assert!(
            count >= 0 && count <= keys.len() as i64,
            "Postcondition violated: DEL count must be in [0, keys.len()]"
        );
        #[cfg(debug_assertions)]
        {
            for key in keys {
                debug_assert!(
                    !self.keyspace.contains(key),
                    "Postcondition violated: deleted key must be gone"
                );
            }
            debug_assert_eq!(
                self.keyspace.len(),
                pre_len - count as usize,
                "Postcondition violated: keyspace must shrink by deleted count"
            );
        }

        RespValue::Integer(count)
    }

    pub(super) fn execute_exists(&self, keys: &[String]) -> RespValue {
        // Repeated keys are counted once per occurrence
        let count = keys.iter().filter(|k| self.keyspace.contains(k)).count();

        debug_assert!(
            count <= keys.len(),
            "Postcondition violated: EXISTS count cannot exceed input keys count"
        );

        RespValue::Integer(count as i64)
    }

    pub(super) fn execute_typeof(&self, key: &str) -> RespValue {
        match self.keyspace.get(key) {
            Some(value) => RespValue::simple(value.type_name()),
            None => RespValue::simple("none"),
        }
    }

    pub(super) fn execute_flush(&mut self) -> RespValue {
        self.keyspace.clear();

        debug_assert!(
            self.keyspace.is_empty(),
            "Postcondition violated: keyspace must be empty after FLUSH"
        );

        RespValue::ok()
    }
}
