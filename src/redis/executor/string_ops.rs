//! String command implementations for CommandExecutor.
//!
//! Handles: GET, SET [NX|XX] [GET]

use super::{CommandExecutor, WRONGTYPE};
use crate::redis::data::Value;
use crate::redis::resp::RespValue;

impl CommandExecutor {
    pub(super) fn execute_get(&self, key: &str) -> RespValue {
        match self.keyspace.get(key) {
            Some(Value::String(s)) => RespValue::bulk(s),
            Some(_) => RespValue::err(WRONGTYPE),
            None => RespValue::nil(),
        }
    }

    pub(super) fn execute_set(
        &mut self,
        key: &str,
        value: &[u8],
        nx: bool,
        xx: bool,
        get: bool,
    ) -> RespValue {
        // Get old value if GET option specified
        let old_value = if get {
            match self.keyspace.get(key) {
                Some(Value::String(s)) => Some(s.clone()),
                Some(_) => return RespValue::err(WRONGTYPE),
                None => None,
            }
        } else {
            None
        };

        let key_exists = self.keyspace.contains(key);

        // NX: only set if key doesn't exist
        if nx && key_exists {
            return match old_value {
                Some(v) => RespValue::BulkString(Some(v)),
                None => RespValue::nil(),
            };
        }

        // XX: only set if key exists
        if xx && !key_exists {
            return RespValue::nil();
        }

        self.keyspace.insert(key, Value::String(value.to_vec()));

        debug_assert_eq!(
            self.keyspace.get(key).and_then(Value::as_string),
            Some(value),
            "Postcondition violated: SET must store the value"
        );

        if get {
            match old_value {
                Some(v) => RespValue::BulkString(Some(v)),
                None => RespValue::nil(),
            }
        } else {
            RespValue::ok()
        }
    }
}
