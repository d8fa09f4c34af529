//! Hash command implementations for CommandExecutor.
//!
//! Handles: HSET, HGET, HDEL, HEXISTS, HLEN, HGETALL

use super::{CommandExecutor, WRONGTYPE};
use crate::redis::data::{RedisHash, Value};
use crate::redis::resp::RespValue;

impl CommandExecutor {
    pub(super) fn execute_hset(&mut self, key: &str, pairs: &[(Vec<u8>, Vec<u8>)]) -> RespValue {
        debug_assert!(!pairs.is_empty(), "Precondition: HSET needs at least one pair");

        if matches!(self.keyspace.get(key), Some(v) if v.as_hash().is_none()) {
            return RespValue::err(WRONGTYPE);
        }
        let hash = self
            .keyspace
            .get_or_insert_with(key, || Value::Hash(RedisHash::new()));
        match hash {
            Value::Hash(h) => {
                let mut new_fields = 0i64;
                for (field, value) in pairs {
                    if h.set(field, value) {
                        new_fields += 1;
                    }
                }
                RespValue::Integer(new_fields)
            }
            _ => RespValue::err(WRONGTYPE),
        }
    }

    pub(super) fn execute_hget(&self, key: &str, field: &[u8]) -> RespValue {
        match self.keyspace.get(key) {
            Some(Value::Hash(h)) => match h.get(field) {
                Some(v) => RespValue::bulk(v),
                None => RespValue::nil(),
            },
            Some(_) => RespValue::err(WRONGTYPE),
            None => RespValue::nil(),
        }
    }

    pub(super) fn execute_hdel(&mut self, key: &str, fields: &[Vec<u8>]) -> RespValue {
        let (deleted, now_empty) = match self.keyspace.get_mut(key) {
            Some(Value::Hash(h)) => {
                #[cfg(debug_assertions)]
                let pre_len = h.len();

                let mut deleted = 0usize;
                for field in fields {
                    if h.delete(field) {
                        deleted += 1;
                    }
                }

                #[cfg(debug_assertions)]
                debug_assert_eq!(
                    h.len(),
                    pre_len - deleted,
                    "Invariant violated: len must decrease by deleted count"
                );

                (deleted, h.is_empty())
            }
            Some(_) => return RespValue::err(WRONGTYPE),
            None => return RespValue::Integer(0),
        };
        // Empty hashes are removed from the keyspace
        if now_empty {
            self.keyspace.remove(key);
        }
        RespValue::Integer(deleted as i64)
    }

    pub(super) fn execute_hexists(&self, key: &str, field: &[u8]) -> RespValue {
        match self.keyspace.get(key) {
            Some(Value::Hash(h)) => RespValue::Integer(h.exists(field) as i64),
            Some(_) => RespValue::err(WRONGTYPE),
            None => RespValue::Integer(0),
        }
    }

    pub(super) fn execute_hlen(&self, key: &str) -> RespValue {
        match self.keyspace.get(key) {
            Some(Value::Hash(h)) => RespValue::Integer(h.len() as i64),
            Some(_) => RespValue::err(WRONGTYPE),
            None => RespValue::Integer(0),
        }
    }

    pub(super) fn execute_hgetall(&self, key: &str) -> RespValue {
        match self.keyspace.get(key) {
            Some(Value::Hash(h)) => {
                // Pre-allocate capacity: each field has key and value
                let mut elements = Vec::with_capacity(h.len() * 2);
                for (field, value) in h.iter() {
                    elements.push(RespValue::bulk(field));
                    elements.push(RespValue::bulk(value));
                }
                debug_assert_eq!(
                    elements.len(),
                    h.len() * 2,
                    "Postcondition violated: HGETALL must return field-value pairs"
                );
                RespValue::Array(Some(elements))
            }
            Some(_) => RespValue::err(WRONGTYPE),
            None => RespValue::empty_array(),
        }
    }
}
