//! Store Command enum and utility methods.
//!
//! This module defines the `Command` enum representing every store command the
//! object layer issues, along with helper constructors, introspection and the
//! RESP encoding used on the wire.
//!
//! Parsing logic is in `parser.rs`.
//! Execution logic is in the `executor/` module.

use super::resp::RespValue;

/// Represents a store command (command name + arguments).
///
/// # Categories
///
/// - **String commands**: GET, SET [NX|XX] [GET]
/// - **Key commands**: DEL, EXISTS, TYPE, RENAME, RENAMENX
/// - **Hash commands**: HSET, HGET, HDEL, HEXISTS, HLEN, HGETALL
/// - **Scan commands**: SCAN [MATCH pattern] [COUNT n]
/// - **Server commands**: PING, DBSIZE, FLUSHDB, FLUSHALL
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ping(Option<Vec<u8>>),
    // String commands
    Get(String),
    /// SET key value [NX|XX] [GET]
    Set {
        key: String,
        value: Vec<u8>,
        nx: bool,  // Only set if NOT exists
        xx: bool,  // Only set if exists
        get: bool, // Return old value
    },
    // Key commands
    Del(Vec<String>),
    Exists(Vec<String>),
    TypeOf(String),
    Rename(String, String),
    RenameNx(String, String),
    // Hash commands
    HSet(String, Vec<(Vec<u8>, Vec<u8>)>),
    HGet(String, Vec<u8>),
    HDel(String, Vec<Vec<u8>>),
    HExists(String, Vec<u8>),
    HLen(String),
    HGetAll(String),
    // Scan commands
    Scan {
        cursor: u64,
        pattern: Option<String>,
        count: Option<usize>,
    },
    // Server commands
    DbSize,
    FlushDb,
    FlushAll,
    Unknown(String),
}

impl Command {
    // =========================================================================
    // Helper Constructors
    // =========================================================================

    /// Helper constructor for basic SET (no options)
    pub fn set(key: impl Into<String>, value: Vec<u8>) -> Self {
        Command::Set {
            key: key.into(),
            value,
            nx: false,
            xx: false,
            get: false,
        }
    }

    /// SET key value NX
    pub fn set_nx(key: impl Into<String>, value: Vec<u8>) -> Self {
        Command::Set {
            key: key.into(),
            value,
            nx: true,
            xx: false,
            get: false,
        }
    }

    /// SET key value GET
    pub fn set_get(key: impl Into<String>, value: Vec<u8>) -> Self {
        Command::Set {
            key: key.into(),
            value,
            nx: false,
            xx: false,
            get: true,
        }
    }

    pub fn del(key: impl Into<String>) -> Self {
        Command::Del(vec![key.into()])
    }

    pub fn exists(key: impl Into<String>) -> Self {
        Command::Exists(vec![key.into()])
    }

    pub fn scan(cursor: u64, pattern: impl Into<String>, count: usize) -> Self {
        Command::Scan {
            cursor,
            pattern: Some(pattern.into()),
            count: Some(count),
        }
    }

    // =========================================================================
    // Utility Methods
    // =========================================================================

    /// Returns true if this command only reads data (no mutations)
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Command::Ping(_)
                | Command::Get(_)
                | Command::Exists(_)
                | Command::TypeOf(_)
                | Command::HGet(_, _)
                | Command::HExists(_, _)
                | Command::HLen(_)
                | Command::HGetAll(_)
                | Command::Scan { .. }
                | Command::DbSize
        )
    }

    /// Returns the keys this command operates on
    pub fn get_keys(&self) -> Vec<&str> {
        match self {
            Command::Get(k)
            | Command::Set { key: k, .. }
            | Command::TypeOf(k)
            | Command::HSet(k, _)
            | Command::HGet(k, _)
            | Command::HDel(k, _)
            | Command::HExists(k, _)
            | Command::HLen(k)
            | Command::HGetAll(k) => vec![k.as_str()],
            Command::Del(keys) | Command::Exists(keys) => {
                keys.iter().map(String::as_str).collect()
            }
            Command::Rename(src, dst) | Command::RenameNx(src, dst) => {
                vec![src.as_str(), dst.as_str()]
            }
            Command::Ping(_)
            | Command::Scan { .. }
            | Command::DbSize
            | Command::FlushDb
            | Command::FlushAll
            | Command::Unknown(_) => vec![],
        }
    }

    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping(_) => "PING",
            Command::Get(_) => "GET",
            Command::Set { .. } => "SET",
            Command::Del(_) => "DEL",
            Command::Exists(_) => "EXISTS",
            Command::TypeOf(_) => "TYPE",
            Command::Rename(_, _) => "RENAME",
            Command::RenameNx(_, _) => "RENAMENX",
            Command::HSet(_, _) => "HSET",
            Command::HGet(_, _) => "HGET",
            Command::HDel(_, _) => "HDEL",
            Command::HExists(_, _) => "HEXISTS",
            Command::HLen(_) => "HLEN",
            Command::HGetAll(_) => "HGETALL",
            Command::Scan { .. } => "SCAN",
            Command::DbSize => "DBSIZE",
            Command::FlushDb => "FLUSHDB",
            Command::FlushAll => "FLUSHALL",
            Command::Unknown(_) => "UNKNOWN",
        }
    }

    /// Encode as a RESP array of bulk strings: `[name, arg1, arg2, ...]`
    pub fn to_resp(&self) -> RespValue {
        let mut args: Vec<Vec<u8>> = Vec::new();
        match self {
            Command::Unknown(name) => args.push(name.as_bytes().to_vec()),
            _ => args.push(self.name().as_bytes().to_vec()),
        }

        match self {
            Command::Ping(msg) => {
                if let Some(msg) = msg {
                    args.push(msg.clone());
                }
            }
            Command::Get(key)
            | Command::TypeOf(key)
            | Command::HLen(key)
            | Command::HGetAll(key) => args.push(key.as_bytes().to_vec()),
            Command::Set {
                key,
                value,
                nx,
                xx,
                get,
            } => {
                args.push(key.as_bytes().to_vec());
                args.push(value.clone());
                if *nx {
                    args.push(b"NX".to_vec());
                }
                if *xx {
                    args.push(b"XX".to_vec());
                }
                if *get {
                    args.push(b"GET".to_vec());
                }
            }
            Command::Del(keys) | Command::Exists(keys) => {
                args.extend(keys.iter().map(|k| k.as_bytes().to_vec()));
            }
            Command::Rename(src, dst) | Command::RenameNx(src, dst) => {
                args.push(src.as_bytes().to_vec());
                args.push(dst.as_bytes().to_vec());
            }
            Command::HSet(key, pairs) => {
                args.push(key.as_bytes().to_vec());
                for (field, value) in pairs {
                    args.push(field.clone());
                    args.push(value.clone());
                }
            }
            Command::HGet(key, field) | Command::HExists(key, field) => {
                args.push(key.as_bytes().to_vec());
                args.push(field.clone());
            }
            Command::HDel(key, fields) => {
                args.push(key.as_bytes().to_vec());
                args.extend(fields.iter().cloned());
            }
            Command::Scan {
                cursor,
                pattern,
                count,
            } => {
                args.push(cursor.to_string().into_bytes());
                if let Some(pattern) = pattern {
                    args.push(b"MATCH".to_vec());
                    args.push(pattern.as_bytes().to_vec());
                }
                if let Some(count) = count {
                    args.push(b"COUNT".to_vec());
                    args.push(count.to_string().into_bytes());
                }
            }
            Command::DbSize | Command::FlushDb | Command::FlushAll | Command::Unknown(_) => {}
        }

        RespValue::Array(Some(
            args.into_iter()
                .map(|arg| RespValue::BulkString(Some(arg)))
                .collect(),
        ))
    }
}
