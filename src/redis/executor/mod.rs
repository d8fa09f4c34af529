//! Store command executor module.
//!
//! This module implements the `CommandExecutor` state machine that executes store commands.
//! The implementation is split across multiple files:
//!
//! - `mod.rs` (this file): Core struct, execute dispatch, RENAME/RENAMENX, glob matching
//! - `string_ops.rs`: String command implementations (GET, SET)
//! - `key_ops.rs`: Key command implementations (DEL, EXISTS, TYPE, FLUSHDB)
//! - `hash_ops.rs`: Hash command implementations (HSET, HGET, HDEL, ...)
//! - `scan_ops.rs`: SCAN
//!
//! Every call to `execute` runs to completion before the next one starts, so each
//! command (including the two-key RENAME and RENAMENX) is indivisible with
//! respect to every other client.

mod hash_ops;
mod key_ops;
mod scan_ops;
mod string_ops;

use super::command::Command;
use super::data::*;
use super::resp::RespValue;

pub(crate) const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";
pub(crate) const NO_SUCH_KEY: &str = "ERR no such key";

/// Store command executor - the state machine that processes commands.
pub struct CommandExecutor {
    pub(crate) keyspace: Keyspace,
    pub(crate) commands_processed: usize,
}

impl CommandExecutor {
    pub fn new() -> Self {
        CommandExecutor {
            keyspace: Keyspace::new(),
            commands_processed: 0,
        }
    }

    /// Get read-only access to the keyspace
    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    pub fn commands_processed(&self) -> usize {
        self.commands_processed
    }

    /// Main command execution entry point
    pub fn execute(&mut self, cmd: &Command) -> RespValue {
        self.commands_processed += 1;

        match cmd {
            // Server commands
            Command::Ping(None) => RespValue::pong(),
            Command::Ping(Some(msg)) => RespValue::bulk(msg),
            Command::DbSize => RespValue::Integer(self.keyspace.len() as i64),
            Command::FlushDb | Command::FlushAll => self.execute_flush(),

            // String commands
            Command::Get(key) => self.execute_get(key),
            Command::Set {
                key,
                value,
                nx,
                xx,
                get,
            } => self.execute_set(key, value, *nx, *xx, *get),

            // Key commands
            Command::Del(keys) => self.execute_del(keys),
            Command::Exists(keys) => self.execute_exists(keys),
            Command::TypeOf(key) => self.execute_typeof(key),

            // RENAME
            Command::Rename(src, dst) => {
                if !self.keyspace.rename(src, dst) {
                    return RespValue::err(NO_SUCH_KEY);
                }
                debug_assert!(self.keyspace.contains(dst), "Postcondition: RENAME dst must exist");
                debug_assert!(
                    src == dst || !self.keyspace.contains(src),
                    "Postcondition: RENAME src must not exist"
                );
                RespValue::ok()
            }
            Command::RenameNx(src, dst) => {
                if !self.keyspace.contains(src) {
                    return RespValue::err(NO_SUCH_KEY);
                }
                if self.keyspace.contains(dst) {
                    return RespValue::Integer(0);
                }
                let moved = self.keyspace.rename(src, dst);
                debug_assert!(moved, "src checked above");
                debug_assert!(
                    !self.keyspace.contains(src),
                    "Postcondition: RENAMENX src must not exist"
                );
                RespValue::Integer(1)
            }

            // Hash commands
            Command::HSet(key, pairs) => self.execute_hset(key, pairs),
            Command::HGet(key, field) => self.execute_hget(key, field),
            Command::HDel(key, fields) => self.execute_hdel(key, fields),
            Command::HExists(key, field) => self.execute_hexists(key, field),
            Command::HLen(key) => self.execute_hlen(key),
            Command::HGetAll(key) => self.execute_hgetall(key),

            // Scan commands
            Command::Scan {
                cursor,
                pattern,
                count,
            } => self.execute_scan(*cursor, pattern.as_deref(), *count),

            // Unknown
            Command::Unknown(cmd) => RespValue::err(format!("ERR unknown command '{}'", cmd)),
        }
    }

    /// Native glob matching used by SCAN MATCH.
    ///
    /// Supports `*`, `?`, `[abc]`, `[^abc]`, `[a-z]` and `\x` (literal x).
    pub fn matches_glob_pattern(key: &str, pattern: &str) -> bool {
        glob_match(key.as_bytes(), pattern.as_bytes())
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterative glob matcher with single-star backtracking (linear in practice,
/// no recursion on `*`).
fn glob_match(key: &[u8], pattern: &[u8]) -> bool {
    let mut k = 0;
    let mut p = 0;
    // (pattern index after '*', key index the star currently absorbs up to)
    let mut star: Option<(usize, usize)> = None;

    while k < key.len() {
        if p < pattern.len() {
            match pattern[p] {
                b'*' => {
                    star = Some((p + 1, k));
                    p += 1;
                    continue;
                }
                b'?' => {
                    k += utf8_width(key[k]);
                    p += 1;
                    continue;
                }
                b'[' => {
                    if let Some((matched, next_p)) = match_class(pattern, p, key[k]) {
                        if matched {
                            k += 1;
                            p = next_p;
                            continue;
                        }
                    } else if key[k] == b'[' {
                        // Unterminated class: treat '[' literally
                        k += 1;
                        p += 1;
                        continue;
                    }
                }
                b'\\' if p + 1 < pattern.len() => {
                    if pattern[p + 1] == key[k] {
                        k += 1;
                        p += 2;
                        continue;
                    }
                }
                c => {
                    if c == key[k] {
                        k += 1;
                        p += 1;
                        continue;
                    }
                }
            }
        }

        // Mismatch: let the last star absorb one more character, or fail
        match star {
            Some((star_p, star_k)) => {
                p = star_p;
                k = star_k + utf8_width(key[star_k]);
                star = Some((star_p, k));
            }
            None => return false,
        }
    }

    // Key consumed: only trailing stars may remain
    pattern[p..].iter().all(|&c| c == b'*')
}

/// Byte length of the UTF-8 sequence starting with `lead`. Keys are `str`, so
/// `?` and star absorption always land on a character boundary.
fn utf8_width(lead: u8) -> usize {
    match lead {
        0xF0..=0xF7 => 4,
        0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 1,
    }
}

/// Match `c` against the character class starting at `pattern[start] == b'['`.
///
/// Returns `(matched, index after ']')`, or `None` if the class is unterminated.
fn match_class(pattern: &[u8], start: usize, c: u8) -> Option<(bool, usize)> {
    let mut i = start + 1;
    let negate = pattern.get(i) == Some(&b'^');
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < pattern.len() && pattern[i] != b']' {
        if pattern[i] == b'\\' && i + 1 < pattern.len() {
            matched |= pattern[i + 1] == c;
            i += 2;
        } else if i + 2 < pattern.len() && pattern[i + 1] == b'-' && pattern[i + 2] != b']' {
            let (lo, hi) = if pattern[i] <= pattern[i + 2] {
                (pattern[i], pattern[i + 2])
            } else {
                (pattern[i + 2], pattern[i])
            };
            matched |= lo <= c && c <= hi;
            i += 3;
        } else {
            matched |= pattern[i] == c;
            i += 1;
        }
    }

    if i >= pattern.len() {
        return None;
    }
    Some((matched != negate, i + 1))
}
