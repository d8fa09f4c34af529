//! Key-level operations shared by the client and every handle.
//!
//! Each operation is exactly one store command. Nothing here retries: a
//! transport failure surfaces as `Error::Transport` and the caller decides.
//! DEL and EXISTS are safe to repeat; RENAME and RENAMENX are not.

use super::{Error, ObjectKind, Result};
use crate::channel::CommandChannel;
use crate::redis::{Command, RespValue};
use std::sync::Arc;
use tracing::{debug, warn};

const NO_SUCH_KEY: &str = "ERR no such key";
const WRONGTYPE_PREFIX: &str = "WRONGTYPE";

#[derive(Clone)]
pub struct KeyOps {
    channel: Arc<dyn CommandChannel>,
}

impl std::fmt::Debug for KeyOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyOps").finish_non_exhaustive()
    }
}

impl KeyOps {
    pub fn new(channel: Arc<dyn CommandChannel>) -> Self {
        KeyOps { channel }
    }

    /// Send a command and return the raw reply, store errors included.
    pub(crate) async fn call_raw(&self, command: Command) -> Result<RespValue> {
        let name = command.name();
        debug!(command = name, keys = ?command.get_keys(), "issuing command");
        match self.channel.execute(command).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                warn!(
                    command = name,
                    error = %e,
                    may_have_applied = e.may_have_applied(),
                    "transport failure"
                );
                Err(e.into())
            }
        }
    }

    /// Send a command; store error replies become `Err`.
    pub(crate) async fn call(&self, command: Command) -> Result<RespValue> {
        match self.call_raw(command).await? {
            RespValue::Error(msg) => Err(store_error(msg)),
            reply => Ok(reply),
        }
    }

    pub async fn exists(&self, name: &str) -> Result<bool> {
        let reply = self.call(Command::exists(name)).await?;
        Ok(expect_integer("EXISTS", reply)? > 0)
    }

    /// Delete every named key, returning how many existed.
    pub async fn delete<S: AsRef<str>>(&self, names: &[S]) -> Result<u64> {
        if names.is_empty() {
            return Ok(0);
        }
        let names: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
        let reply = self.call(Command::Del(names)).await?;
        expect_count("DEL", reply)
    }

    /// Move `src` to `dst`, replacing whatever `dst` held.
    pub async fn rename(&self, src: &str, dst: &str) -> Result<()> {
        let reply = self
            .call_raw(Command::Rename(src.to_string(), dst.to_string()))
            .await?;
        match reply {
            RespValue::SimpleString(s) if s == "OK" => Ok(()),
            RespValue::Error(msg) if msg == NO_SUCH_KEY => Err(Error::NotFound(src.to_string())),
            RespValue::Error(msg) => Err(store_error(msg)),
            reply => Err(unexpected("RENAME", reply)),
        }
    }

    /// Move `src` to `dst` only if `dst` does not exist.
    ///
    /// Backed by the store's RENAMENX, so the check and the move are one step.
    pub async fn renamenx(&self, src: &str, dst: &str) -> Result<bool> {
        let reply = self
            .call_raw(Command::RenameNx(src.to_string(), dst.to_string()))
            .await?;
        match reply {
            RespValue::Integer(1) => Ok(true),
            RespValue::Integer(0) => Ok(false),
            RespValue::Error(msg) if msg == NO_SUCH_KEY => Err(Error::NotFound(src.to_string())),
            RespValue::Error(msg) => Err(store_error(msg)),
            reply => Err(unexpected("RENAMENX", reply)),
        }
    }

    pub async fn key_type(&self, name: &str) -> Result<Option<ObjectKind>> {
        match self.call(Command::TypeOf(name.to_string())).await? {
            RespValue::SimpleString(t) => match t.as_str() {
                "none" => Ok(None),
                "string" => Ok(Some(ObjectKind::Bucket)),
                "hash" => Ok(Some(ObjectKind::Map)),
                _ => Err(unexpected("TYPE", RespValue::SimpleString(t))),
            },
            reply => Err(unexpected("TYPE", reply)),
        }
    }

    /// Remove every key in the store.
    pub async fn flushdb(&self) -> Result<()> {
        let reply = self.call(Command::FlushDb).await?;
        expect_ok("FLUSHDB", reply)
    }

    /// One SCAN round trip: `(next_cursor, keys)`.
    pub(crate) async fn scan(
        &self,
        cursor: u64,
        native_pattern: &str,
        count: usize,
    ) -> Result<(u64, Vec<String>)> {
        let reply = self
            .call(Command::scan(cursor, native_pattern, count))
            .await?;
        let mut parts = match reply {
            RespValue::Array(Some(parts)) if parts.len() == 2 => parts,
            reply => return Err(unexpected("SCAN", reply)),
        };
        let keys_reply = parts.pop();
        let cursor_reply = parts.pop();

        let next = match cursor_reply {
            Some(RespValue::BulkString(Some(raw))) => std::str::from_utf8(&raw)
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(|| unexpected("SCAN", RespValue::BulkString(Some(raw.clone()))))?,
            Some(other) => return Err(unexpected("SCAN", other)),
            None => return Err(unexpected("SCAN", RespValue::nil())),
        };

        let keys = match keys_reply {
            Some(RespValue::Array(Some(items))) => items
                .into_iter()
                .map(|item| match item {
                    RespValue::BulkString(Some(raw)) => String::from_utf8(raw)
                        .map_err(|e| unexpected("SCAN", RespValue::BulkString(Some(e.into_bytes())))),
                    other => Err(unexpected("SCAN", other)),
                })
                .collect::<Result<Vec<_>>>()?,
            Some(other) => return Err(unexpected("SCAN", other)),
            None => return Err(unexpected("SCAN", RespValue::nil())),
        };
        Ok((next, keys))
    }
}

// =============================================================================
// Reply decoding
// =============================================================================

pub(crate) fn store_error(msg: String) -> Error {
    if msg.starts_with(WRONGTYPE_PREFIX) {
        Error::WrongType(msg)
    } else {
        Error::Store(msg)
    }
}

pub(crate) fn unexpected(command: &'static str, reply: RespValue) -> Error {
    Error::UnexpectedReply { command, reply }
}

pub(crate) fn expect_ok(command: &'static str, reply: RespValue) -> Result<()> {
    match reply {
        RespValue::SimpleString(s) if s == "OK" => Ok(()),
        reply => Err(unexpected(command, reply)),
    }
}

pub(crate) fn expect_integer(command: &'static str, reply: RespValue) -> Result<i64> {
    match reply {
        RespValue::Integer(n) => Ok(n),
        reply => Err(unexpected(command, reply)),
    }
}

pub(crate) fn expect_count(command: &'static str, reply: RespValue) -> Result<u64> {
    match reply {
        RespValue::Integer(n) if n >= 0 => Ok(n as u64),
        reply => Err(unexpected(command, reply)),
    }
}

/// Bulk string or nil.
pub(crate) fn expect_bulk(command: &'static str, reply: RespValue) -> Result<Option<Vec<u8>>> {
    match reply {
        RespValue::BulkString(bytes) => Ok(bytes),
        reply => Err(unexpected(command, reply)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::LocalChannel;
    use std::time::Duration;

    fn ops() -> KeyOps {
        KeyOps::new(Arc::new(LocalChannel::spawn(Duration::from_secs(1))))
    }

    async fn put(ops: &KeyOps, key: &str, value: &str) {
        ops.call(Command::set(key, value.as_bytes().to_vec()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_exists_and_delete() {
        let ops = ops();
        put(&ops, "a", "1").await;
        put(&ops, "b", "2").await;
        assert!(ops.exists("a").await.unwrap());
        assert!(!ops.exists("zzz").await.unwrap());

        assert_eq!(ops.delete(&["a", "b", "zzz"]).await.unwrap(), 2);
        assert_eq!(ops.delete(&["a", "b", "zzz"]).await.unwrap(), 0);
        assert_eq!(ops.delete::<&str>(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rename_missing_source_is_not_found() {
        let ops = ops();
        let err = ops.rename("ghost", "dst").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(ref name) if name == "ghost"));
        let err = ops.renamenx("ghost", "dst").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_renamenx_self() {
        let ops = ops();
        put(&ops, "k", "v").await;
        assert!(!ops.renamenx("k", "k").await.unwrap());
        ops.rename("k", "k").await.unwrap();
        assert!(ops.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_key_type() {
        let ops = ops();
        put(&ops, "s", "v").await;
        ops.call(Command::HSet("h".into(), vec![(b"f".to_vec(), b"v".to_vec())]))
            .await
            .unwrap();
        assert_eq!(ops.key_type("s").await.unwrap(), Some(ObjectKind::Bucket));
        assert_eq!(ops.key_type("h").await.unwrap(), Some(ObjectKind::Map));
        assert_eq!(ops.key_type("none").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_scan_decoding() {
        let ops = ops();
        put(&ops, "x1", "v").await;
        put(&ops, "x2", "v").await;
        let (next, keys) = ops.scan(0, "x*", 100).await.unwrap();
        assert_eq!(next, 0);
        assert_eq!(keys, vec!["x1", "x2"]);
    }

    #[tokio::test]
    async fn test_flushdb() {
        let ops = ops();
        put(&ops, "a", "1").await;
        ops.flushdb().await.unwrap();
        assert!(!ops.exists("a").await.unwrap());
    }

    #[test]
    fn test_store_error_classification() {
        assert!(matches!(
            store_error("WRONGTYPE Operation against a key".into()),
            Error::WrongType(_)
        ));
        assert!(matches!(store_error("ERR syntax error".into()), Error::Store(_)));
    }

    #[test]
    fn test_unexpected_shapes() {
        assert!(matches!(
            expect_count("DEL", RespValue::Integer(-1)),
            Err(Error::UnexpectedReply { command: "DEL", .. })
        ));
        assert!(expect_ok("SET", RespValue::nil()).is_err());
        assert_eq!(expect_bulk("GET", RespValue::nil()).unwrap(), None);
    }
}
