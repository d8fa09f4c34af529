//! Single-value object handle.

use super::codec;
use super::key_ops::{expect_bulk, expect_ok, KeyOps};
use super::{DistributedObject, ObjectKind, Result};
use crate::redis::{Command, RespValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// Handle to a single value stored under `name`.
///
/// Holds no value: every call is a round trip. After `rename`/`renamenx` the
/// handle still points at its original name.
pub struct Bucket<V> {
    name: String,
    ops: KeyOps,
    _value: PhantomData<fn() -> V>,
}

impl<V> Bucket<V> {
    pub(crate) fn new(name: String, ops: KeyOps) -> Self {
        Bucket {
            name,
            ops,
            _value: PhantomData,
        }
    }

    pub async fn delete(&self) -> Result<bool> {
        Ok(self.ops.delete(&[self.name.as_str()]).await? == 1)
    }

    pub async fn exists(&self) -> Result<bool> {
        self.ops.exists(&self.name).await
    }

    pub async fn rename(&self, new_name: &str) -> Result<()> {
        self.ops.rename(&self.name, new_name).await
    }

    pub async fn renamenx(&self, new_name: &str) -> Result<bool> {
        self.ops.renamenx(&self.name, new_name).await
    }
}

impl<V: Serialize + DeserializeOwned> Bucket<V> {
    /// Store `value`, replacing any existing one.
    pub async fn set(&self, value: &V) -> Result<()> {
        let bytes = codec::encode(value)?;
        let reply = self.ops.call(Command::set(self.name.as_str(), bytes)).await?;
        expect_ok("SET", reply)
    }

    pub async fn get(&self) -> Result<Option<V>> {
        let reply = self.ops.call(Command::Get(self.name.clone())).await?;
        expect_bulk("GET", reply)?
            .map(|bytes| codec::decode(&bytes))
            .transpose()
    }

    /// Store `value` only if the key does not exist yet.
    pub async fn try_set(&self, value: &V) -> Result<bool> {
        let bytes = codec::encode(value)?;
        match self.ops.call(Command::set_nx(self.name.as_str(), bytes)).await? {
            RespValue::SimpleString(s) if s == "OK" => Ok(true),
            RespValue::BulkString(None) => Ok(false),
            reply => Err(super::key_ops::unexpected("SET", reply)),
        }
    }

    /// Store `value` and return the one it replaced, in a single step.
    pub async fn get_and_set(&self, value: &V) -> Result<Option<V>> {
        let bytes = codec::encode(value)?;
        let reply = self.ops.call(Command::set_get(self.name.as_str(), bytes)).await?;
        expect_bulk("SET", reply)?
            .map(|bytes| codec::decode(&bytes))
            .transpose()
    }
}

impl<V> DistributedObject for Bucket<V> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Bucket
    }
}

impl<V> Clone for Bucket<V> {
    fn clone(&self) -> Self {
        Bucket::new(self.name.clone(), self.ops.clone())
    }
}

impl<V> PartialEq for Bucket<V> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<V> Eq for Bucket<V> {}

impl<V> std::fmt::Debug for Bucket<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket").field("name", &self.name).finish()
    }
}
