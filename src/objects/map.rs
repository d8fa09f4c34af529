//! Associative object handle backed by a store hash.
//!
//! Fields and values both go through the codec, so any serde type can be a
//! key. The `fast_*` operations never fetch previous values.

use super::codec;
use super::key_ops::{expect_bulk, expect_count, expect_integer, unexpected, KeyOps};
use super::{DistributedObject, ObjectKind, Result};
use crate::redis::{Command, RespValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;

pub struct Map<K, V> {
    name: String,
    ops: KeyOps,
    _entry: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Map<K, V> {
    pub(crate) fn new(name: String, ops: KeyOps) -> Self {
        Map {
            name,
            ops,
            _entry: PhantomData,
        }
    }

    /// Number of fields; 0 if the map does not exist.
    pub async fn size(&self) -> Result<u64> {
        let reply = self.ops.call(Command::HLen(self.name.clone())).await?;
        expect_count("HLEN", reply)
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

impl<K, V> Map<K, V>
where
    K: Serialize + DeserializeOwned + Eq + Hash,
    V: Serialize + DeserializeOwned,
{
    /// Write a field without reading the old value. True if the field is new.
    pub async fn fast_put(&self, field: &K, value: &V) -> Result<bool> {
        let pair = (codec::encode(field)?, codec::encode(value)?);
        let reply = self
            .ops
            .call(Command::HSet(self.name.clone(), vec![pair]))
            .await?;
        Ok(expect_integer("HSET", reply)? == 1)
    }

    pub async fn get(&self, field: &K) -> Result<Option<V>> {
        let field = codec::encode(field)?;
        let reply = self.ops.call(Command::HGet(self.name.clone(), field)).await?;
        expect_bulk("HGET", reply)?
            .map(|bytes| codec::decode(&bytes))
            .transpose()
    }

    pub async fn contains_key(&self, field: &K) -> Result<bool> {
        let field = codec::encode(field)?;
        let reply = self
            .ops
            .call(Command::HExists(self.name.clone(), field))
            .await?;
        Ok(expect_integer("HEXISTS", reply)? == 1)
    }

    /// Remove fields without reading them, returning how many existed.
    pub async fn fast_remove(&self, fields: &[K]) -> Result<u64> {
        if fields.is_empty() {
            return Ok(0);
        }
        let fields = fields
            .iter()
            .map(|f| codec::encode(f))
            .collect::<Result<Vec<_>>>()?;
        let reply = self.ops.call(Command::HDel(self.name.clone(), fields)).await?;
        expect_count("HDEL", reply)
    }

    pub async fn read_all_map(&self) -> Result<HashMap<K, V>> {
        let reply = self.ops.call(Command::HGetAll(self.name.clone())).await?;
        let items = match reply {
            RespValue::Array(Some(items)) if items.len() % 2 == 0 => items,
            reply => return Err(unexpected("HGETALL", reply)),
        };

        let mut map = HashMap::with_capacity(items.len() / 2);
        let mut items = items.into_iter();
        while let (Some(field), Some(value)) = (items.next(), items.next()) {
            match (field, value) {
                (RespValue::BulkString(Some(f)), RespValue::BulkString(Some(v))) => {
                    map.insert(codec::decode(&f)?, codec::decode(&v)?);
                }
                (field, _) => return Err(unexpected("HGETALL", field)),
            }
        }
        Ok(map)
    }
}

impl<K, V> DistributedObject for Map<K, V> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Map
    }
}

impl<K, V> Clone for Map<K, V> {
    fn clone(&self) -> Self {
        Map::new(self.name.clone(), self.ops.clone())
    }
}

impl<K, V> PartialEq for Map<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<K, V> Eq for Map<K, V> {}

impl<K, V> std::fmt::Debug for Map<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Map").field("name", &self.name).finish()
    }
}
