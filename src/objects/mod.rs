//! Typed object handles over the store.
//!
//! `Client` is the entry point. It hands out `Bucket` (single value) and `Map`
//! (hash) handles without touching the store, runs key-level operations, and
//! discovers keys by glob pattern.
//!
//! ```rust,ignore
//! let client = Client::local(ClientConfig::default());
//! let bucket = client.get_bucket::<String>("greeting");
//! bucket.set(&"hello".to_string()).await?;
//! assert!(client.renamenx("greeting", "salutation").await?);
//! ```
//!
//! Handles carry only `(name, kind)`. Every read and write is a round trip,
//! and two handles for the same name see whatever the store holds.

mod bucket;
pub mod codec;
mod config;
pub mod dst;
mod error;
mod key_ops;
mod map;
mod pattern;
mod scanner;

pub use bucket::Bucket;
pub use config::{ClientConfig, ConfigError, SCAN_COUNT_ENV, TIMEOUT_ENV};
pub use error::{Error, Result};
pub use key_ops::KeyOps;
pub use map::Map;
pub use pattern::GlobPattern;
pub use scanner::KeyStream;

use crate::channel::{CommandChannel, LocalChannel};
use futures::TryStreamExt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Bucket,
    Map,
}

impl ObjectKind {
    /// Store type name as reported by TYPE.
    pub fn type_name(self) -> &'static str {
        match self {
            ObjectKind::Bucket => "string",
            ObjectKind::Map => "hash",
        }
    }
}

/// Identity of a handle. Two handles are the same object iff their ids match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandleId {
    pub name: String,
    pub kind: ObjectKind,
}

pub trait DistributedObject {
    fn name(&self) -> &str;

    fn kind(&self) -> ObjectKind;

    fn id(&self) -> HandleId {
        HandleId {
            name: self.name().to_string(),
            kind: self.kind(),
        }
    }
}

#[derive(Clone)]
pub struct Client {
    ops: KeyOps,
    config: Arc<ClientConfig>,
}

impl Client {
    pub fn new<C: CommandChannel + 'static>(channel: C, config: ClientConfig) -> Self {
        Self::with_channel(Arc::new(channel), config)
    }

    pub fn with_channel(channel: Arc<dyn CommandChannel>, config: ClientConfig) -> Self {
        debug_assert!(config.validate().is_ok(), "Precondition: config must be valid");
        Client {
            ops: KeyOps::new(channel),
            config: Arc::new(config),
        }
    }

    /// Client backed by a fresh in-process store. Must run inside a tokio runtime.
    pub fn local(config: ClientConfig) -> Self {
        let channel = LocalChannel::spawn(config.command_timeout());
        Self::new(channel, config)
    }

    /// Same store, different settings.
    pub fn with_config(&self, config: ClientConfig) -> Self {
        debug_assert!(config.validate().is_ok(), "Precondition: config must be valid");
        Client {
            ops: self.ops.clone(),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn key_ops(&self) -> &KeyOps {
        &self.ops
    }

    pub fn get_bucket<V>(&self, name: impl Into<String>) -> Bucket<V> {
        Bucket::new(name.into(), self.ops.clone())
    }

    pub fn get_map<K, V>(&self, name: impl Into<String>) -> Map<K, V> {
        Map::new(name.into(), self.ops.clone())
    }

    /// One bucket per key matching `pattern`, in scan order.
    ///
    /// Keys are not filtered by type, so a returned handle may name a map.
    pub async fn get_buckets<V>(&self, pattern: &str) -> Result<Vec<Bucket<V>>> {
        self.find_keys(pattern)?
            .map_ok(|name| self.get_bucket(name))
            .try_collect()
            .await
    }

    /// Lazily enumerate keys matching `pattern`.
    ///
    /// The pattern is validated up front; no round trip happens until the
    /// stream is first polled.
    pub fn find_keys(&self, pattern: &str) -> Result<KeyStream> {
        let pattern = GlobPattern::parse(pattern)?;
        Ok(KeyStream::new(self.ops.clone(), pattern, self.config.scan_count))
    }

    pub async fn delete<S: AsRef<str>>(&self, names: &[S]) -> Result<u64> {
        self.ops.delete(names).await
    }

    pub async fn exists(&self, name: &str) -> Result<bool> {
        self.ops.exists(name).await
    }

    pub async fn rename(&self, src: &str, dst: &str) -> Result<()> {
        self.ops.rename(src, dst).await
    }

    pub async fn renamenx(&self, src: &str, dst: &str) -> Result<bool> {
        self.ops.renamenx(src, dst).await
    }

    pub async fn key_type(&self, name: &str) -> Result<Option<ObjectKind>> {
        self.ops.key_type(name).await
    }

    pub async fn flushdb(&self) -> Result<()> {
        self.ops.flushdb().await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("config", &self.config).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handles_are_free() {
        let client = Client::local(ClientConfig::default());
        let bucket = client.get_bucket::<String>("never-written");
        let map = client.get_map::<String, String>("never-written");
        assert_eq!(bucket.id().kind, ObjectKind::Bucket);
        assert_eq!(map.id().kind, ObjectKind::Map);
        assert_ne!(bucket.id(), map.id());
        assert!(!client.exists("never-written").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_keys_rejects_bad_pattern_before_round_trip() {
        let client = Client::local(ClientConfig::default());
        assert!(matches!(client.find_keys(""), Err(Error::InvalidPattern { .. })));
        assert!(matches!(
            client.get_buckets::<String>("").await,
            Err(Error::InvalidPattern { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_buckets_reads_values() {
        let client = Client::local(ClientConfig::default());
        client.get_bucket("test:a").set(&1u32).await.unwrap();
        client.get_bucket("test:b").set(&2u32).await.unwrap();
        client.get_bucket("other").set(&3u32).await.unwrap();

        let buckets = client.get_buckets::<u32>("test:*").await.unwrap();
        let names: Vec<&str> = buckets.iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["test:a", "test:b"]);
        assert_eq!(buckets[1].get().await.unwrap(), Some(2));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(ObjectKind::Bucket.type_name(), "string");
        assert_eq!(ObjectKind::Map.type_name(), "hash");
    }
}
