//! Lazy, cursor-driven key enumeration.
//!
//! `KeyStream` issues `SCAN cursor MATCH pattern COUNT n` on demand, holding at
//! most one batch of keys at a time. The first round trip happens on the
//! first poll, and the stream ends once the store hands back cursor 0.
//!
//! Ordering and consistency come from the store: keys arrive in creation
//! order, a key that exists for the whole scan is yielded exactly once, and
//! keys created or deleted mid-scan may or may not show up.

use super::key_ops::KeyOps;
use super::pattern::GlobPattern;
use super::{Error, Result};
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::trace;

#[derive(Debug, Clone, Copy)]
enum Cursor {
    Next(u64),
    Done,
}

/// Stream of keys matching a glob pattern.
pub struct KeyStream {
    inner: BoxStream<'static, Result<String>>,
}

impl KeyStream {
    pub(crate) fn new(ops: KeyOps, pattern: GlobPattern, count: usize) -> Self {
        let count = count.max(1);
        let batches = stream::try_unfold(Cursor::Next(0), move |cursor| {
            scan_step(ops.clone(), pattern.clone(), cursor, count)
        });

        let inner = batches
            .map_ok(|keys| stream::iter(keys.into_iter().map(Ok::<String, Error>)))
            .try_flatten()
            .boxed();
        KeyStream { inner }
    }

    /// Drain the stream into a vector, stopping at the first error.
    pub async fn collect_all(self) -> Result<Vec<String>> {
        self.try_collect().await
    }
}

async fn scan_step(
    ops: KeyOps,
    pattern: GlobPattern,
    cursor: Cursor,
    count: usize,
) -> Result<Option<(Vec<String>, Cursor)>> {
    let cursor = match cursor {
        Cursor::Next(c) => c,
        Cursor::Done => return Ok(None),
    };
    let (next, keys) = ops.scan(cursor, pattern.native(), count).await?;
    trace!(
        pattern = pattern.as_str(),
        cursor,
        next,
        batch = keys.len(),
        "scan batch"
    );
    debug_assert!(
        keys.iter().all(|k| pattern.matches(k)),
        "store returned a key outside the pattern"
    );
    let state = if next == 0 { Cursor::Done } else { Cursor::Next(next) };
    Ok(Some((keys, state)))
}

impl Stream for KeyStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{CommandChannel, LocalChannel};
    use crate::redis::{Command, RespValue};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Counts SCAN round trips before forwarding.
    struct CountingChannel {
        inner: LocalChannel,
        scans: AtomicUsize,
    }

    #[async_trait]
    impl CommandChannel for CountingChannel {
        async fn execute(
            &self,
            command: Command,
        ) -> std::result::Result<RespValue, crate::channel::ChannelError> {
            if matches!(command, Command::Scan { .. }) {
                self.scans.fetch_add(1, Ordering::SeqCst);
            }
            self.inner.execute(command).await
        }
    }

    async fn setup(keys: &[&str]) -> (Arc<CountingChannel>, KeyOps) {
        let channel = Arc::new(CountingChannel {
            inner: LocalChannel::spawn(Duration::from_secs(1)),
            scans: AtomicUsize::new(0),
        });
        for key in keys {
            channel
                .execute(Command::set(*key, b"v".to_vec()))
                .await
                .unwrap();
        }
        let ops = KeyOps::new(channel.clone());
        (channel, ops)
    }

    fn glob(p: &str) -> GlobPattern {
        GlobPattern::parse(p).unwrap()
    }

    #[tokio::test]
    async fn test_lazy_first_round_trip() {
        let (channel, ops) = setup(&["test1", "test2"]).await;
        let mut stream = KeyStream::new(ops, glob("test?"), 10);
        assert_eq!(channel.scans.load(Ordering::SeqCst), 0);

        assert_eq!(stream.next().await.unwrap().unwrap(), "test1");
        assert_eq!(channel.scans.load(Ordering::SeqCst), 1);
        assert_eq!(stream.next().await.unwrap().unwrap(), "test2");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_small_batches_cover_everything() {
        let names: Vec<String> = (0..23).map(|i| format!("k:{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let (channel, ops) = setup(&refs).await;

        let keys = KeyStream::new(ops, glob("k:*"), 5).collect_all().await.unwrap();
        assert_eq!(keys, names);
        assert!(channel.scans.load(Ordering::SeqCst) >= 5);
    }

    #[tokio::test]
    async fn test_empty_batches_do_not_end_the_stream() {
        let mut names: Vec<String> = (0..12).map(|i| format!("noise:{}", i)).collect();
        names.push("needle".to_string());
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let (_, ops) = setup(&refs).await;

        let keys = KeyStream::new(ops, glob("needle"), 4).collect_all().await.unwrap();
        assert_eq!(keys, vec!["needle"]);
    }

    #[tokio::test]
    async fn test_no_matches() {
        let (_, ops) = setup(&["test", "test12"]).await;
        let keys = KeyStream::new(ops, glob("test?"), 10).collect_all().await.unwrap();
        assert!(keys.is_empty());
    }
}
