//! Actor-backed channel to an in-process store.
//!
//! One actor task owns the `CommandExecutor` and drains an unbounded mpsc
//! queue, so commands are applied one at a time. Keys are not sharded across
//! actors: RENAME and RENAMENX touch two keys and must run inside a single
//! executor to stay indivisible.
//!
//! Requests and replies cross the queue as RESP frames, the same bytes a
//! network transport would carry.

use super::{ChannelError, CommandChannel};
use crate::redis::{Command, CommandExecutor, RespParser, RespValue};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, trace};

#[derive(Debug)]
struct StoreRequest {
    frame: Bytes,
    reply_tx: oneshot::Sender<Bytes>,
}

struct StoreActor {
    executor: CommandExecutor,
    rx: mpsc::UnboundedReceiver<StoreRequest>,
}

impl StoreActor {
    async fn run(mut self) {
        info!("store actor started");
        while let Some(StoreRequest { frame, reply_tx }) = self.rx.recv().await {
            let reply = self.handle_frame(&frame);
            let mut buf = BytesMut::new();
            RespParser::encode_into(&reply, &mut buf);
            // Caller may have timed out and dropped the receiver
            let _ = reply_tx.send(buf.freeze());
        }
        info!(
            commands = self.executor.commands_processed(),
            "store actor stopped"
        );
    }

    fn handle_frame(&mut self, frame: &[u8]) -> RespValue {
        let command = match RespParser::parse_complete(frame).and_then(|v| Command::from_resp(&v)) {
            Ok(command) => command,
            Err(e) => return RespValue::err(format!("ERR Protocol error: {}", e)),
        };
        self.executor.execute(&command)
    }
}

/// Channel to a store running on its own tokio task.
///
/// Cloning is cheap; all clones feed the same store. The store task exits
/// once every clone has been dropped.
#[derive(Clone)]
pub struct LocalChannel {
    tx: mpsc::UnboundedSender<StoreRequest>,
    timeout: Duration,
}

impl LocalChannel {
    /// Spawn an empty store. Must be called inside a tokio runtime.
    pub fn spawn(timeout: Duration) -> Self {
        Self::spawn_with(CommandExecutor::new(), timeout)
    }

    /// Spawn a store that starts from an existing executor.
    pub fn spawn_with(executor: CommandExecutor, timeout: Duration) -> Self {
        debug_assert!(!timeout.is_zero(), "Precondition: timeout must be positive");
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(StoreActor { executor, rx }.run());
        LocalChannel { tx, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl CommandChannel for LocalChannel {
    async fn execute(&self, command: Command) -> Result<RespValue, ChannelError> {
        let mut buf = BytesMut::new();
        RespParser::encode_into(&command.to_resp(), &mut buf);
        trace!(command = command.name(), bytes = buf.len(), "sending to store");

        let (reply_tx, reply_rx) = oneshot::channel();
        let request = StoreRequest {
            frame: buf.freeze(),
            reply_tx,
        };
        self.tx.send(request).map_err(|_| ChannelError::Closed)?;

        let frame = match tokio::time::timeout(self.timeout, reply_rx).await {
            Ok(Ok(frame)) => frame,
            // Actor went away with the request still queued
            Ok(Err(_)) => return Err(ChannelError::Closed),
            Err(_) => return Err(ChannelError::Timeout(self.timeout)),
        };
        RespParser::parse_complete(&frame).map_err(ChannelError::Codec)
    }
}
