//! Command channel: how the object layer reaches the store.
//!
//! A channel executes one store command and yields its reply, or a transport
//! failure. It gives no ordering guarantee across keys and never retries.
//!
//! - `LocalChannel`: actor-backed channel to an in-process store
//! - `FaultyChannel`: wraps any channel and injects seeded transport faults

mod faulty;
mod local;

pub use faulty::{FaultConfig, FaultStats, FaultyChannel};
pub use local::LocalChannel;

use crate::redis::{Command, RespValue};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Transport-level failure. The command may or may not have reached the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("request was not sent to the store")]
    NotSent,
    #[error("reply was lost after the request was sent")]
    ResponseLost,
    #[error("channel is closed")]
    Closed,
    #[error("command timed out after {0:?}")]
    Timeout(Duration),
    #[error("wire codec error: {0}")]
    Codec(String),
}

impl ChannelError {
    /// True if the store may have applied the command before the failure.
    pub fn may_have_applied(&self) -> bool {
        match self {
            ChannelError::NotSent | ChannelError::Closed => false,
            ChannelError::ResponseLost | ChannelError::Timeout(_) | ChannelError::Codec(_) => true,
        }
    }
}

/// Executes a single store command.
///
/// Implementations must be usable from many tasks at once.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    async fn execute(&self, command: Command) -> Result<RespValue, ChannelError>;
}

#[async_trait]
impl<C: CommandChannel + ?Sized> CommandChannel for Arc<C> {
    async fn execute(&self, command: Command) -> Result<RespValue, ChannelError> {
        (**self).execute(command).await
    }
}
