//! Error type for the object layer.

use crate::channel::ChannelError;
use crate::redis::RespValue;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rename source does not exist
    #[error("no such key: {0}")]
    NotFound(String),

    /// Transport failure; the command may or may not have been applied
    #[error("transport failure: {0}")]
    Transport(#[from] ChannelError),

    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Key holds a different kind of object than the handle expects
    #[error("{0}")]
    WrongType(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("unexpected reply to {command}: {reply:?}")]
    UnexpectedReply {
        command: &'static str,
        reply: RespValue,
    },

    #[error("value codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_pattern(pattern: &str, reason: impl Into<String>) -> Self {
        Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }

    /// True if the store could not be reached or did not answer.
    ///
    /// This alone does not make a retry safe: a rename whose reply was lost
    /// may already have run. Check `ChannelError::may_have_applied` on the
    /// inner error before resending anything.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}
