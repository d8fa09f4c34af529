pub mod channel;
pub mod objects;
pub mod redis;

pub use channel::{ChannelError, CommandChannel, FaultConfig, FaultyChannel, LocalChannel};
pub use objects::{
    Bucket, Client, ClientConfig, DistributedObject, Error, GlobPattern, HandleId, KeyStream, Map,
    ObjectKind, Result,
};
pub use redis::{Command, CommandExecutor, RespParser, RespValue};
