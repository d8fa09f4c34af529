//! In-process key-value store speaking a Redis-compatible command subset.
//!
//! This is the store the object layer talks to through `LocalChannel`. It is
//! a single-threaded state machine: the channel's actor feeds it one command
//! at a time, which is what makes every command indivisible.

mod command;
mod data;
mod executor;
mod parser;
mod resp;
#[cfg(test)]
mod tests;

pub use command::Command;
pub use data::{Entry, Keyspace, RedisHash, Value};
pub use executor::CommandExecutor;
pub use resp::{RespParser, RespValue};
