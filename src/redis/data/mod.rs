//! Store data structures
//!
//! - `Value`: union of the value kinds the store holds
//! - `RedisHash`: field-value table backing Map objects
//! - `Keyspace`: key → value table with creation-ordered scan slots

mod hash;
mod keyspace;
mod value;

pub use hash::RedisHash;
pub use keyspace::{Entry, Keyspace};
pub use value::Value;
