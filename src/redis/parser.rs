//! RESP protocol parser for store commands.
//!
//! This module implements the `from_resp` method on `Command` which parses
//! `RespValue` into typed `Command` instances. It is the inverse of
//! `Command::to_resp` for every supported command.

use super::command::Command;
use super::resp::RespValue;

impl Command {
    /// Parse a RESP protocol value into a Command.
    ///
    /// # Errors
    ///
    /// Returns an error string if:
    /// - The input is not an array
    /// - The command name is not a bulk string
    /// - Required arguments are missing
    /// - Argument types don't match expected types
    pub fn from_resp(value: &RespValue) -> Result<Command, String> {
        match value {
            RespValue::Array(Some(elements)) if !elements.is_empty() => {
                let cmd_name = match &elements[0] {
                    RespValue::BulkString(Some(data)) => {
                        String::from_utf8_lossy(data).to_uppercase()
                    }
                    _ => return Err("Invalid command format".to_string()),
                };

                match cmd_name.as_str() {
                    "PING" => {
                        let msg = if elements.len() > 1 {
                            Some(Self::extract_bytes(&elements[1])?)
                        } else {
                            None
                        };
                        Ok(Command::Ping(msg))
                    }
                    "DBSIZE" => Ok(Command::DbSize),
                    "FLUSHDB" => Ok(Command::FlushDb),
                    "FLUSHALL" => Ok(Command::FlushAll),
                    "GET" => {
                        if elements.len() != 2 {
                            return Err("ERR wrong number of arguments for 'get' command".to_string());
                        }
                        let key = Self::extract_string(&elements[1])?;
                        Ok(Command::Get(key))
                    }
                    "SET" => {
                        if elements.len() < 3 {
                            return Err("ERR wrong number of arguments for 'set' command".to_string());
                        }
                        let key = Self::extract_string(&elements[1])?;
                        let value = Self::extract_bytes(&elements[2])?;

                        let mut nx = false;
                        let mut xx = false;
                        let mut get = false;
                        for element in &elements[3..] {
                            let opt = Self::extract_string(element)?.to_uppercase();
                            match opt.as_str() {
                                "NX" => nx = true,
                                "XX" => xx = true,
                                "GET" => get = true,
                                _ => return Err("ERR syntax error".to_string()),
                            }
                        }

                        // NX and XX are mutually exclusive
                        if nx && xx {
                            return Err(
                                "ERR XX and NX options at the same time are not compatible"
                                    .to_string(),
                            );
                        }

                        Ok(Command::Set {
                            key,
                            value,
                            nx,
                            xx,
                            get,
                        })
                    }
                    "DEL" => {
                        if elements.len() < 2 {
                            return Err("ERR wrong number of arguments for 'del' command".to_string());
                        }
                        let keys = elements[1..]
                            .iter()
                            .map(Self::extract_string)
                            .collect::<Result<Vec<_>, _>>()?;
                        Ok(Command::Del(keys))
                    }
                    "EXISTS" => {
                        if elements.len() < 2 {
                            return Err("ERR wrong number of arguments for 'exists' command".to_string());
                        }
                        let keys = elements[1..]
                            .iter()
                            .map(Self::extract_string)
                            .collect::<Result<Vec<_>, _>>()?;
                        Ok(Command::Exists(keys))
                    }
                    "TYPE" => {
                        if elements.len() != 2 {
                            return Err("ERR wrong number of arguments for 'type' command".to_string());
                        }
                        Ok(Command::TypeOf(Self::extract_string(&elements[1])?))
                    }
                    "RENAME" => {
                        if elements.len() != 3 {
                            return Err("ERR wrong number of arguments for 'rename' command".to_string());
                        }
                        let src = Self::extract_string(&elements[1])?;
                        let dst = Self::extract_string(&elements[2])?;
                        Ok(Command::Rename(src, dst))
                    }
                    "RENAMENX" => {
                        if elements.len() != 3 {
                            return Err("ERR wrong number of arguments for 'renamenx' command".to_string());
                        }
                        let src = Self::extract_string(&elements[1])?;
                        let dst = Self::extract_string(&elements[2])?;
                        Ok(Command::RenameNx(src, dst))
                    }
                    "HSET" => {
                        if elements.len() < 4 || (elements.len() - 2) % 2 != 0 {
                            return Err("ERR wrong number of arguments for 'hset' command".to_string());
                        }
                        let key = Self::extract_string(&elements[1])?;
                        let pairs = elements[2..]
                            .chunks(2)
                            .map(|pair| {
                                Ok((Self::extract_bytes(&pair[0])?, Self::extract_bytes(&pair[1])?))
                            })
                            .collect::<Result<Vec<_>, String>>()?;
                        Ok(Command::HSet(key, pairs))
                    }
                    "HGET" => {
                        if elements.len() != 3 {
                            return Err("ERR wrong number of arguments for 'hget' command".to_string());
                        }
                        let key = Self::extract_string(&elements[1])?;
                        let field = Self::extract_bytes(&elements[2])?;
                        Ok(Command::HGet(key, field))
                    }
                    "HDEL" => {
                        if elements.len() < 3 {
                            return Err("ERR wrong number of arguments for 'hdel' command".to_string());
                        }
                        let key = Self::extract_string(&elements[1])?;
                        let fields = elements[2..]
                            .iter()
                            .map(Self::extract_bytes)
                            .collect::<Result<Vec<_>, _>>()?;
                        Ok(Command::HDel(key, fields))
                    }
                    "HEXISTS" => {
                        if elements.len() != 3 {
                            return Err("ERR wrong number of arguments for 'hexists' command".to_string());
                        }
                        let key = Self::extract_string(&elements[1])?;
                        let field = Self::extract_bytes(&elements[2])?;
                        Ok(Command::HExists(key, field))
                    }
                    "HLEN" => {
                        if elements.len() != 2 {
                            return Err("ERR wrong number of arguments for 'hlen' command".to_string());
                        }
                        Ok(Command::HLen(Self::extract_string(&elements[1])?))
                    }
                    "HGETALL" => {
                        if elements.len() != 2 {
                            return Err("ERR wrong number of arguments for 'hgetall' command".to_string());
                        }
                        Ok(Command::HGetAll(Self::extract_string(&elements[1])?))
                    }
                    "SCAN" => {
                        if elements.len() < 2 {
                            return Err("ERR wrong number of arguments for 'scan' command".to_string());
                        }
                        let cursor = Self::extract_u64(&elements[1])?;
                        let mut pattern = None;
                        let mut count = None;
                        let mut i = 2;
                        while i < elements.len() {
                            let opt = Self::extract_string(&elements[i])?.to_uppercase();
                            if i + 1 >= elements.len() {
                                return Err("ERR syntax error".to_string());
                            }
                            match opt.as_str() {
                                "MATCH" => {
                                    i += 1;
                                    pattern = Some(Self::extract_string(&elements[i])?);
                                }
                                "COUNT" => {
                                    i += 1;
                                    let n = Self::extract_u64(&elements[i])?;
                                    if n == 0 {
                                        return Err("ERR syntax error".to_string());
                                    }
                                    count = Some(n as usize);
                                }
                                _ => return Err("ERR syntax error".to_string()),
                            }
                            i += 1;
                        }
                        Ok(Command::Scan {
                            cursor,
                            pattern,
                            count,
                        })
                    }
                    _ => Ok(Command::Unknown(cmd_name)),
                }
            }
            _ => Err("Invalid command format".to_string()),
        }
    }

    // =========================================================================
    // Extract helpers for RespValue
    // =========================================================================

    fn extract_string(value: &RespValue) -> Result<String, String> {
        match value {
            RespValue::BulkString(Some(data)) => Ok(String::from_utf8_lossy(data).to_string()),
            _ => Err("Expected bulk string".to_string()),
        }
    }

    fn extract_bytes(value: &RespValue) -> Result<Vec<u8>, String> {
        match value {
            RespValue::BulkString(Some(data)) => Ok(data.clone()),
            _ => Err("Expected bulk string".to_string()),
        }
    }

    fn extract_u64(value: &RespValue) -> Result<u64, String> {
        match value {
            RespValue::BulkString(Some(data)) => {
                let s = String::from_utf8_lossy(data);
                s.parse::<u64>()
                    .map_err(|_| "ERR value is not an integer or out of range".to_string())
            }
            RespValue::Integer(n) if *n >= 0 => Ok(*n as u64),
            _ => Err("ERR value is not an integer or out of range".to_string()),
        }
    }
}
