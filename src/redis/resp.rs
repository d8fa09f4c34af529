//! RESP2 values and the byte-level codec used between the client channel and the store.

use bytes::{BufMut, BytesMut};

#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Option<Vec<u8>>),
    Array(Option<Vec<RespValue>>),
}

pub struct RespParser;

impl RespParser {
    /// Parse one RESP value from the front of `input`.
    ///
    /// Returns the value and the number of bytes consumed.
    pub fn parse(input: &[u8]) -> Result<(RespValue, usize), String> {
        if input.is_empty() {
            return Err("Empty input".to_string());
        }

        match input[0] {
            b'+' => Self::parse_simple_string(input),
            b'-' => Self::parse_error(input),
            b':' => Self::parse_integer(input),
            b'$' => Self::parse_bulk_string(input),
            b'*' => Self::parse_array(input),
            _ => Err(format!("Unknown RESP type: {}", input[0] as char)),
        }
    }

    /// Parse exactly one value; trailing bytes are a framing error.
    pub fn parse_complete(input: &[u8]) -> Result<RespValue, String> {
        let (value, consumed) = Self::parse(input)?;
        if consumed != input.len() {
            return Err(format!(
                "Trailing bytes after RESP value: {} of {} consumed",
                consumed,
                input.len()
            ));
        }
        Ok(value)
    }

    fn parse_simple_string(input: &[u8]) -> Result<(RespValue, usize), String> {
        if let Some(pos) = Self::find_crlf(input) {
            let s = String::from_utf8_lossy(&input[1..pos]).to_string();
            Ok((RespValue::SimpleString(s), pos + 2))
        } else {
            Err("No CRLF found".to_string())
        }
    }

    fn parse_error(input: &[u8]) -> Result<(RespValue, usize), String> {
        if let Some(pos) = Self::find_crlf(input) {
            let s = String::from_utf8_lossy(&input[1..pos]).to_string();
            Ok((RespValue::Error(s), pos + 2))
        } else {
            Err("No CRLF found".to_string())
        }
    }

    fn parse_integer(input: &[u8]) -> Result<(RespValue, usize), String> {
        if let Some(pos) = Self::find_crlf(input) {
            let s = String::from_utf8_lossy(&input[1..pos]);
            let n = s.parse::<i64>().map_err(|e| e.to_string())?;
            Ok((RespValue::Integer(n), pos + 2))
        } else {
            Err("No CRLF found".to_string())
        }
    }

    fn parse_bulk_string(input: &[u8]) -> Result<(RespValue, usize), String> {
        if let Some(pos) = Self::find_crlf(input) {
            let len_str = String::from_utf8_lossy(&input[1..pos]);
            let len = len_str.parse::<i64>().map_err(|e| e.to_string())?;

            if len == -1 {
                return Ok((RespValue::BulkString(None), pos + 2));
            }
            if len < 0 {
                return Err(format!("Invalid bulk string length: {}", len));
            }

            let len = len as usize;
            let start = pos + 2;
            let end = start + len;

            if end + 2 > input.len() {
                return Err("Incomplete bulk string".to_string());
            }
            if &input[end..end + 2] != b"\r\n" {
                return Err("Bulk string not terminated by CRLF".to_string());
            }

            let data = input[start..end].to_vec();
            Ok((RespValue::BulkString(Some(data)), end + 2))
        } else {
            Err("No CRLF found".to_string())
        }
    }

    fn parse_array(input: &[u8]) -> Result<(RespValue, usize), String> {
        if let Some(pos) = Self::find_crlf(input) {
            let len_str = String::from_utf8_lossy(&input[1..pos]);
            let len = len_str.parse::<i64>().map_err(|e| e.to_string())?;

            if len == -1 {
                return Ok((RespValue::Array(None), pos + 2));
            }
            if len < 0 {
                return Err(format!("Invalid array length: {}", len));
            }

            let mut elements = Vec::with_capacity(len as usize);
            let mut offset = pos + 2;

            for _ in 0..len {
                if offset >= input.len() {
                    return Err("Incomplete array".to_string());
                }
                let (value, consumed) = Self::parse(&input[offset..])?;
                elements.push(value);
                offset += consumed;
            }

            Ok((RespValue::Array(Some(elements)), offset))
        } else {
            Err("No CRLF found".to_string())
        }
    }

    #[inline]
    fn find_crlf(input: &[u8]) -> Option<usize> {
        let mut start = 0;
        while let Some(rel) = memchr::memchr(b'\r', &input[start..]) {
            let pos = start + rel;
            if input.get(pos + 1) == Some(&b'\n') {
                return Some(pos);
            }
            start = pos + 1;
        }
        None
    }

    pub fn encode(value: &RespValue) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(64);
        Self::encode_into(value, &mut buf);
        buf.to_vec()
    }

    pub fn encode_into(value: &RespValue, buf: &mut BytesMut) {
        match value {
            RespValue::SimpleString(s) => {
                buf.put_u8(b'+');
                buf.put_slice(s.as_bytes());
                buf.put_slice(b"\r\n");
            }
            RespValue::Error(s) => {
                buf.put_u8(b'-');
                buf.put_slice(s.as_bytes());
                buf.put_slice(b"\r\n");
            }
            RespValue::Integer(n) => {
                buf.put_slice(format!(":{}\r\n", n).as_bytes());
            }
            RespValue::BulkString(None) => buf.put_slice(b"$-1\r\n"),
            RespValue::BulkString(Some(data)) => {
                buf.put_slice(format!("${}\r\n", data.len()).as_bytes());
                buf.put_slice(data);
                buf.put_slice(b"\r\n");
            }
            RespValue::Array(None) => buf.put_slice(b"*-1\r\n"),
            RespValue::Array(Some(elements)) => {
                buf.put_slice(format!("*{}\r\n", elements.len()).as_bytes());
                for element in elements {
                    Self::encode_into(element, buf);
                }
            }
        }
    }
}

impl RespValue {
    #[inline]
    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    #[inline]
    pub fn pong() -> Self {
        RespValue::SimpleString("PONG".to_string())
    }

    #[inline]
    pub fn simple(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    #[inline]
    pub fn err(msg: impl Into<String>) -> Self {
        RespValue::Error(msg.into())
    }

    /// Nil bulk string response
    #[inline]
    pub fn nil() -> Self {
        RespValue::BulkString(None)
    }

    #[inline]
    pub fn bulk(data: &[u8]) -> Self {
        RespValue::BulkString(Some(data.to_vec()))
    }

    #[inline]
    pub fn empty_array() -> Self {
        RespValue::Array(Some(Vec::new()))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }
}
