//! Value encoding for object payloads. JSON via serde_json.

use super::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::Error;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: i32,
        label: String,
    }

    #[test]
    fn test_struct_payload() {
        let bytes = encode(&Point { x: 3, label: "a".into() }).unwrap();
        assert_eq!(bytes, br#"{"x":3,"label":"a"}"#);
        let back: Point = decode(&bytes).unwrap();
        assert_eq!(back, Point { x: 3, label: "a".into() });
    }

    #[test]
    fn test_string_is_quoted() {
        assert_eq!(encode("someValue").unwrap(), b"\"someValue\"");
    }

    #[test]
    fn test_decode_failure() {
        let err = decode::<Point>(b"not json").unwrap_err();
        assert!(matches!(err, Error::Codec(_)));
    }
}
