//! Serde helpers for the service's loosely typed scalars.
//!
//! The REST API accepts numeric and boolean properties as JSON strings and
//! sometimes reports integers as strings, so these helpers bridge both forms.

use serde::de::{self, Deserializer, Visitor};
use serde::Serializer;
use std::fmt;

/// Serialize any `Display` value as a JSON string.
pub fn as_string<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: fmt::Display,
    S: Serializer,
{
    serializer.collect_str(value)
}

/// Deserialize a JSON string or number into its string form. `null` becomes `""`.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrNumber;

    impl<'de> Visitor<'de> for StringOrNumber {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or a number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_unit<E: de::Error>(self) -> Result<String, E> {
            Ok(String::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<String, E> {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(StringOrNumber)
}

/// Deserialize an optional JSON string or number into seconds.
pub fn seconds_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = serde::Deserialize::deserialize(deserializer)?;
    match raw {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid seconds value: {}", n))),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid seconds value: {}", s))),
        Some(other) => Err(de::Error::custom(format!(
            "invalid seconds value: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize)]
    struct Flags {
        #[serde(serialize_with = "as_string")]
        count: u64,
        #[serde(serialize_with = "as_string")]
        enabled: bool,
    }

    #[derive(Deserialize)]
    struct Code {
        #[serde(deserialize_with = "string_or_number")]
        code: String,
    }

    #[derive(Deserialize)]
    struct Expiry {
        #[serde(default, deserialize_with = "seconds_from_string_or_number")]
        expires_in: Option<u64>,
    }

    #[test]
    fn test_as_string() {
        let json = serde_json::to_string(&Flags {
            count: 42,
            enabled: false,
        })
        .unwrap();
        assert_eq!(json, r#"{"count":"42","enabled":"false"}"#);
    }

    #[test]
    fn test_string_or_number() {
        let a: Code = serde_json::from_str(r#"{"code": 3}"#).unwrap();
        let b: Code = serde_json::from_str(r#"{"code": "3"}"#).unwrap();
        assert_eq!(a.code, "3");
        assert_eq!(b.code, "3");
    }

    #[test]
    fn test_string_or_number_null() {
        let c: Code = serde_json::from_str(r#"{"code": null}"#).unwrap();
        assert_eq!(c.code, "");
        assert!(serde_json::from_str::<Code>(r#"{"code": [1]}"#).is_err());
    }

    #[test]
    fn test_seconds_from_string_or_number() {
        let a: Expiry = serde_json::from_str(r#"{"expires_in": "3599"}"#).unwrap();
        let b: Expiry = serde_json::from_str(r#"{"expires_in": 3599}"#).unwrap();
        let c: Expiry = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(a.expires_in, Some(3599));
        assert_eq!(b.expires_in, Some(3599));
        assert_eq!(c.expires_in, None);
        assert!(serde_json::from_str::<Expiry>(r#"{"expires_in": "soon"}"#).is_err());
    }
}
