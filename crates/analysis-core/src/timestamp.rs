//! Serde helpers for backend timestamps
//!
//! The backend emits `datetime.now().isoformat()` values without an offset.
//! Those are read as UTC; RFC 3339 strings are accepted as well. Values are
//! always written back as RFC 3339.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer, de};

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parse an RFC 3339 or offset-less ISO-8601 timestamp
pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT).map(|naive| naive.and_utc()))
}

pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_rfc3339())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(|e| de::Error::custom(format!("invalid timestamp '{raw}': {e}")))
}

/// Same as the parent module, for optional fields
pub mod option {
    use super::{DateTime, Deserialize, Deserializer, Serializer, Utc, de, parse};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_some(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !raw.is_empty() => parse(&raw)
                .map(Some)
                .map_err(|e| de::Error::custom(format!("invalid timestamp '{raw}': {e}"))),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_naive_backend_timestamp() {
        let ts = parse("2025-03-14T09:26:53.589793").unwrap();
        assert_eq!(ts.year(), 2025);
        assert_eq!(ts.hour(), 9);
        assert_eq!(ts.nanosecond(), 589_793_000);
    }

    #[test]
    fn test_parse_without_fraction() {
        let ts = parse("2025-03-14T09:26:53").unwrap();
        assert_eq!(ts.second(), 53);
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let ts = parse("2025-03-14T09:26:53+02:00").unwrap();
        assert_eq!(ts.hour(), 7);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse("yesterday").is_err());
    }
}
