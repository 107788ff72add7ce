//! Serde helpers that accept the timestamp encodings found in persisted ledgers.
//!
//! Records may carry RFC-3339 strings, bare `YYYY-MM-DD` dates, or epoch
//! milliseconds. Everything is written back as RFC-3339 UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Parses any supported textual timestamp encoding.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    trimmed.parse::<i64>().ok().and_then(from_epoch_millis)
}

pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `#[serde(with = "...")]` adapter for required timestamps.
pub mod flexible {
    use std::fmt;

    use chrono::{DateTime, Utc};
    use serde::{de, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        deserializer.deserialize_any(TimestampVisitor)
    }

    struct TimestampVisitor;

    impl<'de> de::Visitor<'de> for TimestampVisitor {
        type Value = DateTime<Utc>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an ISO-8601 timestamp or epoch milliseconds")
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
            super::from_epoch_millis(value)
                .ok_or_else(|| E::custom(format!("epoch millis out of range: {value}")))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
            let millis = i64::try_from(value)
                .map_err(|_| E::custom(format!("epoch millis out of range: {value}")))?;
            self.visit_i64(millis)
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
            if !value.is_finite() {
                return Err(E::custom("epoch millis must be finite"));
            }
            self.visit_i64(value.round() as i64)
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            super::parse_timestamp(value)
                .ok_or_else(|| E::custom(format!("unrecognised timestamp `{value}`")))
        }
    }
}

/// `#[serde(default, with = "...")]` adapter for optional timestamps.
pub mod option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    struct Flexible(#[serde(with = "super::flexible")] DateTime<Utc>);

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => super::flexible::serialize(value, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(Option::<Flexible>::deserialize(deserializer)?.map(|wrapped| wrapped.0))
    }
}
