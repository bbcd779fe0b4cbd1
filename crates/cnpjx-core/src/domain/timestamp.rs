use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::ValidationError;

/// Timestamp normalized to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Parses an RFC3339 timestamp (with or without sub-second precision, any
    /// offset) or a naive `YYYY-MM-DD[T ]HH:MM:SS[.fff]` written by older cache
    /// files, which is read as UTC.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
            return Ok(Self(parsed.to_offset(UtcOffset::UTC)));
        }

        parse_naive(trimmed)
            .map(|naive| Self(naive.assume_utc()))
            .ok_or_else(|| ValidationError::InvalidTimestamp {
                value: input.to_owned(),
            })
    }

    pub fn from_offset_datetime(value: OffsetDateTime) -> Self {
        Self(value.to_offset(UtcOffset::UTC))
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, zero when `earlier` is in the future.
    pub fn saturating_since(self, earlier: Self) -> Duration {
        Duration::try_from(self.0 - earlier.0).unwrap_or(Duration::ZERO)
    }

    pub fn plus(self, duration: Duration) -> Self {
        Self(self.0 + duration)
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .expect("UtcDateTime must be RFC3339 formattable")
    }
}

fn parse_naive(input: &str) -> Option<PrimitiveDateTime> {
    PrimitiveDateTime::parse(
        input,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            input,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        )
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(
            input,
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
        )
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(
            input,
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        )
    })
    .ok()
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_with_and_without_subseconds() {
        let whole = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("must parse");
        let fractional = UtcDateTime::parse("2024-01-01T00:00:00.250Z").expect("must parse");

        assert_eq!(whole.format_rfc3339(), "2024-01-01T00:00:00Z");
        assert_eq!(fractional.saturating_since(whole), Duration::from_millis(250));
    }

    #[test]
    fn offsets_are_normalized_to_utc() {
        let parsed = UtcDateTime::parse("2024-01-01T01:00:00+01:00").expect("must parse");
        assert_eq!(parsed.format_rfc3339(), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn parses_naive_layouts_as_utc() {
        let expected = UtcDateTime::parse("2024-03-10T12:30:45Z").expect("must parse");

        for input in [
            "2024-03-10T12:30:45",
            "2024-03-10 12:30:45",
            "2024-03-10T12:30:45.000000",
            "2024-03-10 12:30:45.0",
        ] {
            assert_eq!(UtcDateTime::parse(input), Ok(expected), "input {input}");
        }
    }

    #[test]
    fn rejects_garbage() {
        let err = UtcDateTime::parse("yesterday-ish").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidTimestamp { .. }));
    }

    #[test]
    fn saturating_since_never_goes_negative() {
        let early = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("must parse");
        let late = early.plus(Duration::from_secs(90));

        assert_eq!(late.saturating_since(early), Duration::from_secs(90));
        assert_eq!(early.saturating_since(late), Duration::ZERO);
    }
}
