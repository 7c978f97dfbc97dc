use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Failure to parse an XML Schema date or time value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid timezone offset in {0:?}")]
    Offset(String),

    #[error("invalid xsd:{kind} value {value:?}")]
    Value {
        kind: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Split a trailing `Z` or `±HH:MM` timezone off a lexical value
fn split_offset(s: &str) -> Result<(&str, Option<FixedOffset>), ParseError> {
    if let Some(rest) = s.strip_suffix('Z') {
        return Ok((rest, FixedOffset::east_opt(0)));
    }

    let bytes = s.as_bytes();
    let n = bytes.len();
    if n <= 6 || !matches!(bytes[n - 6], b'+' | b'-') || bytes[n - 3] != b':' {
        return Ok((s, None));
    }

    let (rest, zone) = s.split_at(n - 6);
    let invalid = || ParseError::Offset(s.to_string());
    let hours: i32 = zone[1..3].parse().map_err(|_| invalid())?;
    let minutes: i32 = zone[4..6].parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }
    let sign = if bytes[n - 6] == b'-' { -1 } else { 1 };
    let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)?;
    Ok((rest, Some(offset)))
}

fn format_offset(offset: Option<FixedOffset>) -> String {
    match offset {
        None => String::new(),
        Some(offset) if offset.local_minus_utc() == 0 => "Z".to_string(),
        Some(offset) => offset.to_string(),
    }
}

macro_rules! xsd_temporal {
    ($(#[$meta:meta])* $name:ident, $value:ty, $kind:literal, $format:literal) => {
        $(#[$meta])*
        ///
        /// The lexical form is preserved from parsing, so values round-trip exactly.
        /// Equality compares the parsed value and timezone.
        #[derive(Debug, Clone)]
        pub struct $name {
            serialized: String,
            value: $value,
            offset: Option<FixedOffset>,
        }

        impl $name {
            pub fn new(value: $value, offset: Option<FixedOffset>) -> Self {
                let serialized = format!("{}{}", value.format($format), format_offset(offset));
                Self {
                    serialized,
                    value,
                    offset,
                }
            }

            /// The value without its timezone
            pub fn value(&self) -> $value {
                self.value
            }

            /// Timezone, if the value carried one
            pub fn offset(&self) -> Option<FixedOffset> {
                self.offset
            }

            pub fn as_str(&self) -> &str {
                &self.serialized
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new(<$value>::default(), None)
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.value == other.value && self.offset == other.offset
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.value.hash(state);
                self.offset.hash(state);
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                let (rest, offset) = split_offset(s)?;
                let value = <$value>::parse_from_str(rest, $format).map_err(|source| ParseError::Value {
                    kind: $kind,
                    value: s.to_string(),
                    source,
                })?;
                Ok(Self {
                    serialized: s.to_string(),
                    value,
                    offset,
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.serialized)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.serialized)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = String::deserialize(deserializer)?;
                value.parse().map_err(D::Error::custom)
            }
        }
    };
}

xsd_temporal!(
    /// An `xs:dateTime`, e.g. `2002-05-30T09:30:10.5-06:00`
    XsdDateTime,
    NaiveDateTime,
    "dateTime",
    "%Y-%m-%dT%H:%M:%S%.f"
);

xsd_temporal!(
    /// An `xs:date`, e.g. `2002-09-24Z`
    XsdDate,
    NaiveDate,
    "date",
    "%Y-%m-%d"
);

xsd_temporal!(
    /// An `xs:time`, e.g. `09:00:00+05:30`
    XsdTime,
    NaiveTime,
    "time",
    "%H:%M:%S%.f"
);

impl XsdDateTime {
    /// The instant this value denotes, when it carries a timezone
    pub fn to_datetime(&self) -> Option<DateTime<FixedOffset>> {
        let offset = self.offset?;
        self.value.and_local_timezone(offset).single()
    }
}

impl From<DateTime<FixedOffset>> for XsdDateTime {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self::new(dt.naive_local(), Some(*dt.offset()))
    }
}
