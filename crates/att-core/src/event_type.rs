//! Event kind enum as the single source of truth for event kind strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::ValidationError;

/// The two attendance actions a subject can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CheckIn,
    CheckOut,
}

impl EventKind {
    /// String representation for storage and JSON.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CheckIn => "check_in",
            Self::CheckOut => "check_out",
        }
    }

    /// Human-readable label used by the tabular export.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::CheckIn => "Check In",
            Self::CheckOut => "Check Out",
        }
    }

    #[must_use]
    pub const fn is_check_in(&self) -> bool {
        matches!(self, Self::CheckIn)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check_in" | "checkin" | "check-in" | "in" => Ok(Self::CheckIn),
            "check_out" | "checkout" | "check-out" | "out" => Ok(Self::CheckOut),
            _ => Err(ValidationError::InvalidEventKind {
                value: s.to_string(),
            }),
        }
    }
}

impl Serialize for EventKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_variants() {
        for variant in [EventKind::CheckIn, EventKind::CheckOut] {
            let parsed: EventKind = variant.to_string().parse().expect("should parse");
            assert_eq!(parsed, variant, "roundtrip failed for {variant:?}");
        }
    }

    #[test]
    fn legacy_aliases_parse() {
        assert_eq!("in".parse::<EventKind>().unwrap(), EventKind::CheckIn);
        assert_eq!("checkout".parse::<EventKind>().unwrap(), EventKind::CheckOut);
        assert_eq!("check-in".parse::<EventKind>().unwrap(), EventKind::CheckIn);
    }

    #[test]
    fn unknown_kind_errors() {
        let err = "lunch".parse::<EventKind>().unwrap_err();
        assert_eq!(err.to_string(), "invalid event kind: lunch");
    }

    #[test]
    fn labels_match_export_contract() {
        assert_eq!(EventKind::CheckIn.label(), "Check In");
        assert_eq!(EventKind::CheckOut.label(), "Check Out");
    }
}
