//! Dialect versions understood by the converter.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Every recognised description-language version. Ordering follows release order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Version {
    #[serde(rename = "2.0")]
    V2_0,
    #[serde(rename = "3.0.0")]
    V3_0_0,
    #[serde(rename = "3.0.1")]
    V3_0_1,
    #[serde(rename = "3.0.2")]
    V3_0_2,
    #[serde(rename = "3.0.3")]
    V3_0_3,
    #[serde(rename = "3.0.4")]
    V3_0_4,
    #[serde(rename = "3.1.0")]
    V3_1_0,
    #[serde(rename = "3.1.1")]
    V3_1_1,
    #[serde(rename = "3.1.2")]
    V3_1_2,
    #[serde(rename = "3.2.0")]
    V3_2_0,
}

/// Major dialect family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Swagger 2.0
    Legacy,
    /// OpenAPI 3.x
    Modern,
}

/// Text encoding the source document was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    #[default]
    Json,
    Yaml,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

const ALL: [Version; 10] = [
    Version::V2_0,
    Version::V3_0_0,
    Version::V3_0_1,
    Version::V3_0_2,
    Version::V3_0_3,
    Version::V3_0_4,
    Version::V3_1_0,
    Version::V3_1_1,
    Version::V3_1_2,
    Version::V3_2_0,
];

impl Version {
    pub fn all() -> &'static [Version] {
        &ALL
    }

    /// Canonical version string as it appears in a document.
    pub fn as_str(self) -> &'static str {
        match self {
            Version::V2_0 => "2.0",
            Version::V3_0_0 => "3.0.0",
            Version::V3_0_1 => "3.0.1",
            Version::V3_0_2 => "3.0.2",
            Version::V3_0_3 => "3.0.3",
            Version::V3_0_4 => "3.0.4",
            Version::V3_1_0 => "3.1.0",
            Version::V3_1_1 => "3.1.1",
            Version::V3_1_2 => "3.1.2",
            Version::V3_2_0 => "3.2.0",
        }
    }

    pub fn family(self) -> Family {
        match self {
            Version::V2_0 => Family::Legacy,
            _ => Family::Modern,
        }
    }

    pub fn is_legacy(self) -> bool {
        self.family() == Family::Legacy
    }

    /// `true` for the 3.0.x line, where `nullable` is still a keyword.
    pub fn is_3_0(self) -> bool {
        matches!(
            self,
            Version::V3_0_0 | Version::V3_0_1 | Version::V3_0_2 | Version::V3_0_3 | Version::V3_0_4
        )
    }

    /// `true` for 3.1.0 and everything released after it.
    pub fn is_3_1_or_later(self) -> bool {
        self >= Version::V3_1_0
    }
}

impl FromStr for Version {
    type Err = Error;

    /// Accepts exact version strings plus the short `2`, `3.0`, `3.1` and `3.2` forms,
    /// which resolve to the `.0` patch release.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let canonical = match trimmed {
            "2" | "2.0.0" => "2.0",
            "3.0" => "3.0.0",
            "3.1" => "3.1.0",
            "3.2" => "3.2.0",
            other => other,
        };
        ALL.iter()
            .copied()
            .find(|v| v.as_str() == canonical)
            .ok_or_else(|| Error::InvalidVersion(raw.to_string()))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Json => f.write_str("json"),
            SourceFormat::Yaml => f.write_str("yaml"),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exact_and_short_forms() {
        assert_eq!("2.0".parse::<Version>().unwrap(), Version::V2_0);
        assert_eq!("2".parse::<Version>().unwrap(), Version::V2_0);
        assert_eq!("3.0.3".parse::<Version>().unwrap(), Version::V3_0_3);
        assert_eq!("3.1".parse::<Version>().unwrap(), Version::V3_1_0);
        assert_eq!(" 3.2.0 ".parse::<Version>().unwrap(), Version::V3_2_0);
    }

    #[test]
    fn rejects_unknown_versions() {
        for raw in ["", "1.2", "3.0.9", "4.0.0", "three"] {
            let err = raw.parse::<Version>().unwrap_err();
            assert!(matches!(err, Error::InvalidVersion(ref s) if s == raw), "{raw}");
        }
    }

    #[test]
    fn families_and_sub_ranges() {
        assert!(Version::V2_0.is_legacy());
        assert_eq!(Version::V3_0_0.family(), Family::Modern);
        assert!(Version::V3_0_4.is_3_0());
        assert!(!Version::V3_1_0.is_3_0());
        assert!(Version::V3_1_0.is_3_1_or_later());
        assert!(Version::V3_2_0.is_3_1_or_later());
        assert!(!Version::V3_0_3.is_3_1_or_later());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for v in Version::all() {
            assert_eq!(v.to_string().parse::<Version>().unwrap(), *v);
        }
    }
}
