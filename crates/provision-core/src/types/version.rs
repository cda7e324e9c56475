//! Four-part resource versions and inclusive version ranges.
//!
//! Resource versions take the form `major.minor.micro.fix`. Missing trailing
//! segments default to zero, so `1.0` and `1.0.0.0` are the same version.
//! Every segment compares numerically.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Resource version (major.minor.micro.fix)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub micro: u64,
    pub fix: u64,
}

/// Inclusive version range with an optional upper bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionRange {
    pub min: Version,
    pub max: Option<Version>,
}

/// Version parsing and validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version format: {input}")]
    InvalidFormat { input: String },

    #[error("Invalid number in version: {component}")]
    InvalidNumber { component: String },

    #[error("Invalid version range: {input}")]
    InvalidRange { input: String },
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, micro: u64, fix: u64) -> Self {
        Self {
            major,
            minor,
            micro,
            fix,
        }
    }

    /// Whether both versions share `major.minor.micro`
    pub fn same_release(&self, other: &Version) -> bool {
        (self.major, self.minor, self.micro) == (other.major, other.minor, other.micro)
    }

    fn segments(&self) -> (u64, u64, u64, u64) {
        (self.major, self.minor, self.micro, self.fix)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(VersionError::InvalidFormat {
                input: input.to_string(),
            });
        }

        let parts: Vec<&str> = input.split('.').collect();
        if parts.len() > 4 {
            return Err(VersionError::InvalidFormat {
                input: input.to_string(),
            });
        }

        let mut numbers = [0u64; 4];
        for (slot, part) in numbers.iter_mut().zip(parts.iter()) {
            *slot = part.parse().map_err(|_| VersionError::InvalidNumber {
                component: part.to_string(),
            })?;
        }

        Ok(Version::new(numbers[0], numbers[1], numbers[2], numbers[3]))
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.micro, self.fix)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments().cmp(&other.segments())
    }
}

impl VersionRange {
    /// Range containing exactly one version
    pub fn exact(version: Version) -> Self {
        Self {
            min: version,
            max: Some(version),
        }
    }

    /// Range with no upper bound
    pub fn at_least(min: Version) -> Self {
        Self { min, max: None }
    }

    /// Bounded inclusive range
    pub fn between(min: Version, max: Version) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    /// Parse the `productVersion` form used in applies-to expressions.
    ///
    /// `8.5.5.2+` has no upper bound, a bare `8.5.5.2` matches only itself.
    pub fn parse_applies_to(input: &str) -> Result<Self, VersionError> {
        let input = input.trim();
        match input.strip_suffix('+') {
            Some(min) => Ok(Self::at_least(min.parse()?)),
            None => Ok(Self::exact(input.parse()?)),
        }
    }

    /// Check whether a version lies inside this range
    pub fn contains(&self, version: &Version) -> bool {
        if *version < self.min {
            return false;
        }
        match self.max {
            Some(max) => *version <= max,
            None => true,
        }
    }

    /// Whether the range has no upper bound
    pub fn is_unbounded(&self) -> bool {
        self.max.is_none()
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if let Some(inner) = input.strip_prefix('[') {
            let inner = inner
                .strip_suffix(']')
                .ok_or_else(|| VersionError::InvalidRange {
                    input: input.to_string(),
                })?;
            let (min, max) = inner
                .split_once(',')
                .ok_or_else(|| VersionError::InvalidRange {
                    input: input.to_string(),
                })?;
            let range = Self::between(min.parse()?, max.parse()?);
            if range.max.is_some_and(|max| max < range.min) {
                return Err(VersionError::InvalidRange {
                    input: input.to_string(),
                });
            }
            return Ok(range);
        }

        Self::parse_applies_to(input)
    }
}

impl TryFrom<String> for VersionRange {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionRange> for String {
    fn from(range: VersionRange) -> Self {
        range.to_string()
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "[{}, {}]", self.min, max),
            None => write!(f, "{}", self.min),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parsing() {
        let v = Version::from_str("8.5.5.2").unwrap();
        assert_eq!(v, Version::new(8, 5, 5, 2));
    }

    #[test]
    fn test_short_versions_pad_with_zero() {
        assert_eq!(Version::from_str("1").unwrap(), Version::new(1, 0, 0, 0));
        assert_eq!(Version::from_str("1.0").unwrap(), Version::new(1, 0, 0, 0));
        assert_eq!(
            Version::from_str("1.0").unwrap(),
            Version::from_str("1.0.0.0").unwrap()
        );
    }

    #[test]
    fn test_invalid_versions() {
        assert!(Version::from_str("").is_err());
        assert!(Version::from_str("1.a").is_err());
        assert!(Version::from_str("1.2.3.4.5").is_err());
        assert!(matches!(
            Version::from_str("1.x"),
            Err(VersionError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_numeric_ordering() {
        let ten = Version::from_str("8.5.5.10").unwrap();
        let three = Version::from_str("8.5.5.3").unwrap();
        assert!(ten > three);
        assert!(Version::from_str("2.0").unwrap() > Version::from_str("1.9.9.9").unwrap());
    }

    #[test]
    fn test_same_release() {
        let a = Version::new(8, 5, 5, 2);
        assert!(a.same_release(&Version::new(8, 5, 5, 9)));
        assert!(!a.same_release(&Version::new(8, 5, 6, 2)));
    }

    #[test]
    fn test_range_display() {
        let exact = VersionRange::parse_applies_to("2.0.0.0").unwrap();
        assert_eq!(exact.to_string(), "[2.0.0.0, 2.0.0.0]");

        let open = VersionRange::parse_applies_to("5.0.0.0+").unwrap();
        assert_eq!(open.to_string(), "5.0.0.0");
        assert!(open.is_unbounded());
    }

    #[test]
    fn test_range_contains() {
        let open = VersionRange::at_least(Version::new(5, 0, 0, 0));
        assert!(open.contains(&Version::new(5, 0, 0, 0)));
        assert!(open.contains(&Version::new(9, 0, 0, 0)));
        assert!(!open.contains(&Version::new(4, 9, 9, 9)));

        let exact = VersionRange::exact(Version::new(2, 0, 0, 0));
        assert!(exact.contains(&Version::new(2, 0, 0, 0)));
        assert!(!exact.contains(&Version::new(2, 0, 0, 1)));
    }

    #[test]
    fn test_range_parse_brackets() {
        let range = VersionRange::from_str("[1.0, 2.0]").unwrap();
        assert_eq!(range.min, Version::new(1, 0, 0, 0));
        assert_eq!(range.max, Some(Version::new(2, 0, 0, 0)));
        assert!(VersionRange::from_str("[2.0, 1.0]").is_err());
        assert!(VersionRange::from_str("[2.0").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let v: Version = serde_json::from_str("\"1.2\"").unwrap();
        assert_eq!(v, Version::new(1, 2, 0, 0));
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"1.2.0.0\"");
    }
}
