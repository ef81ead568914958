//! Version parsing and range matching
//!
//! Registries publish versions in a lenient dotted form (`1.0`, `1.2.3.4`,
//! `2.0.0-beta.1`), while manifests declare interval ranges (`[1.0,2.0)`,
//! `[1.0]`, or a bare minimum like `1.0`). This module normalizes both into
//! [`semver::Version`] and [`VersionRange`] and implements best-match
//! selection: the highest published version that satisfies the range.
//!
//! # Examples
//!
//! ```
//! use depmon::version::{parse_lenient, VersionRange};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let range: VersionRange = "[1.0,2.0)".parse()?;
//! let versions = vec![
//!     parse_lenient("3.0")?,
//!     parse_lenient("2.5")?,
//!     parse_lenient("1.5")?,
//!     parse_lenient("1.0")?,
//! ];
//!
//! let best = range.best_match(versions.iter());
//! assert_eq!(best.unwrap().to_string(), "1.5.0");
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use semver::Version;
use std::fmt;
use std::str::FromStr;

/// Parse a version string leniently.
///
/// Pads missing components (`1.0` becomes `1.0.0`), drops a legacy fourth
/// revision component (`1.2.3.4` becomes `1.2.3`), and preserves prerelease
/// and build metadata suffixes.
pub fn parse_lenient(input: &str) -> Result<Version> {
    let input = input.trim();

    // Split off prerelease / build metadata before padding the numeric core.
    let (core, rest) = match input.find(['-', '+']) {
        Some(pos) => (&input[..pos], &input[pos..]),
        None => (input, ""),
    };

    let parts: Vec<&str> = core.split('.').collect();
    let normalized_core = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        3 => core.to_string(),
        4 => parts[..3].join("."),
        _ => core.to_string(),
    };

    Ok(Version::parse(&format!("{}{}", normalized_core, rest))?)
}

/// Whether a version carries a prerelease tag (`2.0.0-beta.1`).
pub fn is_prerelease(version: &Version) -> bool {
    !version.pre.is_empty()
}

/// A declared version range in interval notation.
///
/// Supported forms:
///
/// - `1.0` — minimum, inclusive (`>= 1.0`)
/// - `[1.0]` — exactly `1.0`
/// - `[1.0,2.0)` — `>= 1.0, < 2.0` (brackets inclusive, parens exclusive)
/// - `[1.0,)` — `>= 1.0`
/// - `(,2.0]` — `<= 2.0`
/// - `*` — any version
///
/// Equality and hashing are structural, so two references declaring the same
/// range compare equal regardless of the original spelling's whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    min: Option<Version>,
    min_inclusive: bool,
    max: Option<Version>,
    max_inclusive: bool,
    exact: bool,
}

impl VersionRange {
    /// A range matching any version.
    pub fn any() -> Self {
        Self {
            min: None,
            min_inclusive: true,
            max: None,
            max_inclusive: false,
            exact: false,
        }
    }

    /// A range pinned to exactly one version.
    pub fn exact(version: Version) -> Self {
        Self {
            min: Some(version.clone()),
            min_inclusive: true,
            max: Some(version),
            max_inclusive: true,
            exact: true,
        }
    }

    /// The pinned version when this range is literally a single version.
    ///
    /// Such a range resolves without consulting the catalog at all.
    pub fn as_exact(&self) -> Option<&Version> {
        if self.exact {
            self.min.as_ref()
        } else {
            None
        }
    }

    /// The declared lower bound, if any.
    pub fn min_version(&self) -> Option<&Version> {
        self.min.as_ref()
    }

    pub fn matches(&self, version: &Version) -> bool {
        if let Some(min) = &self.min {
            let ok = if self.min_inclusive {
                version >= min
            } else {
                version > min
            };
            if !ok {
                return false;
            }
        }
        if let Some(max) = &self.max {
            let ok = if self.max_inclusive {
                version <= max
            } else {
                version < max
            };
            if !ok {
                return false;
            }
        }
        true
    }

    /// Select the best match from a newest-first sequence of versions.
    ///
    /// Returns the first (highest) version satisfying the range.
    pub fn best_match<'a, I>(&self, versions: I) -> Option<&'a Version>
    where
        I: IntoIterator<Item = &'a Version>,
    {
        versions.into_iter().find(|v| self.matches(v))
    }
}

impl FromStr for VersionRange {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let s = input.trim();

        if s.is_empty() || s == "*" {
            return Ok(VersionRange::any());
        }

        let open = s.starts_with('[') || s.starts_with('(');
        let close = s.ends_with(']') || s.ends_with(')');

        if !open && !close {
            // Bare version: inclusive minimum, unbounded above.
            let min = parse_lenient(s)
                .map_err(|e| Error::InvalidRange(input.to_string(), e.to_string()))?;
            return Ok(Self {
                min: Some(min),
                min_inclusive: true,
                max: None,
                max_inclusive: false,
                exact: false,
            });
        }

        if !(open && close) {
            return Err(Error::InvalidRange(
                input.to_string(),
                "unbalanced interval brackets".to_string(),
            ));
        }

        let min_inclusive = s.starts_with('[');
        let max_inclusive = s.ends_with(']');
        let inner = &s[1..s.len() - 1];

        let (min_str, max_str, singleton) = match inner.find(',') {
            Some(pos) => (inner[..pos].trim(), inner[pos + 1..].trim(), false),
            None => (inner.trim(), inner.trim(), true),
        };

        if singleton && !(min_inclusive && max_inclusive) {
            return Err(Error::InvalidRange(
                input.to_string(),
                "a single-version interval must use [v]".to_string(),
            ));
        }

        let parse_bound = |bound: &str| -> Result<Option<Version>> {
            if bound.is_empty() {
                Ok(None)
            } else {
                parse_lenient(bound)
                    .map(Some)
                    .map_err(|e| Error::InvalidRange(input.to_string(), e.to_string()))
            }
        };

        let min = parse_bound(min_str)?;
        let max = parse_bound(max_str)?;

        if min.is_none() && max.is_none() {
            return Err(Error::InvalidRange(
                input.to_string(),
                "interval has no bounds".to_string(),
            ));
        }

        if let (Some(lo), Some(hi)) = (&min, &max) {
            if lo > hi {
                return Err(Error::InvalidRange(
                    input.to_string(),
                    "lower bound exceeds upper bound".to_string(),
                ));
            }
        }

        Ok(Self {
            min,
            min_inclusive,
            max,
            max_inclusive,
            exact: singleton,
        })
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(v) = self.as_exact() {
            return write!(f, "[{}]", v);
        }
        match (&self.min, &self.max) {
            (None, None) => write!(f, "*"),
            (Some(min), None) if self.min_inclusive && !self.max_inclusive => {
                // Canonical open-ended minimum.
                write!(f, "[{},)", min)
            }
            _ => {
                write!(f, "{}", if self.min_inclusive { '[' } else { '(' })?;
                if let Some(min) = &self.min {
                    write!(f, "{}", min)?;
                }
                write!(f, ",")?;
                if let Some(max) = &self.max {
                    write!(f, "{}", max)?;
                }
                write!(f, "{}", if self.max_inclusive { ']' } else { ')' })
            }
        }
    }
}

impl serde::Serialize for VersionRange {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for VersionRange {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        parse_lenient(s).unwrap()
    }

    // ============================================================================
    // parse_lenient tests
    // ============================================================================

    #[test]
    fn test_parse_lenient_pads_components() {
        assert_eq!(v("1"), Version::new(1, 0, 0));
        assert_eq!(v("1.2"), Version::new(1, 2, 0));
        assert_eq!(v("1.2.3"), Version::new(1, 2, 3));
    }

    #[test]
    fn test_parse_lenient_drops_revision() {
        assert_eq!(v("1.2.3.4"), Version::new(1, 2, 3));
    }

    #[test]
    fn test_parse_lenient_prerelease() {
        let ver = v("2.0-beta.1");
        assert_eq!((ver.major, ver.minor, ver.patch), (2, 0, 0));
        assert!(is_prerelease(&ver));
        assert!(!is_prerelease(&v("2.0")));
    }

    #[test]
    fn test_parse_lenient_rejects_garbage() {
        assert!(parse_lenient("not-a-version").is_err());
        assert!(parse_lenient("").is_err());
    }

    #[test]
    fn test_prerelease_sorts_below_release() {
        assert!(v("2.0-beta.1") < v("2.0"));
        assert!(v("2.0-beta.1") > v("1.9"));
    }

    // ============================================================================
    // VersionRange parsing tests
    // ============================================================================

    #[test]
    fn test_range_bare_minimum() {
        let range: VersionRange = "1.0".parse().unwrap();
        assert!(range.matches(&v("1.0")));
        assert!(range.matches(&v("9.0")));
        assert!(!range.matches(&v("0.9")));
        assert!(range.as_exact().is_none());
    }

    #[test]
    fn test_range_exact() {
        let range: VersionRange = "[1.2.3]".parse().unwrap();
        assert_eq!(range.as_exact(), Some(&v("1.2.3")));
        assert!(range.matches(&v("1.2.3")));
        assert!(!range.matches(&v("1.2.4")));
    }

    #[test]
    fn test_range_half_open() {
        let range: VersionRange = "[1.0,2.0)".parse().unwrap();
        assert!(range.matches(&v("1.0")));
        assert!(range.matches(&v("1.9.9")));
        assert!(!range.matches(&v("2.0")));
        assert!(!range.matches(&v("0.9")));
    }

    #[test]
    fn test_range_open_ended() {
        let range: VersionRange = "[1.0,)".parse().unwrap();
        assert!(range.matches(&v("1.0")));
        assert!(range.matches(&v("100.0")));
        assert!(!range.matches(&v("0.1")));
    }

    #[test]
    fn test_range_max_only() {
        let range: VersionRange = "(,2.0]".parse().unwrap();
        assert!(range.matches(&v("0.1")));
        assert!(range.matches(&v("2.0")));
        assert!(!range.matches(&v("2.0.1")));
    }

    #[test]
    fn test_range_exclusive_minimum() {
        let range: VersionRange = "(1.0,2.0]".parse().unwrap();
        assert!(!range.matches(&v("1.0")));
        assert!(range.matches(&v("1.0.1")));
        assert!(range.matches(&v("2.0")));
    }

    #[test]
    fn test_range_wildcard() {
        let range: VersionRange = "*".parse().unwrap();
        assert!(range.matches(&v("0.0.1")));
        assert!(range.matches(&v("99.0")));
    }

    #[test]
    fn test_range_invalid() {
        assert!("[1.0".parse::<VersionRange>().is_err());
        assert!("[,]".parse::<VersionRange>().is_err());
        assert!("(1.0)".parse::<VersionRange>().is_err());
        assert!("[2.0,1.0]".parse::<VersionRange>().is_err());
        assert!("[abc,1.0]".parse::<VersionRange>().is_err());
    }

    #[test]
    fn test_range_display_round_trip() {
        for spelling in ["[1.0.0,2.0.0)", "[1.2.3]", "[1.0.0,)", "(,2.0.0]", "*"] {
            let range: VersionRange = spelling.parse().unwrap();
            let redisplayed: VersionRange = range.to_string().parse().unwrap();
            assert_eq!(range, redisplayed, "round trip of {}", spelling);
        }
    }

    #[test]
    fn test_range_equality_ignores_whitespace() {
        let a: VersionRange = "[1.0, 2.0)".parse().unwrap();
        let b: VersionRange = "[1.0,2.0)".parse().unwrap();
        assert_eq!(a, b);
    }

    // ============================================================================
    // best_match tests
    // ============================================================================

    #[test]
    fn test_best_match_highest_in_range() {
        let range: VersionRange = "[1.0,2.0)".parse().unwrap();
        let catalog = vec![v("3.0"), v("2.5"), v("1.5"), v("1.0")];
        assert_eq!(range.best_match(catalog.iter()), Some(&v("1.5")));
    }

    #[test]
    fn test_best_match_none_in_range() {
        let range: VersionRange = "[4.0,)".parse().unwrap();
        let catalog = vec![v("3.0"), v("2.5")];
        assert_eq!(range.best_match(catalog.iter()), None);
    }

    #[test]
    fn test_best_match_open_range_takes_newest() {
        let range: VersionRange = "[1.0,)".parse().unwrap();
        let catalog = vec![v("2.0"), v("1.0")];
        assert_eq!(range.best_match(catalog.iter()), Some(&v("2.0")));
    }
}
