//! Target framework monikers and nearest-compatibility matching
//!
//! Packages publish one dependency group per target framework. Resolving a
//! project's dependencies requires picking the group most specifically
//! compatible with the project's own framework, e.g. a `net6.0-windows`
//! project consumes the `net6.0` group when no windows-qualified group
//! exists, and may consume a `net6.0-windows7.0` group even though the
//! platform versions differ.
//!
//! # Examples
//!
//! ```
//! use depmon::framework::{select_nearest, TargetFramework};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let target: TargetFramework = "net6.0-windows".parse()?;
//! let published = vec!["net472".parse()?, "net6.0".parse()?];
//!
//! assert_eq!(select_nearest(&target, &published), Some(1));
//! # Ok(())
//! # }
//! ```

use crate::Error;
use std::fmt;
use std::str::FromStr;

/// Framework family, determining which monikers can consume which groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameworkFamily {
    /// `net5.0` and later (dotted version).
    Net,
    /// Classic `net472`-style monikers (digit-per-component version).
    NetFramework,
    /// `netstandard2.0` and friends.
    NetStandard,
    /// `netcoreapp3.1` and friends.
    NetCoreApp,
    /// Anything unrecognized; matches only its exact spelling.
    Other(String),
}

/// A parsed target framework moniker.
///
/// Equality and hashing use the normalized (lowercased) parsed form, so
/// `Net6.0` and `net6.0` denote the same framework.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetFramework {
    family: FrameworkFamily,
    version: (u32, u32, u32),
    platform: Option<String>,
    platform_version: Option<(u32, u32, u32)>,
    raw: String,
}

impl TargetFramework {
    pub fn family(&self) -> &FrameworkFamily {
        &self.family
    }

    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    /// The moniker as it appeared in the manifest.
    pub fn moniker(&self) -> &str {
        &self.raw
    }

    /// Whether a dependency group published for `candidate` can be consumed
    /// by a project targeting `self`.
    ///
    /// When `ignore_platform_version` is set, `net6.0-windows` accepts a
    /// group published for `net6.0-windows7.0` (the platform-version
    /// independent fallback).
    fn accepts(&self, candidate: &TargetFramework, ignore_platform_version: bool) -> bool {
        if let FrameworkFamily::Other(_) = self.family {
            return self == candidate;
        }
        if self.family != candidate.family {
            return false;
        }
        if candidate.version > self.version {
            return false;
        }
        match (&self.platform, &candidate.platform) {
            // Platform-agnostic groups are consumable by any platform.
            (_, None) => true,
            // A platform-qualified group cannot serve a platform-less target.
            (None, Some(_)) => false,
            (Some(target_platform), Some(candidate_platform)) => {
                if target_platform != candidate_platform {
                    return false;
                }
                if ignore_platform_version {
                    return true;
                }
                match (&self.platform_version, &candidate.platform_version) {
                    (_, None) => true,
                    (None, Some(_)) => false,
                    (Some(target_pv), Some(candidate_pv)) => candidate_pv <= target_pv,
                }
            }
        }
    }

    /// Specificity key for ranking compatible candidates: higher framework
    /// version first, then platform-qualified over platform-agnostic, then
    /// higher platform version.
    fn specificity(&self) -> ((u32, u32, u32), bool, (u32, u32, u32)) {
        (
            self.version,
            self.platform.is_some(),
            self.platform_version.unwrap_or((0, 0, 0)),
        )
    }
}

/// Select the index of the dependency-group framework nearest to `target`.
///
/// Tries strict compatibility first, then retries ignoring platform
/// versions. Returns `None` when nothing is compatible; callers fall back to
/// the union of all groups rather than dropping dependencies.
pub fn select_nearest(target: &TargetFramework, candidates: &[TargetFramework]) -> Option<usize> {
    for ignore_platform_version in [false, true] {
        let best = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| target.accepts(c, ignore_platform_version))
            .max_by_key(|(_, c)| c.specificity());
        if let Some((index, _)) = best {
            return Some(index);
        }
    }
    None
}

fn parse_dotted(version: &str) -> Option<(u32, u32, u32)> {
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().map_or(Some(0), |p| p.parse().ok())?;
    let patch = parts.next().map_or(Some(0), |p| p.parse().ok())?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}

/// Classic monikers encode one version component per digit: `472` is 4.7.2.
fn parse_digits(version: &str) -> Option<(u32, u32, u32)> {
    let digits: Vec<u32> = version
        .chars()
        .map(|c| c.to_digit(10))
        .collect::<Option<_>>()?;
    match digits.len() {
        2 => Some((digits[0], digits[1], 0)),
        3 => Some((digits[0], digits[1], digits[2])),
        _ => None,
    }
}

fn split_platform(segment: &str) -> (String, Option<(u32, u32, u32)>) {
    match segment.find(|c: char| c.is_ascii_digit()) {
        Some(pos) => {
            let (name, version) = segment.split_at(pos);
            (name.to_string(), parse_dotted(version))
        }
        None => (segment.to_string(), None),
    }
}

impl FromStr for TargetFramework {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Error> {
        let raw = input.trim();
        let moniker = raw.to_ascii_lowercase();
        let invalid = || Error::InvalidFramework(input.to_string());

        if moniker.is_empty() {
            return Err(invalid());
        }

        let parsed = if let Some(rest) = moniker.strip_prefix("netstandard") {
            parse_dotted(rest).map(|version| (FrameworkFamily::NetStandard, version, None, None))
        } else if let Some(rest) = moniker.strip_prefix("netcoreapp") {
            parse_dotted(rest).map(|version| (FrameworkFamily::NetCoreApp, version, None, None))
        } else if let Some(rest) = moniker.strip_prefix("net") {
            let (version_part, platform_part) = match rest.split_once('-') {
                Some((v, p)) => (v, Some(p)),
                None => (rest, None),
            };
            if version_part.contains('.') {
                parse_dotted(version_part).map(|version| {
                    let (platform, platform_version) = match platform_part {
                        Some(p) => {
                            let (name, pv) = split_platform(p);
                            (Some(name), pv)
                        }
                        None => (None, None),
                    };
                    (FrameworkFamily::Net, version, platform, platform_version)
                })
            } else if platform_part.is_none() {
                parse_digits(version_part)
                    .map(|version| (FrameworkFamily::NetFramework, version, None, None))
            } else {
                None
            }
        } else {
            None
        };

        match parsed {
            Some((family, version, platform, platform_version)) => Ok(Self {
                family,
                version,
                platform,
                platform_version,
                raw: moniker,
            }),
            // Unknown monikers stay usable for exact matching.
            None => Ok(Self {
                family: FrameworkFamily::Other(moniker.clone()),
                version: (0, 0, 0),
                platform: None,
                platform_version: None,
                raw: moniker,
            }),
        }
    }
}

impl fmt::Display for TargetFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl serde::Serialize for TargetFramework {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> serde::Deserialize<'de> for TargetFramework {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
