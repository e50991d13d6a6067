// ─── Java version parsing ───
// `java.version` comes in two shapes: the legacy `1.M.m_U-bB` used through
// Java 8 and the modern `M.m.p[+b]`. Update and build numbers are
// discarded; downstream range checks only see the leading triple.

use std::fmt;

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JavaVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl JavaVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse either version shape. Returns `None` for anything that fits
    /// neither.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.starts_with("1.") {
            Self::parse_legacy(raw)
        } else {
            Self::parse_modern(raw)
        }
    }

    /// `1.M.m_U-bB` — e.g. `1.8.0_352-b08`. The `_U` update and `-bN`
    /// build are dropped.
    pub fn parse_legacy(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix("1.")?;
        let mut parts = rest.splitn(2, '.');
        let major: u64 = parts.next()?.parse().ok()?;

        let tail = parts.next().unwrap_or("0");
        let minor_str: String = tail.chars().take_while(char::is_ascii_digit).collect();
        let minor: u64 = minor_str.parse().ok()?;

        Some(Self::new(major, minor, 0))
    }

    /// `M.m.p[+b]` — e.g. `17.0.5+8`. Also tolerates a trailing
    /// pre-release suffix (`-ea`).
    pub fn parse_modern(raw: &str) -> Option<Self> {
        let core = raw.split(['+', '-']).next()?;

        let mut parts = core.split('.');
        let major: u64 = parts.next()?.parse().ok()?;
        let minor: u64 = parts.next().unwrap_or("0").parse().ok()?;
        let patch: u64 = parts.next().unwrap_or("0").parse().ok()?;
        if parts.next().is_some() {
            return None;
        }

        Some(Self::new(major, minor, patch))
    }

    pub fn to_semver(&self) -> Version {
        Version::new(self.major, self.minor, self.patch)
    }

    pub fn satisfies(&self, range: &VersionReq) -> bool {
        range.matches(&self.to_semver())
    }
}

impl fmt::Display for JavaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl std::str::FromStr for JavaVersion {
    type Err = crate::error::CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw).ok_or_else(|| crate::error::CoreError::UnparseableVersion(raw.to_string()))
    }
}

/// Compare dotted Minecraft versions: is `version` at least `floor`?
/// Missing components count as zero, so `1.13` >= `1.13.0`.
pub fn mc_version_at_least(floor: &str, version: &str) -> bool {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|p| p.parse().unwrap_or(0))
            .collect()
    };
    let floor_parts = parse(floor);
    let version_parts = parse(version);

    let len = floor_parts.len().max(version_parts.len());
    for i in 0..len {
        let f = floor_parts.get(i).copied().unwrap_or(0);
        let v = version_parts.get(i).copied().unwrap_or(0);
        if v != f {
            return v > f;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_legacy_shape() {
        assert_eq!(
            JavaVersion::parse("1.8.0_352-b08"),
            Some(JavaVersion::new(8, 0, 0))
        );
        assert_eq!(
            JavaVersion::parse("1.8.0_292"),
            Some(JavaVersion::new(8, 0, 0))
        );
        // Update and build discarded: different updates compare equal.
        assert_eq!(
            JavaVersion::parse("1.8.0_292"),
            JavaVersion::parse("1.8.0_352")
        );
    }

    #[test]
    fn parses_modern_shape() {
        assert_eq!(
            JavaVersion::parse("17.0.5+8"),
            Some(JavaVersion::new(17, 0, 5))
        );
        assert_eq!(
            JavaVersion::parse("21.0.1"),
            Some(JavaVersion::new(21, 0, 1))
        );
        assert_eq!(JavaVersion::parse("17"), Some(JavaVersion::new(17, 0, 0)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(JavaVersion::parse("not-a-version"), None);
        assert_eq!(JavaVersion::parse(""), None);

        let err = "not-a-version".parse::<JavaVersion>().unwrap_err();
        assert!(matches!(
            err,
            crate::error::CoreError::UnparseableVersion(_)
        ));
    }

    #[test]
    fn stringifies_as_triple() {
        assert_eq!(JavaVersion::new(17, 0, 5).to_string(), "17.0.5");
    }

    #[test]
    fn range_matching_uses_the_triple() {
        let range = VersionReq::parse(">=17, <18").unwrap();
        assert!(JavaVersion::parse("17.0.5+8").unwrap().satisfies(&range));
        assert!(!JavaVersion::parse("21.0.1").unwrap().satisfies(&range));
    }

    #[test]
    fn mc_version_comparison() {
        assert!(mc_version_at_least("1.13", "1.13"));
        assert!(mc_version_at_least("1.13", "1.16.5"));
        assert!(!mc_version_at_least("1.13", "1.12.2"));
        assert!(mc_version_at_least("1.13", "1.13.0"));
    }
}
