//! Version parsing, ordering and range matching.
//!
//! Versions reported by package managers are rarely strict semver: they carry
//! a leading `v`, omit the patch component, or trail extra text. [`Version::parse`]
//! accepts `[v]MAJOR[.MINOR[.PATCH]][-PRERELEASE][+BUILD]` and ignores anything
//! after that, while ordering follows semver precedence rules.

use crate::error::{InstallError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[vV]?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:-([^+\s]+))?(?:\+(\S+))?")
        .expect("version pattern is valid")
});

/// A parsed version.
///
/// `raw` keeps the text exactly as it was given and is only used for display.
/// Equality and ordering look at the numeric components and the prerelease;
/// build metadata never affects precedence.
#[derive(Debug, Clone, Default)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: String,
    pub build: String,
    pub raw: String,
}

impl Version {
    /// Parse a version string.
    ///
    /// # Examples
    ///
    /// ```
    /// use agent_manager::version::Version;
    ///
    /// let v = Version::parse("v1.2.3-alpha.1+build.456").unwrap();
    /// assert_eq!((v.major, v.minor, v.patch), (1, 2, 3));
    /// assert_eq!(v.prerelease, "alpha.1");
    /// assert_eq!(v.build, "build.456");
    /// assert_eq!(v.raw, "v1.2.3-alpha.1+build.456");
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let caps = VERSION_RE
            .captures(text.trim())
            .ok_or_else(|| InstallError::InvalidVersionFormat(text.to_string()))?;

        let number = |idx: usize| -> Result<u64> {
            match caps.get(idx) {
                Some(m) => m
                    .as_str()
                    .parse()
                    .map_err(|_| InstallError::InvalidVersionFormat(text.to_string())),
                None => Ok(0),
            }
        };
        let text_of = |idx: usize| caps.get(idx).map(|m| m.as_str().to_string()).unwrap_or_default();

        Ok(Self {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            prerelease: text_of(4),
            build: text_of(5),
            raw: text.to_string(),
        })
    }

    /// Parse a version that is known to be valid.
    ///
    /// # Panics
    ///
    /// Panics if `text` is not a valid version. Only use this with literals.
    pub fn must_parse(text: &str) -> Self {
        match Self::parse(text) {
            Ok(v) => v,
            Err(e) => panic!("{}", e),
        }
    }

    /// A version reading that exists but could not be parsed.
    pub fn unparsed(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            ..Self::default()
        }
    }

    /// True only when every field is empty, including `raw`.
    pub fn is_zero(&self) -> bool {
        self.major == 0
            && self.minor == 0
            && self.patch == 0
            && self.prerelease.is_empty()
            && self.build.is_empty()
            && self.raw.is_empty()
    }

    pub fn is_prerelease(&self) -> bool {
        !self.prerelease.is_empty()
    }

    /// Three-way comparison by semver precedence.
    pub fn compare(&self, other: &Version) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| compare_prerelease(&self.prerelease, &other.prerelease))
    }

    pub fn is_newer_than(&self, other: &Version) -> bool {
        self.compare(other) == Ordering::Greater
    }

    pub fn is_older_than(&self, other: &Version) -> bool {
        self.compare(other) == Ordering::Less
    }

    pub fn equals(&self, other: &Version) -> bool {
        self.compare(other) == Ordering::Equal
    }

    /// `MAJOR.MINOR.PATCH[-PRERELEASE][+BUILD]`, ignoring `raw`.
    pub fn canonical(&self) -> String {
        let mut s = format!("{}.{}.{}", self.major, self.minor, self.patch);
        if !self.prerelease.is_empty() {
            s.push('-');
            s.push_str(&self.prerelease);
        }
        if !self.build.is_empty() {
            s.push('+');
            s.push_str(&self.build);
        }
        s
    }

    /// Number of numeric components spelled out in `raw` (1 to 3).
    ///
    /// Versions built without raw text count as fully specified.
    fn precision(&self) -> usize {
        match VERSION_RE.captures(self.raw.trim()) {
            Some(caps) => 1 + usize::from(caps.get(2).is_some()) + usize::from(caps.get(3).is_some()),
            None => 3,
        }
    }
}

fn compare_prerelease(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        // A release outranks any prerelease of the same core version
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        // Numeric parts hash by value so `rc.01` and `rc.1` agree with `Eq`
        for part in self.prerelease.split('.') {
            match part.parse::<u64>() {
                Ok(n) => n.hash(state),
                Err(_) => part.hash(state),
            }
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.raw.is_empty() {
            write!(f, "{}", self.canonical())
        } else {
            write!(f, "{}", self.raw)
        }
    }
}

impl FromStr for Version {
    type Err = InstallError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.is_zero() {
            serializer.serialize_str("")
        } else {
            serializer.collect_str(self)
        }
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self::parse(&s).unwrap_or_else(|_| Self::unparsed(s)))
    }
}

impl TryFrom<&Version> for semver::Version {
    type Error = InstallError;

    fn try_from(v: &Version) -> Result<Self> {
        let invalid = |_| InstallError::InvalidVersionFormat(v.to_string());
        let pre = if v.prerelease.is_empty() {
            semver::Prerelease::EMPTY
        } else {
            semver::Prerelease::new(&v.prerelease).map_err(invalid)?
        };
        let build = if v.build.is_empty() {
            semver::BuildMetadata::EMPTY
        } else {
            semver::BuildMetadata::new(&v.build).map_err(invalid)?
        };
        Ok(semver::Version {
            major: v.major,
            minor: v.minor,
            patch: v.patch,
            pre,
            build,
        })
    }
}

impl From<semver::Version> for Version {
    fn from(v: semver::Version) -> Self {
        Self {
            major: v.major,
            minor: v.minor,
            patch: v.patch,
            prerelease: v.pre.to_string(),
            build: v.build.to_string(),
            raw: v.to_string(),
        }
    }
}

/// Inclusive version range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRange {
    pub from: Version,
    pub to: Version,
}

impl VersionRange {
    pub fn new(from: Version, to: Version) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, v: &Version) -> bool {
        self.from.compare(v) != Ordering::Greater && v.compare(&self.to) != Ordering::Greater
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Tilde,
    Caret,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Tilde => "~",
            Operator::Caret => "^",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = InstallError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "=" | "==" => Ok(Operator::Eq),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Gte),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Lte),
            "~" => Ok(Operator::Tilde),
            "^" => Ok(Operator::Caret),
            other => Err(InstallError::InvalidVersionFormat(format!(
                "unknown constraint operator {:?}",
                other
            ))),
        }
    }
}

/// A single-operator version predicate such as `>=1.2.0` or `^0.3`.
///
/// Components left out of a tilde or caret constraint act as wildcards:
/// `~1.2` accepts any `1.2.x` and `~1` any `1.x.y`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    pub operator: Operator,
    pub version: Version,
}

impl VersionConstraint {
    pub fn new(operator: Operator, version: Version) -> Self {
        Self { operator, version }
    }

    /// Parse `OP VERSION`; a bare version means `=`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let split = text
            .find(|c: char| !matches!(c, '=' | '>' | '<' | '~' | '^'))
            .unwrap_or(text.len());
        let (op, rest) = text.split_at(split);
        let operator = if op.is_empty() {
            Operator::Eq
        } else {
            op.parse()?
        };
        Ok(Self {
            operator,
            version: Version::parse(rest.trim())?,
        })
    }

    pub fn matches(&self, v: &Version) -> bool {
        let c = &self.version;
        let ord = v.compare(c);
        match self.operator {
            Operator::Eq => ord == Ordering::Equal,
            Operator::Gt => ord == Ordering::Greater,
            Operator::Gte => ord != Ordering::Less,
            Operator::Lt => ord == Ordering::Less,
            Operator::Lte => ord != Ordering::Greater,
            Operator::Tilde => match c.precision() {
                1 => v.major == c.major,
                2 => v.major == c.major && v.minor == c.minor,
                _ => v.major == c.major && v.minor == c.minor && v.patch >= c.patch,
            },
            Operator::Caret if c.major != 0 => v.major == c.major && ord != Ordering::Less,
            // 0.x is unstable: only patch bumps are compatible
            Operator::Caret => match c.precision() {
                1 => v.major == 0,
                2 => v.major == 0 && v.minor == c.minor,
                _ => v.major == 0 && v.minor == c.minor && v.patch >= c.patch,
            },
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator, self.version)
    }
}

impl FromStr for VersionConstraint {
    type Err = InstallError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::must_parse(s)
    }

    fn constraint(op: Operator, s: &str) -> VersionConstraint {
        VersionConstraint::new(op, v(s))
    }

    #[test]
    fn test_parse_full() {
        let parsed = v("1.2.3");
        assert_eq!((parsed.major, parsed.minor, parsed.patch), (1, 2, 3));
        assert_eq!(parsed.raw, "1.2.3");
        assert!(parsed.prerelease.is_empty());
    }

    #[test]
    fn test_parse_leading_v_kept_in_raw() {
        let parsed = v("v1.2.3");
        assert_eq!((parsed.major, parsed.minor, parsed.patch), (1, 2, 3));
        assert_eq!(parsed.raw, "v1.2.3");

        let upper = v("V2.0");
        assert_eq!((upper.major, upper.minor, upper.patch), (2, 0, 0));
    }

    #[test]
    fn test_parse_missing_components_default_to_zero() {
        let parsed = v("1");
        assert_eq!((parsed.major, parsed.minor, parsed.patch), (1, 0, 0));

        let parsed = v("4.7");
        assert_eq!((parsed.major, parsed.minor, parsed.patch), (4, 7, 0));
    }

    #[test]
    fn test_parse_prerelease_and_build() {
        let parsed = v("1.2.3-alpha.1+build.456");
        assert_eq!(parsed.prerelease, "alpha.1");
        assert_eq!(parsed.build, "build.456");

        let build_only = v("1.0.0+20240101");
        assert!(build_only.prerelease.is_empty());
        assert_eq!(build_only.build, "20240101");
    }

    #[test]
    fn test_parse_ignores_trailing_text() {
        let parsed = v("2.0.0,");
        assert_eq!((parsed.major, parsed.minor, parsed.patch), (2, 0, 0));

        let four = v("1.2.3.4");
        assert_eq!((four.major, four.minor, four.patch), (1, 2, 3));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Version::parse(""),
            Err(InstallError::InvalidVersionFormat(_))
        ));
        assert!(Version::parse("   ").is_err());
        assert!(Version::parse("unknown").is_err());
        assert!(Version::parse("version 1.0").is_err());
        assert!(Version::parse("99999999999999999999999").is_err());
    }

    #[test]
    #[should_panic]
    fn test_must_parse_panics() {
        Version::must_parse("not-a-version");
    }

    #[test]
    fn test_compare_numeric_components() {
        assert_eq!(v("1.2.3").compare(&v("1.2.4")), Ordering::Less);
        assert_eq!(v("1.10.0").compare(&v("1.9.9")), Ordering::Greater);
        assert_eq!(v("2.0.0").compare(&v("10.0.0")), Ordering::Less);
        assert_eq!(v("v1.2.3").compare(&v("1.2.3")), Ordering::Equal);
    }

    #[test]
    fn test_compare_prerelease_precedence() {
        assert_eq!(v("1.0.0-alpha").compare(&v("1.0.0")), Ordering::Less);
        assert_eq!(v("1.0.0-alpha").compare(&v("1.0.0-beta")), Ordering::Less);
        assert_eq!(v("1.0.0-alpha.1").compare(&v("1.0.0-alpha")), Ordering::Greater);
        assert_eq!(v("1.0.0-rc.2").compare(&v("1.0.0-rc.10")), Ordering::Less);
    }

    #[test]
    fn test_compare_ignores_build() {
        assert_eq!(v("1.0.0+a").compare(&v("1.0.0+b")), Ordering::Equal);
    }

    #[test]
    fn test_compare_antisymmetric_and_reflexive() {
        let samples = [
            "0.0.1",
            "1.0.0-alpha",
            "1.0.0-alpha.1",
            "1.0.0-alpha.beta",
            "1.0.0-beta.11",
            "1.0.0-rc.1",
            "1.0.0",
            "1.2",
            "v2.0.0+meta",
        ];
        for a in samples {
            assert_eq!(v(a).compare(&v(a)), Ordering::Equal, "{}", a);
            for b in samples {
                assert_eq!(
                    v(a).compare(&v(b)),
                    v(b).compare(&v(a)).reverse(),
                    "{} vs {}",
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn test_ordering_agrees_with_semver_crate() {
        let samples = [
            "1.0.0-alpha",
            "1.0.0-alpha.1",
            "1.0.0-beta.2",
            "1.0.0-beta.11",
            "1.0.0-rc.1",
            "1.0.0",
            "1.0.1",
        ];
        for a in samples {
            for b in samples {
                let ours = v(a).compare(&v(b));
                let theirs = semver::Version::parse(a)
                    .unwrap()
                    .cmp(&semver::Version::parse(b).unwrap());
                assert_eq!(ours, theirs, "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_semver_conversion() {
        let sv = semver::Version::try_from(&v("v1.2.3-rc.1+sha.5")).unwrap();
        assert_eq!(sv.to_string(), "1.2.3-rc.1+sha.5");

        let back = Version::from(sv);
        assert_eq!(back, v("1.2.3-rc.1"));
        assert_eq!(back.raw, "1.2.3-rc.1+sha.5");
    }

    #[test]
    fn test_helpers() {
        assert!(v("2.0.0").is_newer_than(&v("1.9.9")));
        assert!(v("1.9.9").is_older_than(&v("2.0.0")));
        assert!(v("1.0").equals(&v("1.0.0")));
        assert!(v("1.0.0-beta").is_prerelease());
    }

    #[test]
    fn test_is_zero() {
        assert!(Version::default().is_zero());
        assert!(!Version::unparsed("unknown").is_zero());
        let major_only = Version {
            major: 1,
            ..Version::default()
        };
        assert!(!major_only.is_zero());
        assert!(!v("0.0.0").is_zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(v("v1.2.3").to_string(), "v1.2.3");
        let built = Version {
            major: 3,
            minor: 1,
            prerelease: "beta".to_string(),
            ..Version::default()
        };
        assert_eq!(built.to_string(), "3.1.0-beta");
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&v("v1.4.0")).unwrap();
        assert_eq!(json, "\"v1.4.0\"");

        let parsed: Version = serde_json::from_str("\"2.1.0-rc.1\"").unwrap();
        assert_eq!(parsed, v("2.1.0-rc.1"));

        let zero: Version = serde_json::from_str("\"\"").unwrap();
        assert!(zero.is_zero());
        assert_eq!(serde_json::to_string(&zero).unwrap(), "\"\"");

        let odd: Version = serde_json::from_str("\"unknown\"").unwrap();
        assert!(!odd.is_zero());
        assert_eq!(odd.raw, "unknown");
    }

    #[test]
    fn test_sorting() {
        let mut versions = vec![v("1.0.0"), v("1.0.0-rc.1"), v("0.9.12"), v("1.0.0-alpha")];
        versions.sort();
        let sorted: Vec<String> = versions.iter().map(|x| x.to_string()).collect();
        assert_eq!(sorted, ["0.9.12", "1.0.0-alpha", "1.0.0-rc.1", "1.0.0"]);
    }

    #[test]
    fn test_range_contains_inclusive() {
        let range = VersionRange::new(v("1.0.0"), v("2.0.0"));
        assert!(range.contains(&v("1.0.0")));
        assert!(range.contains(&v("1.5.3")));
        assert!(range.contains(&v("2.0.0")));
        assert!(!range.contains(&v("0.5.0")));
        assert!(!range.contains(&v("2.0.1")));
    }

    #[test]
    fn test_constraint_comparison_operators() {
        assert!(constraint(Operator::Eq, "1.2.3").matches(&v("v1.2.3")));
        assert!(!constraint(Operator::Eq, "1.2.3").matches(&v("1.2.4")));
        assert!(constraint(Operator::Gt, "1.2.3").matches(&v("1.2.4")));
        assert!(!constraint(Operator::Gt, "1.2.3").matches(&v("1.2.3")));
        assert!(constraint(Operator::Gte, "1.2.3").matches(&v("1.2.3")));
        assert!(constraint(Operator::Lt, "1.2.3").matches(&v("1.2.3-rc.1")));
        assert!(constraint(Operator::Lte, "1.2.3").matches(&v("1.2.3")));
        assert!(!constraint(Operator::Lte, "1.2.3").matches(&v("1.3.0")));
    }

    #[test]
    fn test_constraint_tilde() {
        let c = constraint(Operator::Tilde, "1.2.3");
        assert!(c.matches(&v("1.2.3")));
        assert!(c.matches(&v("1.2.9")));
        assert!(!c.matches(&v("1.2.2")));
        assert!(!c.matches(&v("1.3.0")));
        // only the patch number is compared
        assert!(c.matches(&v("1.2.3-rc.1")));
        assert!(!c.matches(&v("1.2.2-rc.1")));
    }

    #[test]
    fn test_constraint_tilde_wildcards() {
        let minor = constraint(Operator::Tilde, "1.2");
        assert!(minor.matches(&v("1.2.0")));
        assert!(minor.matches(&v("1.2.17")));
        assert!(!minor.matches(&v("1.3.0")));

        let major = constraint(Operator::Tilde, "1");
        assert!(major.matches(&v("1.9.4")));
        assert!(!major.matches(&v("2.0.0")));
    }

    #[test]
    fn test_constraint_caret() {
        let c = constraint(Operator::Caret, "1.2.3");
        assert!(c.matches(&v("1.2.3")));
        assert!(c.matches(&v("1.9.0")));
        assert!(!c.matches(&v("1.2.2")));
        assert!(!c.matches(&v("2.0.0")));
    }

    #[test]
    fn test_constraint_caret_zero_major() {
        let c = constraint(Operator::Caret, "0.2.3");
        assert!(c.matches(&v("0.2.5")));
        assert!(!c.matches(&v("0.2.2")));
        assert!(!c.matches(&v("0.3.0")));
        assert!(c.matches(&v("0.2.3-beta")));

        assert!(constraint(Operator::Caret, "0").matches(&v("0.7.1")));
        assert!(constraint(Operator::Caret, "0.2").matches(&v("0.2.9")));
    }

    #[test]
    fn test_hash_agrees_with_eq() {
        use std::collections::HashSet;

        let a = v("1.0.0-rc.01");
        let b = v("1.0.0-rc.1");
        assert_eq!(a, b);

        let set: HashSet<Version> = [a, b, v("1.0.0+build.7"), v("1.0.0")].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_constraint_parse() {
        let c = VersionConstraint::parse(">=1.2.0").unwrap();
        assert_eq!(c.operator, Operator::Gte);
        assert_eq!(c.version, v("1.2.0"));

        let bare: VersionConstraint = "2.0.0".parse().unwrap();
        assert_eq!(bare.operator, Operator::Eq);

        let spaced = VersionConstraint::parse("^ 1.4").unwrap();
        assert_eq!(spaced.operator, Operator::Caret);
        assert_eq!(spaced.to_string(), "^1.4");

        assert!(VersionConstraint::parse("=>1.0").is_err());
        assert!(VersionConstraint::parse(">=").is_err());
    }
}
