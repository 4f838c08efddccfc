//! "MAJOR.MINOR" version values and bump arithmetic.
//!
//! Versions start at `0.0` and the first submission of an item always
//! allocates `0.1`. After that, bumps are explicit: `Minor` increments the
//! minor component, `Major` increments the major component and resets the
//! minor to zero, and `Custom` applies a caller-supplied value verbatim.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

/// A two-component version number.
///
/// Ordering is lexicographic on (major, minor). Serialized as the string
/// `"MAJOR.MINOR"` everywhere it appears (metadata, history, events).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    /// The pre-submission starting version.
    pub const ZERO: Version = Version { major: 0, minor: 0 };

    /// The version allocated on an item's first submission.
    pub const FIRST: Version = Version { major: 0, minor: 1 };

    pub const fn new(major: u32, minor: u32) -> Self {
        Version { major, minor }
    }

    /// Lenient parse: each component reads its leading digits, anything
    /// unparseable counts as zero. `"2.x"` is `2.0`, `""` is `0.0`.
    pub fn parse_lossy(s: &str) -> Self {
        let mut parts = s.splitn(2, '.');
        let major = leading_digits(parts.next().unwrap_or(""));
        let minor = leading_digits(parts.next().unwrap_or(""));
        Version { major, minor }
    }
}

fn leading_digits(s: &str) -> u32 {
    let digits: String = s
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Version::parse_lossy(s))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VersionVisitor;

        impl Visitor<'_> for VersionVisitor {
            type Value = Version;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a \"MAJOR.MINOR\" version string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Version, E> {
                Ok(Version::parse_lossy(v))
            }
        }

        deserializer.deserialize_str(VersionVisitor)
    }
}

// ---------------------------------------------------------------------------
// BumpKind
// ---------------------------------------------------------------------------

/// The requested version bump for a submission or fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BumpKind {
    /// Keep the current version.
    None,
    /// `M.m` -> `M.(m+1)`.
    Minor,
    /// `M.m` -> `(M+1).0`.
    Major,
    /// Apply the given version verbatim. No ordering check is applied;
    /// callers wanting strict monotonicity use [`validate_increases`].
    Custom(Version),
}

impl Default for BumpKind {
    fn default() -> Self {
        BumpKind::None
    }
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

/// Compute the version a bump yields from `current`.
pub fn next_version(current: Version, bump: BumpKind) -> Version {
    match bump {
        BumpKind::None => current,
        BumpKind::Minor => Version::new(current.major, current.minor + 1),
        BumpKind::Major => Version::new(current.major + 1, 0),
        BumpKind::Custom(v) => v,
    }
}

/// Version allocated by a first submission: `0.0` becomes `0.1`; an item
/// that somehow already carries a version keeps it.
pub fn first_submission_version(current: Version) -> Version {
    if current == Version::ZERO {
        Version::FIRST
    } else {
        current
    }
}

/// Strict-mode helper: rejects candidates that do not increase the version.
pub fn validate_increases(current: Version, candidate: Version) -> Result<(), WorkflowError> {
    if candidate > current {
        Ok(())
    } else {
        Err(WorkflowError::Validation(format!(
            "version {candidate} does not increase current version {current}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
