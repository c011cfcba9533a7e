//! Compiler version strings and tool version requirements.
//!
//! Compiler versions are dot-separated integers compared lazily: only the
//! overlapping prefix of the two sequences takes part, so `11` equals
//! `11.3.0`. Package and tool versions are full semantic versions and go
//! through the `semver` crate instead.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RecipeError, Result};

/// A parsed semantic version.
pub type Version = semver::Version;

/// A version requirement (range expression).
pub type VersionReq = semver::VersionReq;

/// A dot-separated sequence of non-negative integers, e.g. `14.0.0`.
///
/// Deliberately not `Ord`: lazy comparison is not transitive across
/// different lengths (`11.2 == 11`, `11 == 11.5`, but `11.2 < 11.5`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompilerVersion {
    raw: String,
    components: Vec<u64>,
}

impl CompilerVersion {
    /// Parse a version such as `"11"` or `"14.0.0"`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RecipeError::InvalidVersion {
                input: input.to_string(),
                detail: "empty version".to_string(),
            });
        }

        let components = trimmed
            .split('.')
            .map(|part| {
                part.parse::<u64>().map_err(|e| RecipeError::InvalidVersion {
                    input: input.to_string(),
                    detail: format!("component '{part}': {e}"),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CompilerVersion {
            raw: trimmed.to_string(),
            components,
        })
    }

    /// The numeric components.
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// The version as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Compare over the first `min(len(a), len(b))` components only.
    pub fn lazy_cmp(&self, other: &CompilerVersion) -> Ordering {
        let len = self.components.len().min(other.components.len());
        self.components[..len].cmp(&other.components[..len])
    }

    /// Whether `self` is strictly older than `other` under lazy comparison.
    pub fn lazy_lt(&self, other: &CompilerVersion) -> bool {
        self.lazy_cmp(other) == Ordering::Less
    }
}

impl FromStr for CompilerVersion {
    type Err = RecipeError;

    fn from_str(s: &str) -> Result<Self> {
        CompilerVersion::parse(s)
    }
}

impl TryFrom<String> for CompilerVersion {
    type Error = RecipeError;

    fn try_from(value: String) -> Result<Self> {
        CompilerVersion::parse(&value)
    }
}

impl From<CompilerVersion> for String {
    fn from(value: CompilerVersion) -> Self {
        value.raw
    }
}

impl fmt::Display for CompilerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Lazy less-than over two version strings.
pub fn lazy_lt(a: &str, b: &str) -> Result<bool> {
    Ok(CompilerVersion::parse(a)?.lazy_lt(&CompilerVersion::parse(b)?))
}

/// Parse a version string like "1.2.3".
pub fn parse_version(s: &str) -> std::result::Result<Version, semver::Error> {
    Version::parse(s)
}

/// Parse a version requirement string like ">=0.1.0".
pub fn parse_requirement(s: &str) -> std::result::Result<VersionReq, semver::Error> {
    VersionReq::parse(s)
}

/// The version of this tool, as compiled.
pub fn tool_version() -> Version {
    Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or_else(|_| Version::new(0, 0, 0))
}

/// Fail unless `running` satisfies the recipe's tool requirement.
pub fn check_tool_version(requirement: &str, running: &Version) -> Result<()> {
    let req = parse_requirement(requirement)?;
    if req.matches(running) {
        Ok(())
    } else {
        Err(RecipeError::UnsupportedTool {
            required: requirement.to_string(),
            running: running.to_string(),
        })
    }
}
