//! Compiler and language-standard compatibility checks.
//!
//! Runs before any build step. A failure here means the requested
//! environment can never build the package.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::environment::{CppStd, EnvironmentDescriptor};
use crate::error::ConfigurationError;
use crate::version::CompilerVersion;

/// Minimum compiler version per compiler name.
///
/// Compilers missing from the table are not blocked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinimumVersionTable {
    entries: BTreeMap<String, CompilerVersion>,
}

impl MinimumVersionTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the minimum version for `compiler`.
    pub fn with(mut self, compiler: impl Into<String>, minimum: CompilerVersion) -> Self {
        self.entries.insert(compiler.into(), minimum);
        self
    }

    /// The minimum version for `compiler`, if the table knows it.
    pub fn minimum_for(&self, compiler: &str) -> Option<&CompilerVersion> {
        self.entries.get(compiler)
    }

    /// Iterate entries in compiler-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CompilerVersion)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, CompilerVersion)> for MinimumVersionTable {
    fn from_iter<T: IntoIterator<Item = (String, CompilerVersion)>>(iter: T) -> Self {
        MinimumVersionTable {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Decide whether `env` can build a package needing `required_std`.
pub fn validate(
    env: &EnvironmentDescriptor,
    required_std: CppStd,
    table: &MinimumVersionTable,
) -> Result<(), ConfigurationError> {
    if let Some(declared) = env.cppstd {
        if declared.is_older_than(&required_std) {
            return Err(ConfigurationError::UnsupportedStandard {
                required: required_std.level(),
                actual: declared.level(),
            });
        }
    }

    let Some(minimum) = table.minimum_for(&env.compiler) else {
        tracing::debug!(compiler = %env.compiler, "compiler not in minimum version table");
        return Ok(());
    };

    if env.compiler_version.lazy_lt(minimum) {
        return Err(ConfigurationError::UnsupportedCompilerVersion {
            compiler: env.compiler.clone(),
            version: env.compiler_version.to_string(),
            minimum: minimum.to_string(),
            required_std: required_std.level(),
        });
    }

    tracing::debug!(
        compiler = %env.compiler,
        version = %env.compiler_version,
        minimum = %minimum,
        "compiler version accepted"
    );
    Ok(())
}
