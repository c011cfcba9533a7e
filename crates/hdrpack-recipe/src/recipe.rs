//! `hdrpack.toml` recipe parsing.
//!
//! A recipe names the package, the oldest language standard and compilers it
//! supports, the dependencies it declares, how its unit tests are built, and
//! which files end up in the package.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compat::MinimumVersionTable;
use crate::environment::CppStd;
use crate::error::{RecipeError, Result};
use crate::identity::ArtifactKind;
use crate::version::{self, Version};

/// File name searched for by [`Recipe::find_and_load`].
pub const RECIPE_FILE: &str = "hdrpack.toml";

/// A complete package recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Requirement on the hdrpack version able to process this recipe.
    #[serde(default)]
    pub required_hdrpack_version: Option<String>,
    /// Package metadata (required).
    pub package: PackageMetadata,
    /// Standard and compiler requirements.
    pub compatibility: Compatibility,
    /// Runtime dependencies, name → version.
    #[serde(default)]
    pub requires: BTreeMap<String, String>,
    /// Dependencies needed only by the unit tests.
    #[serde(default)]
    pub test_requires: BTreeMap<String, String>,
    /// Unit-test build settings.
    #[serde(default)]
    pub build: BuildSection,
    /// Files copied into the package.
    #[serde(default)]
    pub layout: LayoutSection,
}

/// Core package metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Package name.
    pub name: String,
    /// Semantic version.
    pub version: String,
    /// License identifier (SPDX).
    #[serde(default)]
    pub license: Option<String>,
    /// Recipe repository URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Project homepage.
    #[serde(default)]
    pub homepage: Option<String>,
    /// Short description.
    #[serde(default)]
    pub description: Option<String>,
    /// Search topics.
    #[serde(default)]
    pub topics: Vec<String>,
    /// Whether the package is declarations only.
    #[serde(default = "default_true")]
    pub header_only: bool,
    /// Source globs exported alongside the recipe.
    #[serde(default)]
    pub exports_sources: Vec<String>,
}

/// The `[compatibility]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Compatibility {
    /// Oldest language standard the headers compile under.
    pub min_cppstd: CppStd,
    /// Oldest compiler versions implementing `min_cppstd`.
    #[serde(default)]
    pub compilers_minimum_version: MinimumVersionTable,
}

/// The `[build]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSection {
    /// Folder holding the test build script, relative to the source root.
    #[serde(default = "default_script_folder")]
    pub script_folder: String,
    /// Unit-test executable produced by the build.
    #[serde(default = "default_test_executable")]
    pub test_executable: String,
    /// Instrument the test build with sanitizers where supported.
    #[serde(default = "default_true")]
    pub asan: bool,
    /// Extra cache variables passed to the build tool.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl Default for BuildSection {
    fn default() -> Self {
        BuildSection {
            script_folder: default_script_folder(),
            test_executable: default_test_executable(),
            asan: true,
            variables: BTreeMap::new(),
        }
    }
}

/// The `[layout]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutSection {
    /// Folder holding the public headers, relative to the source root.
    #[serde(default = "default_include_dir")]
    pub include_dir: String,
    /// Header patterns copied into `include/`, structure preserved.
    #[serde(default = "default_header_patterns")]
    pub headers: Vec<String>,
    /// License patterns copied flat into `licenses/`.
    #[serde(default = "default_license_patterns")]
    pub licenses: Vec<String>,
}

impl Default for LayoutSection {
    fn default() -> Self {
        LayoutSection {
            include_dir: default_include_dir(),
            headers: default_header_patterns(),
            licenses: default_license_patterns(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_script_folder() -> String {
    "tests".to_string()
}

fn default_test_executable() -> String {
    "unit_test".to_string()
}

fn default_include_dir() -> String {
    "include".to_string()
}

fn default_header_patterns() -> Vec<String> {
    vec!["*.h".to_string(), "*.hpp".to_string()]
}

fn default_license_patterns() -> Vec<String> {
    vec!["*LICENSE*".to_string()]
}

/// Whether `name` can be a package name: lowercase alphanumerics and
/// `_.+-`, never `.` or `..`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_.+-".contains(c))
}

/// Reject absolute paths and `..` components in a source-relative field.
fn check_relative(field: &str, value: &str) -> Result<()> {
    let path = Path::new(value);
    let escapes = path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if value.is_empty() || escapes || value.starts_with(['/', '\\']) {
        return Err(RecipeError::InvalidRecipe {
            detail: format!("{field} '{value}' must be a path inside the source tree"),
        });
    }
    Ok(())
}

impl Recipe {
    /// Parse a recipe from a TOML string.
    pub fn parse(input: &str) -> Result<Self> {
        let recipe: Recipe = toml::from_str(input)?;

        if recipe.package.name.is_empty() {
            return Err(RecipeError::InvalidRecipe {
                detail: "package.name is required".to_string(),
            });
        }

        if !is_valid_name(&recipe.package.name) {
            return Err(RecipeError::InvalidRecipe {
                detail: format!(
                    "package.name '{}' must use only [a-z0-9_.+-] and must not be '.' or '..'",
                    recipe.package.name
                ),
            });
        }

        if recipe.package.version.is_empty() {
            return Err(RecipeError::InvalidRecipe {
                detail: "package.version is required".to_string(),
            });
        }

        version::parse_version(&recipe.package.version)?;

        if let Some(req) = &recipe.required_hdrpack_version {
            version::parse_requirement(req)?;
        }

        check_relative("build.script_folder", &recipe.build.script_folder)?;
        check_relative("layout.include_dir", &recipe.layout.include_dir)?;
        for pattern in &recipe.package.exports_sources {
            check_relative("package.exports_sources", pattern)?;
        }

        Ok(recipe)
    }

    /// Load a recipe from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Search upward from `start_dir` for a recipe file, returning it with
    /// the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(RECIPE_FILE);
            if candidate.is_file() {
                return Ok(Some((Self::load(&candidate)?, dir)));
            }
            if !dir.pop() {
                return Ok(None);
            }
        }
    }

    /// The parsed package version.
    pub fn version(&self) -> Result<Version> {
        Ok(version::parse_version(&self.package.version)?)
    }

    /// `name/version`, as used in cache paths and messages.
    pub fn reference(&self) -> String {
        format!("{}/{}", self.package.name, self.package.version)
    }

    /// How the package's contents depend on the environment.
    pub fn artifact_kind(&self) -> ArtifactKind {
        if self.package.header_only {
            ArtifactKind::HeaderOnly
        } else {
            ArtifactKind::SettingsDependent
        }
    }

    /// Fail unless `running` satisfies `required_hdrpack_version`.
    pub fn check_tool_version(&self, running: &Version) -> Result<()> {
        match &self.required_hdrpack_version {
            Some(req) => version::check_tool_version(req, running),
            None => Ok(()),
        }
    }

    /// Serialize this recipe to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RecipeError::InvalidRecipe {
            detail: format!("failed to serialize: {e}"),
        })
    }
}
