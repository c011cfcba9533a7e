//! Recipe model for header-only C++ packages.
//!
//! Decides whether a target environment can build a package, and reduces the
//! environment to the identity a package cache matches on.
//!
//! # Architecture
//!
//! - **Compatibility**: language-standard and compiler-version checks,
//!   using lazy (prefix-length) version comparison
//! - **Identity**: header-only packages share one identity across every
//!   environment
//! - **Layout**: copying headers and licenses into a package folder
//! - **Cache**: package folders stored by `name/version/identity`
//!
//! Everything here is synchronous. Validation and identity reduction are
//! pure functions of their arguments.

pub mod cache;
pub mod compat;
pub mod environment;
pub mod error;
pub mod identity;
pub mod layout;
pub mod recipe;
pub mod version;

// Re-exports for convenience.
pub use cache::{CacheEntry, PackageCache};
pub use compat::{validate, MinimumVersionTable};
pub use environment::{CppStd, EnvironmentDescriptor, Profile};
pub use error::{ConfigurationError, RecipeError, Result};
pub use identity::{reduce_identity, ArtifactKind, ContentHash, PackageIdentity};
pub use layout::{export_sources, package, PackageInfo, PackagedFiles};
pub use recipe::{is_valid_name, Recipe, RECIPE_FILE};
pub use version::{lazy_lt, tool_version, CompilerVersion, Version, VersionReq};
