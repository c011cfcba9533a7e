//! Recipe and configuration error types.

use std::path::PathBuf;

/// A target environment the recipe refuses to build for.
///
/// Raised before any build step runs. Never retryable: the environment has
/// to change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// The declared language standard is older than the recipe requires.
    #[error("requires C++{required}, but the environment declares C++{actual}")]
    UnsupportedStandard { required: String, actual: String },

    /// The compiler is known to the minimum version table and too old.
    #[error(
        "requires C++{required_std}, which your compiler ({compiler}-{version}) does not support \
         (minimum {compiler}-{minimum})"
    )]
    UnsupportedCompilerVersion {
        compiler: String,
        version: String,
        minimum: String,
        required_std: String,
    },
}

/// Errors that can occur while loading recipes, profiles and packages.
#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    /// The environment failed validation.
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A dot-separated compiler version could not be parsed.
    #[error("invalid version '{input}': {detail}")]
    InvalidVersion { input: String, detail: String },

    /// A language standard string could not be parsed.
    #[error("invalid language standard '{0}'")]
    InvalidStandard(String),

    /// Invalid recipe contents.
    #[error("invalid recipe: {detail}")]
    InvalidRecipe { detail: String },

    /// Invalid profile contents.
    #[error("invalid profile: {detail}")]
    InvalidProfile { detail: String },

    /// The running tool does not satisfy the recipe's tool requirement.
    #[error("recipe requires hdrpack {required}, running {running}")]
    UnsupportedTool { required: String, running: String },

    /// A copy pattern was malformed.
    #[error("invalid pattern '{pattern}': {detail}")]
    Pattern { pattern: String, detail: String },

    /// Package folder I/O error.
    #[error("package error at {path}: {detail}")]
    Package { path: PathBuf, detail: String },

    /// Cache I/O error.
    #[error("cache error at {path}: {detail}")]
    CacheError { path: PathBuf, detail: String },

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Semver parse error.
    #[error("invalid version: {0}")]
    Semver(#[from] semver::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for recipe operations.
pub type Result<T> = std::result::Result<T, RecipeError>;
