//! Build and test error types.

use hdrpack_recipe::RecipeError;

/// Errors surfaced from the build pipeline.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The recipe, profile or environment was rejected.
    #[error(transparent)]
    Recipe(#[from] RecipeError),

    /// The build tool exited unsuccessfully.
    #[error("{step} failed{}", exit_suffix(.code))]
    BuildFailure { step: String, code: Option<i32> },

    /// The unit-test executable exited unsuccessfully.
    #[error("test executable {executable} failed{}", exit_suffix(.code))]
    TestFailure { executable: String, code: Option<i32> },

    /// A child process could not be started.
    #[error("could not run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// The exit code of the failed child process, if one ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            BuildError::BuildFailure { code, .. } | BuildError::TestFailure { code, .. } => *code,
            _ => None,
        }
    }
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {code}"),
        None => " (terminated by signal)".to_string(),
    }
}

/// Result type alias for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;
