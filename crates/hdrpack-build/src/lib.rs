//! External build and test invocation for hdrpack.
//!
//! The build system and the unit-test executable are collaborators behind
//! the `BuildTool` and `TestRunner` traits. Their exit codes are surfaced
//! unchanged through `BuildError`.

pub mod error;
pub mod pipeline;
pub mod runner;
pub mod tool;

pub use error::{BuildError, Result};
pub use pipeline::{
    build_and_test, check, create, CreateOutcome, CreateRequest, TestStatus, EXPORT_FOLDER,
};
pub use runner::{ProcessRunner, TestRunner};
pub use tool::{
    build_options, config_bin_dir, BuildTool, CMake, ConfigureRequest, OptionValue, ENABLE_ASAN,
};
