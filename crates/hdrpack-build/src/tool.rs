//! Build-tool invocation.
//!
//! The `BuildTool` trait abstracts the external build system. `CMake` drives
//! the `cmake` executable; tests substitute an in-memory fake.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use hdrpack_recipe::{EnvironmentDescriptor, Recipe};

use crate::error::{BuildError, Result};

/// Cache variable enabling sanitizer instrumentation in the test build.
pub const ENABLE_ASAN: &str = "ENABLE_ASAN";

/// A configuration value passed to the build tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Text(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(true) => f.write_str("ON"),
            OptionValue::Bool(false) => f.write_str("OFF"),
            OptionValue::Text(s) => f.write_str(s),
        }
    }
}

/// Everything needed to configure one build.
#[derive(Debug, Clone)]
pub struct ConfigureRequest {
    /// Folder holding the build script.
    pub source_dir: PathBuf,
    /// Folder the build writes into.
    pub build_dir: PathBuf,
    /// Build type, when the environment names one.
    pub build_type: Option<String>,
    /// Named configuration options.
    pub options: BTreeMap<String, OptionValue>,
}

/// Abstract build system.
pub trait BuildTool {
    /// Generate the build files.
    fn configure(&self, request: &ConfigureRequest) -> Result<()>;

    /// Compile everything configured in `build_dir`.
    fn build(&self, request: &ConfigureRequest) -> Result<()>;

    /// Folder the built executables land in.
    fn bin_dir(&self, request: &ConfigureRequest) -> PathBuf {
        request.build_dir.clone()
    }
}

/// Options the test build is configured with.
///
/// Sanitizers are enabled everywhere except Windows, and only when the
/// recipe asks for them. Recipe variables come first so they cannot
/// override `ENABLE_ASAN`.
pub fn build_options(recipe: &Recipe, env: &EnvironmentDescriptor) -> BTreeMap<String, OptionValue> {
    let mut options: BTreeMap<String, OptionValue> = recipe
        .build
        .variables
        .iter()
        .map(|(k, v)| (k.clone(), OptionValue::Text(v.clone())))
        .collect();
    options.insert(
        ENABLE_ASAN.to_string(),
        OptionValue::Bool(recipe.build.asan && !env.is_windows()),
    );
    options
}

/// The `cmake` command-line build tool.
#[derive(Debug, Clone)]
pub struct CMake {
    program: PathBuf,
}

impl Default for CMake {
    fn default() -> Self {
        CMake {
            program: PathBuf::from("cmake"),
        }
    }
}

impl CMake {
    /// Use a specific `cmake` executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        CMake {
            program: program.into(),
        }
    }

    /// Arguments for the configure step.
    pub fn configure_args(request: &ConfigureRequest) -> Vec<String> {
        let mut args = vec![
            "-S".to_string(),
            request.source_dir.display().to_string(),
            "-B".to_string(),
            request.build_dir.display().to_string(),
        ];
        if let Some(build_type) = &request.build_type {
            args.push(format!("-DCMAKE_BUILD_TYPE={build_type}"));
        }
        for (name, value) in &request.options {
            args.push(format!("-D{name}={value}"));
        }
        args
    }

    /// Arguments for the build step.
    pub fn build_args(request: &ConfigureRequest) -> Vec<String> {
        let mut args = vec!["--build".to_string(), request.build_dir.display().to_string()];
        if let Some(build_type) = &request.build_type {
            args.push("--config".to_string());
            args.push(build_type.clone());
        }
        args
    }

    fn run(&self, step: &str, args: &[String]) -> Result<()> {
        tracing::info!(program = %self.program.display(), ?args, "{step}");
        let status = Command::new(&self.program)
            .args(args)
            .status()
            .map_err(|source| BuildError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(BuildError::BuildFailure {
                step: step.to_string(),
                code: status.code(),
            })
        }
    }
}

impl BuildTool for CMake {
    fn configure(&self, request: &ConfigureRequest) -> Result<()> {
        self.run("cmake configure", &Self::configure_args(request))
    }

    fn build(&self, request: &ConfigureRequest) -> Result<()> {
        self.run("cmake build", &Self::build_args(request))
    }

    fn bin_dir(&self, request: &ConfigureRequest) -> PathBuf {
        config_bin_dir(&request.build_dir, request.build_type.as_deref())
    }
}

/// Where executables land for a build type.
///
/// Multi-config generators (Visual Studio, Xcode, Ninja Multi-Config) write
/// into `<build_dir>/<build_type>/`; single-config generators write into
/// `build_dir` itself.
pub fn config_bin_dir(build_dir: &Path, build_type: Option<&str>) -> PathBuf {
    match build_type {
        Some(build_type) if build_dir.join(build_type).is_dir() => build_dir.join(build_type),
        _ => build_dir.to_path_buf(),
    }
}

/// Build-script folder for a recipe rooted at `source_root`.
pub fn script_dir(recipe: &Recipe, source_root: &Path) -> PathBuf {
    source_root.join(&recipe.build.script_folder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdrpack_recipe::CompilerVersion;

    fn recipe(extra: &str) -> Recipe {
        Recipe::parse(&format!(
            "[package]\nname = \"libhal\"\nversion = \"1.1.0\"\n[compatibility]\nmin_cppstd = \"20\"\n{extra}"
        ))
        .unwrap()
    }

    fn env(os: &str) -> EnvironmentDescriptor {
        EnvironmentDescriptor {
            compiler: "gcc".to_string(),
            compiler_version: CompilerVersion::parse("12").unwrap(),
            cppstd: None,
            os: os.to_string(),
            arch: "x86_64".to_string(),
            build_type: Some("Release".to_string()),
        }
    }

    #[test]
    fn asan_enabled_except_on_windows() {
        let r = recipe("");
        for os in ["Linux", "Macos", "FreeBSD", "baremetal"] {
            assert_eq!(build_options(&r, &env(os))[ENABLE_ASAN], OptionValue::Bool(true), "{os}");
        }
        assert_eq!(build_options(&r, &env("Windows"))[ENABLE_ASAN], OptionValue::Bool(false));
    }

    #[test]
    fn recipe_can_opt_out_of_asan() {
        let r = recipe("[build]\nasan = false\n");
        assert_eq!(build_options(&r, &env("Linux"))[ENABLE_ASAN], OptionValue::Bool(false));
    }

    #[test]
    fn recipe_variables_cannot_override_asan() {
        let r = recipe("[build.variables]\nENABLE_ASAN = \"OFF\"\nWARNINGS_AS_ERRORS = \"ON\"\n");
        let options = build_options(&r, &env("Linux"));
        assert_eq!(options[ENABLE_ASAN], OptionValue::Bool(true));
        assert_eq!(options["WARNINGS_AS_ERRORS"], OptionValue::Text("ON".to_string()));
    }

    #[test]
    fn cmake_arguments() {
        let mut options = BTreeMap::new();
        options.insert(ENABLE_ASAN.to_string(), OptionValue::Bool(true));
        let request = ConfigureRequest {
            source_dir: PathBuf::from("src/tests"),
            build_dir: PathBuf::from("build"),
            build_type: Some("Release".to_string()),
            options,
        };

        assert_eq!(
            CMake::configure_args(&request),
            vec!["-S", "src/tests", "-B", "build", "-DCMAKE_BUILD_TYPE=Release", "-DENABLE_ASAN=ON"]
        );
        assert_eq!(CMake::build_args(&request), vec!["--build", "build", "--config", "Release"]);
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let cmake = CMake::with_program("/nonexistent/hdrpack-cmake");
        let request = ConfigureRequest {
            source_dir: PathBuf::from("."),
            build_dir: PathBuf::from("build"),
            build_type: None,
            options: BTreeMap::new(),
        };
        assert!(matches!(cmake.configure(&request), Err(BuildError::Spawn { .. })));
    }

    #[test]
    fn multi_config_output_goes_under_build_type() {
        let build = tempfile::tempdir().unwrap();
        let mut request = ConfigureRequest {
            source_dir: PathBuf::from("tests"),
            build_dir: build.path().to_path_buf(),
            build_type: Some("Release".to_string()),
            options: BTreeMap::new(),
        };
        let cmake = CMake::default();

        assert_eq!(cmake.bin_dir(&request), build.path());

        std::fs::create_dir(build.path().join("Release")).unwrap();
        assert_eq!(cmake.bin_dir(&request), build.path().join("Release"));

        request.build_type = None;
        assert_eq!(cmake.bin_dir(&request), build.path());
    }

    #[test]
    fn script_dir_defaults_to_tests() {
        assert_eq!(script_dir(&recipe(""), Path::new("/src")), PathBuf::from("/src/tests"));
    }
}
