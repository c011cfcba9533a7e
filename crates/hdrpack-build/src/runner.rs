//! Unit-test executable invocation.

use std::path::Path;
use std::process::Command;

use crate::error::{BuildError, Result};

/// Runs a built test executable and reports pass/fail by exit status.
pub trait TestRunner {
    fn run(&self, executable: &Path) -> Result<()>;
}

/// Runs the executable as a child process, inheriting stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl TestRunner for ProcessRunner {
    fn run(&self, executable: &Path) -> Result<()> {
        tracing::info!(executable = %executable.display(), "running unit tests");
        let status = Command::new(executable)
            .status()
            .map_err(|source| BuildError::Spawn {
                program: executable.display().to_string(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(BuildError::TestFailure {
                executable: executable.display().to_string(),
                code: status.code(),
            })
        }
    }
}

/// Platform file name of a test executable.
pub fn executable_name(name: &str) -> String {
    format!("{name}{}", std::env::consts::EXE_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_executable_is_a_spawn_error() {
        let err = ProcessRunner
            .run(Path::new("/nonexistent/unit_test"))
            .unwrap_err();
        assert!(matches!(err, BuildError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_is_propagated() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let pass = dir.path().join("pass.sh");
        let fail = dir.path().join("fail.sh");
        std::fs::write(&pass, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::write(&fail, "#!/bin/sh\nexit 3\n").unwrap();
        for script in [&pass, &fail] {
            std::fs::set_permissions(script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        ProcessRunner.run(&pass).unwrap();
        let err = ProcessRunner.run(&fail).unwrap_err();
        assert_eq!(err.exit_code(), Some(3));
    }

    #[test]
    fn executable_name_has_platform_suffix() {
        let name = executable_name("unit_test");
        assert!(name.starts_with("unit_test"));
        assert_eq!(name.ends_with(".exe"), cfg!(windows));
    }
}
