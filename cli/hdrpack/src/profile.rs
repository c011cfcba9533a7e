//! Environment selection: profile file plus command-line overrides.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use hdrpack_recipe::environment::host_platform;
use hdrpack_recipe::{CompilerVersion, CppStd, EnvironmentDescriptor, Profile};

/// Flags describing the target environment.
#[derive(Args, Debug, Clone, Default)]
pub struct EnvArgs {
    /// Profile file describing the environment
    #[arg(long, short = 'p')]
    pub profile: Option<PathBuf>,
    /// Compiler name (e.g., gcc, clang, apple-clang, msvc)
    #[arg(long)]
    pub compiler: Option<String>,
    /// Compiler version (e.g., 12, 14.0.0)
    #[arg(long)]
    pub compiler_version: Option<String>,
    /// Language standard (e.g., 17, 20, gnu20)
    #[arg(long)]
    pub cppstd: Option<String>,
    /// Target operating system (default: host)
    #[arg(long)]
    pub os: Option<String>,
    /// Target architecture (default: host)
    #[arg(long)]
    pub arch: Option<String>,
    /// Build type (e.g., Release, Debug)
    #[arg(long)]
    pub build_type: Option<String>,
}

/// The resolved environment and tool configuration.
#[derive(Debug, Clone)]
pub struct Selection {
    pub env: EnvironmentDescriptor,
    pub skip_test: bool,
}

impl EnvArgs {
    /// Load the profile (if any) relative to `cwd` and apply the overrides.
    pub fn resolve(&self, cwd: &Path) -> Result<Selection> {
        let profile = match &self.profile {
            Some(path) => {
                let path = cwd.join(path);
                Some(
                    Profile::load(&path)
                        .with_context(|| format!("loading profile {}", path.display()))?,
                )
            }
            None => None,
        };

        let skip_test = profile.as_ref().is_some_and(|p| p.conf.skip_test);
        let base = profile.map(|p| p.environment());
        Ok(Selection {
            env: self.apply(base)?,
            skip_test,
        })
    }

    fn apply(&self, base: Option<EnvironmentDescriptor>) -> Result<EnvironmentDescriptor> {
        let (host_os, host_arch) = host_platform();

        let compiler = match (&self.compiler, &base) {
            (Some(c), _) => c.clone(),
            (None, Some(b)) => b.compiler.clone(),
            (None, None) => bail!("no compiler given: pass --profile or --compiler"),
        };

        let compiler_version = match (&self.compiler_version, &base) {
            (Some(v), _) => CompilerVersion::parse(v)?,
            (None, Some(b)) => b.compiler_version.clone(),
            (None, None) => bail!("no compiler version given: pass --profile or --compiler-version"),
        };

        let cppstd = match &self.cppstd {
            Some(s) => Some(CppStd::parse(s)?),
            None => base.as_ref().and_then(|b| b.cppstd),
        };

        let os = self
            .os
            .clone()
            .or_else(|| base.as_ref().map(|b| b.os.clone()))
            .unwrap_or_else(|| host_os.to_string());
        let arch = self
            .arch
            .clone()
            .or_else(|| base.as_ref().map(|b| b.arch.clone()))
            .unwrap_or_else(|| host_arch.to_string());
        let build_type = self
            .build_type
            .clone()
            .or_else(|| base.as_ref().and_then(|b| b.build_type.clone()));

        Ok(EnvironmentDescriptor {
            compiler,
            compiler_version,
            cppstd,
            os,
            arch,
            build_type,
        })
    }
}
