//! CLI command implementations.

pub mod cache;
pub mod clean;
pub mod create;
pub mod doctor;
pub mod inspect;
pub mod package;
pub mod package_id;
pub mod validate;

use hdrpack_recipe::EnvironmentDescriptor;

/// One-line summary of an environment, e.g. `gcc-12 C++20 Linux/x86_64 Release`.
pub fn describe_env(env: &EnvironmentDescriptor) -> String {
    let mut parts = vec![format!("{}-{}", env.compiler, env.compiler_version)];
    if let Some(cppstd) = env.cppstd {
        parts.push(format!("C++{cppstd}"));
    }
    parts.push(format!("{}/{}", env.os, env.arch));
    if let Some(build_type) = &env.build_type {
        parts.push(build_type.clone());
    }
    parts.join(" ")
}
