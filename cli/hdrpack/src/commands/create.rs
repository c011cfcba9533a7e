//! `hdrpack create`: validate, build and test, package into the cache.

use std::path::Path;

use anyhow::{Context, Result};

use hdrpack_build::{create, CMake, CreateRequest, ProcessRunner, TestStatus};
use hdrpack_recipe::{tool_version, PackageCache, Recipe};

use super::describe_env;
use crate::profile::Selection;

/// Run the create pipeline with the real CMake and process runner.
pub fn run(
    recipe: &Recipe,
    project_dir: &Path,
    build_dir: &Path,
    selection: &Selection,
    cache: &PackageCache,
    skip_test: bool,
    force: bool,
) -> Result<()> {
    let version = tool_version();
    let request = CreateRequest {
        recipe,
        env: &selection.env,
        source_dir: project_dir,
        build_dir,
        skip_test,
        force,
        tool_version: &version,
    };

    let outcome = create(&request, cache, &CMake::default(), &ProcessRunner)
        .with_context(|| format!("creating {}", recipe.reference()))?;

    println!("{} for {}", recipe.reference(), describe_env(&selection.env));
    println!("  Package ID: {}", outcome.identity);
    println!("  Folder:     {}", outcome.package_dir.display());
    if outcome.cache_hit {
        println!("  Status:     already cached (use --force to rebuild)");
    } else {
        let tests = match outcome.tests {
            TestStatus::Passed => "passed",
            TestStatus::BuiltOnly => "built, not run (cross-building)",
            TestStatus::Skipped => "skipped",
            TestStatus::NotRun => "not run",
        };
        println!("  Tests:      {tests}");
    }
    Ok(())
}
