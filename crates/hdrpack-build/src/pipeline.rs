//! The create pipeline: validate, build and test, package, cache.
//!
//! Validation runs before any external tool is touched. A cache hit on the
//! package identity skips building and packaging entirely.

use std::path::{Path, PathBuf};

use hdrpack_recipe::{
    layout, reduce_identity, validate, EnvironmentDescriptor, PackageCache, PackageIdentity, Recipe,
    Version,
};

use crate::error::Result;

/// Folder under the build folder that exported sources are staged in.
pub const EXPORT_FOLDER: &str = "export";
use crate::runner::{executable_name, TestRunner};
use crate::tool::{build_options, script_dir, BuildTool, ConfigureRequest};

/// One `create` invocation.
#[derive(Debug, Clone)]
pub struct CreateRequest<'a> {
    pub recipe: &'a Recipe,
    pub env: &'a EnvironmentDescriptor,
    /// Root of the recipe's source tree.
    pub source_dir: &'a Path,
    /// Scratch folder for the test build.
    pub build_dir: &'a Path,
    /// Skip building and running the unit tests.
    pub skip_test: bool,
    /// Rebuild even when the cache already holds this identity.
    pub force: bool,
    /// Version of the running tool.
    pub tool_version: &'a Version,
}

/// What happened to the unit tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestStatus {
    Passed,
    /// Built but not executed (cross-building).
    BuiltOnly,
    /// Not built (`skip_test`).
    Skipped,
    /// Not needed (cache hit).
    NotRun,
}

/// The outcome of a successful `create`.
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub identity: PackageIdentity,
    pub package_dir: PathBuf,
    pub cache_hit: bool,
    pub tests: TestStatus,
}

/// Check a recipe against an environment without building anything.
pub fn check(recipe: &Recipe, env: &EnvironmentDescriptor, tool_version: &Version) -> Result<()> {
    recipe.check_tool_version(tool_version)?;
    validate(
        env,
        recipe.compatibility.min_cppstd,
        &recipe.compatibility.compilers_minimum_version,
    )
    .map_err(hdrpack_recipe::RecipeError::from)?;
    Ok(())
}

/// Configure, build and run the unit tests.
pub fn build_and_test(
    request: &CreateRequest<'_>,
    tool: &dyn BuildTool,
    runner: &dyn TestRunner,
) -> Result<TestStatus> {
    let configure = ConfigureRequest {
        source_dir: script_dir(request.recipe, request.source_dir),
        build_dir: request.build_dir.to_path_buf(),
        build_type: request.env.build_type.clone(),
        options: build_options(request.recipe, request.env),
    };

    tool.configure(&configure)?;
    tool.build(&configure)?;

    if request.env.is_cross_building() {
        tracing::warn!(
            os = %request.env.os,
            arch = %request.env.arch,
            "cross-building, unit tests built but not run"
        );
        return Ok(TestStatus::BuiltOnly);
    }

    let executable = tool
        .bin_dir(&configure)
        .join(executable_name(&request.recipe.build.test_executable));
    runner.run(&executable)?;
    Ok(TestStatus::Passed)
}

/// Copy the recipe's `exports_sources` into `<build_dir>/export`.
///
/// Returns the export folder, or `None` when the recipe exports nothing and
/// the source tree is used as is.
fn export(request: &CreateRequest<'_>) -> Result<Option<PathBuf>> {
    let patterns = &request.recipe.package.exports_sources;
    if patterns.is_empty() {
        return Ok(None);
    }
    let export_dir = request.build_dir.join(EXPORT_FOLDER);
    layout::export_sources(patterns, request.source_dir, &export_dir)?;
    Ok(Some(export_dir))
}

/// Run the whole pipeline for one recipe and environment.
pub fn create(
    request: &CreateRequest<'_>,
    cache: &PackageCache,
    tool: &dyn BuildTool,
    runner: &dyn TestRunner,
) -> Result<CreateOutcome> {
    let recipe = request.recipe;
    check(recipe, request.env, request.tool_version)?;

    let identity = reduce_identity(recipe.artifact_kind(), request.env);
    let name = &recipe.package.name;
    let version = &recipe.package.version;

    if !request.force && cache.contains(name, version, &identity) {
        tracing::info!(reference = %recipe.reference(), %identity, "package already cached");
        return Ok(CreateOutcome {
            package_dir: cache.package_dir(name, version, &identity),
            identity,
            cache_hit: true,
            tests: TestStatus::NotRun,
        });
    }

    let exported = export(request)?;
    let request = CreateRequest {
        source_dir: exported.as_deref().unwrap_or(request.source_dir),
        ..request.clone()
    };

    let tests = if request.skip_test {
        tracing::warn!("skip_test set, unit tests not built");
        TestStatus::Skipped
    } else {
        build_and_test(&request, tool, runner)?
    };

    let (entry, _) = cache.store(recipe, &identity, request.source_dir)?;
    tracing::info!(reference = %recipe.reference(), %identity, "package created");

    Ok(CreateOutcome {
        identity,
        package_dir: entry.package_dir,
        cache_hit: false,
        tests,
    })
}
