//! `hdrpack package`: copy headers and licenses into a folder.

use std::path::Path;

use anyhow::{Context, Result};

use hdrpack_recipe::{layout, reduce_identity, ArtifactKind, PackageIdentity, Recipe};

use crate::profile::EnvArgs;

/// Package the project into `output`.
///
/// Header-only recipes need no environment. Settings-dependent recipes take
/// it from the environment flags to compute the identity.
pub fn run(
    recipe: &Recipe,
    project_dir: &Path,
    output: &Path,
    env: &EnvArgs,
    cwd: &Path,
) -> Result<()> {
    let identity = match recipe.artifact_kind() {
        ArtifactKind::HeaderOnly => PackageIdentity::Universal,
        kind => reduce_identity(kind, &env.resolve(cwd)?.env),
    };

    std::fs::create_dir_all(output).with_context(|| format!("creating {}", output.display()))?;
    let packaged = layout::package(recipe, &identity, project_dir, output)?;

    for file in &packaged.files {
        println!("  {}", file.display());
    }
    println!(
        "Packaged {} files for {} into {}",
        packaged.files.len(),
        recipe.reference(),
        output.display()
    );
    Ok(())
}
