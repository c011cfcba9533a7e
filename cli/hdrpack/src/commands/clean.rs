//! `hdrpack clean`: remove the unit-test build folder.

use std::fs;
use std::path::Path;

use anyhow::Result;

use hdrpack_recipe::{PackageCache, Recipe};

/// Remove `build/` from the project directory, and optionally the recipe's
/// cached packages.
pub fn run(project_dir: &Path, cache: Option<(&Recipe, &PackageCache)>) -> Result<()> {
    let build_dir = project_dir.join("build");
    if build_dir.exists() {
        fs::remove_dir_all(&build_dir)?;
        println!("Removed {}", build_dir.display());
    } else {
        println!("Already clean: {} does not exist", build_dir.display());
    }

    if let Some((recipe, cache)) = cache {
        super::cache::remove(cache, &recipe.reference())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;
    use hdrpack_recipe::PackageIdentity;

    #[test]
    fn clean_removes_build_dir() {
        let dir = tempfile::tempdir().unwrap();
        let build = dir.path().join("build");
        fs::create_dir(&build).unwrap();
        fs::write(build.join("unit_test"), b"data").unwrap();

        run(dir.path(), None).unwrap();
        assert!(!build.exists());
    }

    #[test]
    fn clean_handles_already_clean() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), None).unwrap();
    }

    #[test]
    fn clean_with_cache() {
        let project = fixtures::project();
        let root = tempfile::tempdir().unwrap();
        let cache = PackageCache::new(root.path().to_path_buf());
        let recipe = fixtures::recipe();
        cache
            .store(&recipe, &PackageIdentity::Universal, project.path())
            .unwrap();
        fs::create_dir(project.path().join("build")).unwrap();

        run(project.path(), Some((&recipe, &cache))).unwrap();
        assert!(!project.path().join("build").exists());
        assert!(!cache.contains("libhal", "1.1.0", &PackageIdentity::Universal));
    }
}
