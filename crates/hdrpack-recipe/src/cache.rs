//! Local package cache keyed by package identity.
//!
//! Layout:
//! ```text
//! <cache_root>/
//!   <name>/
//!     <version>/
//!       <identity>/
//!         include/ licenses/ package.json
//!         integrity.json : hash of every packaged file
//! ```
//!
//! Every header-only package shares one identity, so the first environment
//! to build a version fills the cache for all of them.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::error::{RecipeError, Result};
use crate::identity::{ContentHash, PackageIdentity};
use crate::layout::{self, PackageInfo, PackagedFiles, PACKAGE_INFO_FILE};
use crate::recipe::Recipe;

const INTEGRITY_FILE: &str = "integrity.json";

/// A local package cache backed by the filesystem.
#[derive(Debug, Clone)]
pub struct PackageCache {
    /// Root directory for the cache.
    root: PathBuf,
}

/// Information about a cached package.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The package folder.
    pub package_dir: PathBuf,
    /// The package's exported directories.
    pub info: PackageInfo,
}

impl PackageCache {
    /// Create a cache rooted at the given directory.
    pub fn new(root: PathBuf) -> Self {
        PackageCache { root }
    }

    /// Create a cache at `$HDRPACK_HOME/cache`, else `~/.hdrpack/cache`.
    pub fn default_location() -> Option<Self> {
        if let Some(home) = std::env::var_os("HDRPACK_HOME") {
            return Some(PackageCache::new(PathBuf::from(home).join("cache")));
        }
        std::env::var_os("HOME")
            .map(|home| PackageCache::new(PathBuf::from(home).join(".hdrpack").join("cache")))
    }

    /// Get the root directory of this cache.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder a package with this identity lives in.
    pub fn package_dir(&self, name: &str, version: &str, identity: &PackageIdentity) -> PathBuf {
        self.root.join(name).join(version).join(identity.as_str())
    }

    /// Check if a package is already cached.
    pub fn contains(&self, name: &str, version: &str, identity: &PackageIdentity) -> bool {
        let dir = self.package_dir(name, version, identity);
        dir.join(PACKAGE_INFO_FILE).is_file() && dir.join(INTEGRITY_FILE).is_file()
    }

    /// Get the cache entry for a package, if it exists.
    pub fn get(&self, name: &str, version: &str, identity: &PackageIdentity) -> Result<Option<CacheEntry>> {
        if !self.contains(name, version, identity) {
            return Ok(None);
        }
        let package_dir = self.package_dir(name, version, identity);
        let info = PackageInfo::load(&package_dir)?;
        Ok(Some(CacheEntry { package_dir, info }))
    }

    /// Package `source_dir` into the cache under `identity`.
    ///
    /// Any previous contents of that package folder are replaced.
    pub fn store(
        &self,
        recipe: &Recipe,
        identity: &PackageIdentity,
        source_dir: &Path,
    ) -> Result<(CacheEntry, PackagedFiles)> {
        let dir = self.entry_dir(&recipe.package.name, &recipe.package.version, identity)?;
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|e| RecipeError::CacheError {
                path: dir.clone(),
                detail: format!("clearing stale package: {e}"),
            })?;
        }
        std::fs::create_dir_all(&dir).map_err(|e| RecipeError::CacheError {
            path: dir.clone(),
            detail: format!("creating cache dir: {e}"),
        })?;

        let packaged = layout::package(recipe, identity, source_dir, &dir)?;

        let hashes = hash_files(&dir, &packaged.files)?;
        let integrity_path = dir.join(INTEGRITY_FILE);
        std::fs::write(&integrity_path, serde_json::to_string_pretty(&hashes)?).map_err(|e| {
            RecipeError::CacheError {
                path: integrity_path,
                detail: format!("writing integrity: {e}"),
            }
        })?;

        let entry = CacheEntry {
            package_dir: dir,
            info: packaged.info.clone(),
        };
        Ok((entry, packaged))
    }

    /// Remove a specific package from the cache.
    ///
    /// Only folders holding a package info file are removed.
    pub fn remove(&self, name: &str, version: &str, identity: &PackageIdentity) -> Result<bool> {
        let dir = self.entry_dir(name, version, identity)?;
        if !dir.join(PACKAGE_INFO_FILE).is_file() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&dir).map_err(|e| RecipeError::CacheError {
            path: dir,
            detail: format!("removing cache entry: {e}"),
        })?;
        Ok(true)
    }

    /// Remove every cached identity of `name/version`, returning how many
    /// packages were removed.
    ///
    /// Subfolders without readable package info are left in place.
    pub fn remove_all(&self, name: &str, version: &str) -> Result<usize> {
        check_component(&self.root, name)?;
        check_component(&self.root, version)?;
        let mut removed = 0;
        for id in self.list_identities(name, version)? {
            let folder = self.root.join(name).join(version).join(&id);
            match PackageInfo::load(&folder) {
                Ok(info) if info.identity.as_str() == id => {
                    if self.remove(name, version, &info.identity)? {
                        removed += 1;
                    }
                }
                _ => tracing::warn!(folder = %folder.display(), "not a package folder, left in place"),
            }
        }
        Ok(removed)
    }

    /// `package_dir`, refusing names that would leave the cache root.
    fn entry_dir(&self, name: &str, version: &str, identity: &PackageIdentity) -> Result<PathBuf> {
        for part in [name, version, identity.as_str()] {
            check_component(&self.root, part)?;
        }
        Ok(self.package_dir(name, version, identity))
    }

    /// List cached `name/version` references.
    pub fn list_references(&self) -> Result<Vec<String>> {
        let mut refs = Vec::new();
        for name in list_dirs(&self.root)? {
            for version in list_dirs(&self.root.join(&name))? {
                refs.push(format!("{name}/{version}"));
            }
        }
        Ok(refs)
    }

    /// List the identities cached for one package version.
    pub fn list_identities(&self, name: &str, version: &str) -> Result<Vec<String>> {
        list_dirs(&self.root.join(name).join(version))
    }

    /// Verify the integrity of a cached package.
    pub fn verify_integrity(&self, name: &str, version: &str, identity: &PackageIdentity) -> Result<bool> {
        let dir = self.package_dir(name, version, identity);
        let integrity_path = dir.join(INTEGRITY_FILE);

        if !integrity_path.is_file() {
            return Ok(false);
        }

        let integrity_str =
            std::fs::read_to_string(&integrity_path).map_err(|e| RecipeError::CacheError {
                path: integrity_path,
                detail: format!("reading integrity: {e}"),
            })?;
        let expected: BTreeMap<String, String> = serde_json::from_str(&integrity_str)?;

        for (file, hash) in &expected {
            let path = dir.join(file);
            let Ok(data) = std::fs::read(&path) else {
                return Ok(false);
            };
            if ContentHash::compute(&data).as_str() != hash {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Fail unless `part` is a single plain folder name.
fn check_component(root: &Path, part: &str) -> Result<()> {
    let mut components = Path::new(part).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !part.contains(['/', '\\']) => Ok(()),
        _ => Err(RecipeError::CacheError {
            path: root.to_path_buf(),
            detail: format!("'{part}' is not a plain folder name"),
        }),
    }
}

/// SHA-256 of each packaged file, keyed by its `/`-separated relative path.
fn hash_files(dir: &Path, files: &[PathBuf]) -> Result<BTreeMap<String, String>> {
    let mut hashes = BTreeMap::new();
    for file in files {
        let path = dir.join(file);
        let data = std::fs::read(&path).map_err(|e| RecipeError::CacheError {
            path: path.clone(),
            detail: format!("hashing: {e}"),
        })?;
        let key = file
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        hashes.insert(key, ContentHash::compute(&data).0);
    }
    Ok(hashes)
}

/// Sorted names of the subdirectories of `dir`; empty when `dir` is missing.
fn list_dirs(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| RecipeError::CacheError {
        path: dir.to_path_buf(),
        detail: format!("listing: {e}"),
    })? {
        let entry = entry.map_err(|e| RecipeError::CacheError {
            path: dir.to_path_buf(),
            detail: format!("reading entry: {e}"),
        })?;
        if entry.path().is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentDescriptor;
    use crate::identity::{reduce_identity, ArtifactKind};
    use crate::version::CompilerVersion;

    fn recipe(version: &str) -> Recipe {
        Recipe::parse(&format!(
            "[package]\nname = \"libhal\"\nversion = \"{version}\"\n[compatibility]\nmin_cppstd = \"20\"\n"
        ))
        .unwrap()
    }

    fn source() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("include/libhal")).unwrap();
        std::fs::write(dir.path().join("include/libhal/pwm.hpp"), "#pragma once\n").unwrap();
        std::fs::write(dir.path().join("LICENSE"), "Apache-2.0").unwrap();
        dir
    }

    fn env(os: &str, compiler: &str) -> EnvironmentDescriptor {
        EnvironmentDescriptor {
            compiler: compiler.to_string(),
            compiler_version: CompilerVersion::parse("12").unwrap(),
            cppstd: None,
            os: os.to_string(),
            arch: "x86_64".to_string(),
            build_type: None,
        }
    }

    #[test]
    fn store_and_retrieve() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PackageCache::new(dir.path().to_path_buf());
        let id = PackageIdentity::Universal;
        let src = source();

        assert!(!cache.contains("libhal", "1.1.0", &id));
        let (entry, packaged) = cache.store(&recipe("1.1.0"), &id, src.path()).unwrap();
        assert_eq!(packaged.files.len(), 2);
        assert!(entry.package_dir.join("include/libhal/pwm.hpp").is_file());

        assert!(cache.contains("libhal", "1.1.0", &id));
        let got = cache.get("libhal", "1.1.0", &id).unwrap().unwrap();
        assert_eq!(got.info.reference, "libhal/1.1.0");
    }

    #[test]
    fn one_header_only_build_serves_every_environment() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PackageCache::new(dir.path().to_path_buf());
        let src = source();

        let linux = reduce_identity(ArtifactKind::HeaderOnly, &env("Linux", "gcc"));
        cache.store(&recipe("1.1.0"), &linux, src.path()).unwrap();

        let windows = reduce_identity(ArtifactKind::HeaderOnly, &env("Windows", "msvc"));
        assert!(cache.contains("libhal", "1.1.0", &windows));
        assert_eq!(cache.list_identities("libhal", "1.1.0").unwrap().len(), 1);
    }

    #[test]
    fn settings_dependent_builds_are_cached_separately() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PackageCache::new(dir.path().to_path_buf());
        let src = source();

        let linux = reduce_identity(ArtifactKind::SettingsDependent, &env("Linux", "gcc"));
        let windows = reduce_identity(ArtifactKind::SettingsDependent, &env("Windows", "msvc"));
        cache.store(&recipe("1.1.0"), &linux, src.path()).unwrap();

        assert!(!cache.contains("libhal", "1.1.0", &windows));
        cache.store(&recipe("1.1.0"), &windows, src.path()).unwrap();
        assert_eq!(cache.list_identities("libhal", "1.1.0").unwrap().len(), 2);
    }

    #[test]
    fn list_references() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PackageCache::new(dir.path().to_path_buf());
        let src = source();
        let id = PackageIdentity::Universal;

        cache.store(&recipe("1.0.1"), &id, src.path()).unwrap();
        cache.store(&recipe("1.1.0"), &id, src.path()).unwrap();

        assert_eq!(
            cache.list_references().unwrap(),
            vec!["libhal/1.0.1", "libhal/1.1.0"]
        );
    }

    #[test]
    fn remove_cached_package() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PackageCache::new(dir.path().to_path_buf());
        let src = source();
        let id = PackageIdentity::Universal;

        cache.store(&recipe("1.1.0"), &id, src.path()).unwrap();
        assert!(cache.remove("libhal", "1.1.0", &id).unwrap());
        assert!(!cache.contains("libhal", "1.1.0", &id));
        assert!(!cache.remove("libhal", "1.1.0", &id).unwrap());
    }

    #[test]
    fn remove_stays_inside_the_cache_root() {
        let home = tempfile::tempdir().unwrap();
        let cache = PackageCache::new(home.path().join(".hdrpack").join("cache"));
        let settings = home.path().join(".hdrpack").join("settings.toml");
        std::fs::create_dir_all(cache.root()).unwrap();
        std::fs::write(&settings, "keep").unwrap();
        cache.store(&recipe("1.1.0"), &PackageIdentity::Universal, source().path()).unwrap();

        assert!(matches!(cache.remove_all("..", ".."), Err(RecipeError::CacheError { .. })));
        assert!(cache.remove_all("libhal/..", "1.1.0").is_err());
        let escaping = PackageIdentity::Settings(ContentHash("..".to_string()));
        assert!(cache.remove("libhal", "1.1.0", &escaping).is_err());

        assert!(settings.is_file());
        assert!(cache.contains("libhal", "1.1.0", &PackageIdentity::Universal));
    }

    #[test]
    fn remove_all_skips_folders_that_are_not_packages() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PackageCache::new(dir.path().to_path_buf());
        cache.store(&recipe("1.1.0"), &PackageIdentity::Universal, source().path()).unwrap();
        let stray = dir.path().join("libhal/1.1.0/notes");
        std::fs::create_dir_all(&stray).unwrap();
        std::fs::write(stray.join("todo.txt"), "keep").unwrap();

        assert_eq!(cache.remove_all("libhal", "1.1.0").unwrap(), 1);
        assert!(stray.join("todo.txt").is_file());
        assert!(!cache.contains("libhal", "1.1.0", &PackageIdentity::Universal));
    }

    #[test]
    fn store_rejects_escaping_identity() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PackageCache::new(dir.path().join("cache"));
        let escaping = PackageIdentity::Settings(ContentHash("..".to_string()));
        assert!(cache.store(&recipe("1.1.0"), &escaping, source().path()).is_err());
    }

    #[test]
    fn integrity_verification() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PackageCache::new(dir.path().to_path_buf());
        let src = source();
        let id = PackageIdentity::Universal;

        let (entry, _) = cache.store(&recipe("1.1.0"), &id, src.path()).unwrap();
        assert!(cache.verify_integrity("libhal", "1.1.0", &id).unwrap());

        std::fs::write(entry.package_dir.join("include/libhal/pwm.hpp"), "tampered").unwrap();
        assert!(!cache.verify_integrity("libhal", "1.1.0", &id).unwrap());
    }

    #[test]
    fn restore_replaces_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PackageCache::new(dir.path().to_path_buf());
        let src = source();
        let id = PackageIdentity::Universal;

        let (entry, _) = cache.store(&recipe("1.1.0"), &id, src.path()).unwrap();
        std::fs::write(entry.package_dir.join("stale.txt"), "old").unwrap();
        let (entry, _) = cache.store(&recipe("1.1.0"), &id, src.path()).unwrap();
        assert!(!entry.package_dir.join("stale.txt").exists());
    }

    #[test]
    fn empty_cache_operations() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PackageCache::new(dir.path().join("missing"));
        let id = PackageIdentity::Universal;

        assert!(!cache.contains("nonexistent", "1.0.0", &id));
        assert!(cache.get("nonexistent", "1.0.0", &id).unwrap().is_none());
        assert!(cache.list_references().unwrap().is_empty());
        assert!(cache.list_identities("nonexistent", "1.0.0").unwrap().is_empty());
        assert!(!cache.verify_integrity("nonexistent", "1.0.0", &id).unwrap());
    }
}
