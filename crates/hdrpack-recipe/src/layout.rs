//! Package folder assembly.
//!
//! Copies the public headers and license files out of a source tree:
//!
//! ```text
//! <package>/
//!   include/       : headers, directory structure preserved
//!   licenses/      : license files, flattened
//!   package.json   : exported directories and identity
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RecipeError, Result};
use crate::identity::{ArtifactKind, PackageIdentity};
use crate::recipe::{LayoutSection, Recipe};

/// Name of the package description written into every package folder.
pub const PACKAGE_INFO_FILE: &str = "package.json";

/// What a package exports to its consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    /// `name/version`.
    pub reference: String,
    /// Identity the package was built under.
    pub identity: PackageIdentity,
    pub include_dirs: Vec<String>,
    pub lib_dirs: Vec<String>,
    pub bin_dirs: Vec<String>,
    pub res_dirs: Vec<String>,
    pub framework_dirs: Vec<String>,
}

impl PackageInfo {
    /// Exported directories for a package of the given kind.
    ///
    /// Header-only packages export `include` and nothing else. Compiled
    /// packages also export `lib` and `bin`.
    pub fn for_kind(reference: String, identity: PackageIdentity, kind: ArtifactKind) -> Self {
        let (lib_dirs, bin_dirs) = match kind {
            ArtifactKind::HeaderOnly => (Vec::new(), Vec::new()),
            ArtifactKind::SettingsDependent => (vec!["lib".to_string()], vec!["bin".to_string()]),
        };
        PackageInfo {
            reference,
            identity,
            include_dirs: vec!["include".to_string()],
            lib_dirs,
            bin_dirs,
            res_dirs: Vec::new(),
            framework_dirs: Vec::new(),
        }
    }

    /// Load `package.json` from a package folder.
    pub fn load(package_dir: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(package_dir.join(PACKAGE_INFO_FILE))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// The result of assembling a package folder.
#[derive(Debug, Clone)]
pub struct PackagedFiles {
    /// Copied files, relative to the package folder, sorted.
    pub files: Vec<PathBuf>,
    /// The written package info.
    pub info: PackageInfo,
}

/// Copy headers and licenses from `source_dir` into `package_dir` and write
/// the package info.
pub fn package(
    recipe: &Recipe,
    identity: &PackageIdentity,
    source_dir: &Path,
    package_dir: &Path,
) -> Result<PackagedFiles> {
    let files = copy_layout(&recipe.layout, source_dir, package_dir)?;

    let info = PackageInfo::for_kind(recipe.reference(), identity.clone(), recipe.artifact_kind());
    let info_path = package_dir.join(PACKAGE_INFO_FILE);
    std::fs::write(&info_path, serde_json::to_string_pretty(&info)?).map_err(|e| {
        RecipeError::Package {
            path: info_path,
            detail: format!("writing package info: {e}"),
        }
    })?;

    tracing::info!(
        reference = %info.reference,
        files = files.len(),
        dir = %package_dir.display(),
        "packaged"
    );
    Ok(PackagedFiles { files, info })
}

/// Copy the files matched by `layout`, returning their sorted package-relative
/// paths.
pub fn copy_layout(
    layout: &LayoutSection,
    source_dir: &Path,
    package_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut copied = Vec::new();

    let include_src = source_dir.join(&layout.include_dir);
    let include_dst = package_dir.join("include");
    for pattern in &layout.headers {
        for file in matching_files(&include_src, pattern, true)? {
            let relative = file.strip_prefix(&include_src).map_err(|e| RecipeError::Package {
                path: file.clone(),
                detail: format!("outside include folder: {e}"),
            })?;
            let dst = include_dst.join(relative);
            copy_file(&file, &dst)?;
            copied.push(Path::new("include").join(relative));
        }
    }

    let licenses_dst = package_dir.join("licenses");
    for pattern in &layout.licenses {
        for file in matching_files(source_dir, pattern, false)? {
            let Some(name) = file.file_name() else {
                continue;
            };
            copy_file(&file, &licenses_dst.join(name))?;
            copied.push(Path::new("licenses").join(name));
        }
    }

    copied.sort();
    copied.dedup();
    Ok(copied)
}

/// Copy the files of `source_dir` matched by `patterns` into `export_dir`,
/// keeping their relative paths. Returns the sorted relative paths.
///
/// `*` matches across folders, so `include/*` exports the whole tree under
/// `include`. Any previous contents of `export_dir` are replaced, and
/// `export_dir` itself is never walked when it lies inside `source_dir`.
pub fn export_sources(
    patterns: &[String],
    source_dir: &Path,
    export_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let compiled = patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p).map_err(|e| RecipeError::Pattern {
                pattern: p.clone(),
                detail: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let options = glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    if export_dir.exists() {
        std::fs::remove_dir_all(export_dir).map_err(|e| RecipeError::Package {
            path: export_dir.to_path_buf(),
            detail: format!("clearing export folder: {e}"),
        })?;
    }

    let mut exported = Vec::new();
    for file in walk_files(source_dir, export_dir)? {
        let Ok(relative) = file.strip_prefix(source_dir) else {
            continue;
        };
        if compiled.iter().any(|p| p.matches_path_with(relative, options)) {
            copy_file(&file, &export_dir.join(relative))?;
            exported.push(relative.to_path_buf());
        }
    }
    exported.sort();

    tracing::debug!(
        files = exported.len(),
        dir = %export_dir.display(),
        "exported sources"
    );
    Ok(exported)
}

/// Every regular file below `root`, skipping the `skip` subtree.
fn walk_files(root: &Path, skip: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|e| RecipeError::Package {
            path: dir.clone(),
            detail: format!("reading source tree: {e}"),
        })?;
        for entry in entries {
            let path = entry
                .map_err(|e| RecipeError::Package {
                    path: dir.clone(),
                    detail: format!("reading entry: {e}"),
                })?
                .path();
            if path == skip {
                continue;
            }
            if path.is_dir() {
                pending.push(path);
            } else if path.is_file() {
                files.push(path);
            }
        }
    }
    Ok(files)
}

/// Regular files under `root` whose name matches `pattern`.
fn matching_files(root: &Path, pattern: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        tracing::debug!(root = %root.display(), "copy root missing, nothing to copy");
        return Ok(Vec::new());
    }

    let escaped_root = glob::Pattern::escape(&root.to_string_lossy());
    let full = if recursive {
        format!("{escaped_root}/**/{pattern}")
    } else {
        format!("{escaped_root}/{pattern}")
    };

    let entries = glob::glob(&full).map_err(|e| RecipeError::Pattern {
        pattern: pattern.to_string(),
        detail: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| RecipeError::Package {
            path: e.path().to_path_buf(),
            detail: format!("reading source tree: {}", e.error()),
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent).map_err(|e| RecipeError::Package {
            path: parent.to_path_buf(),
            detail: format!("creating folder: {e}"),
        })?;
    }
    std::fs::copy(src, dst).map_err(|e| RecipeError::Package {
        path: dst.to_path_buf(),
        detail: format!("copying {}: {e}", src.display()),
    })?;
    Ok(())
}
