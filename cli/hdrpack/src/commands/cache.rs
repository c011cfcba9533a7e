//! `hdrpack cache`: list, remove and verify cached packages.

use anyhow::{bail, Result};

use hdrpack_recipe::{is_valid_name, PackageCache, PackageIdentity, PackageInfo};

/// Print every cached `name/version` with its identities.
pub fn list(cache: &PackageCache) -> Result<()> {
    let refs = cache.list_references()?;
    if refs.is_empty() {
        println!("Cache is empty ({})", cache.root().display());
        return Ok(());
    }
    for reference in refs {
        let Some((name, version)) = reference.split_once('/') else {
            continue;
        };
        println!("{reference}");
        for id in cache.list_identities(name, version)? {
            println!("  {id}");
        }
    }
    Ok(())
}

/// Remove every cached identity of `reference`.
pub fn remove(cache: &PackageCache, reference: &str) -> Result<()> {
    let (name, version) = split_reference(reference)?;
    match cache.remove_all(name, version)? {
        0 => println!("{reference} is not cached"),
        n => println!("Removed {n} package(s) of {reference}"),
    }
    Ok(())
}

/// Re-hash every cached package; fail if any was modified.
pub fn verify(cache: &PackageCache) -> Result<()> {
    let mut bad = Vec::new();
    let mut checked = 0usize;
    for reference in cache.list_references()? {
        let Some((name, version)) = reference.split_once('/') else {
            continue;
        };
        for dir in cache.list_identities(name, version)? {
            checked += 1;
            let Some(identity) = stored_identity(cache, name, version, &dir) else {
                println!("  INVALID  {reference} {dir}");
                bad.push(format!("{reference}:{dir}"));
                continue;
            };
            if cache.verify_integrity(name, version, &identity)? {
                println!("  ok       {reference} {dir}");
            } else {
                println!("  MODIFIED {reference} {dir}");
                bad.push(format!("{reference}:{dir}"));
            }
        }
    }
    if !bad.is_empty() {
        bail!("{} of {checked} cached package(s) failed verification", bad.len());
    }
    println!("{checked} cached package(s) verified");
    Ok(())
}

fn split_reference(reference: &str) -> Result<(&str, &str)> {
    match reference.split_once('/') {
        Some((name, version)) if is_valid_name(name) && is_plain(version) => Ok((name, version)),
        _ => bail!("expected a reference of the form name/version, got '{reference}'"),
    }
}

fn is_plain(part: &str) -> bool {
    !part.is_empty()
        && part != "."
        && part != ".."
        && !part.contains(['/', '\\'])
}

/// The identity recorded in a cached package folder, if it holds one whose
/// folder name matches.
fn stored_identity(
    cache: &PackageCache,
    name: &str,
    version: &str,
    dir: &str,
) -> Option<PackageIdentity> {
    let folder = cache.root().join(name).join(version).join(dir);
    PackageInfo::load(&folder)
        .ok()
        .map(|info| info.identity)
        .filter(|identity| identity.as_str() == dir)
}
