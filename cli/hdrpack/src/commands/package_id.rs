//! `hdrpack package-id`: print the cache identity for an environment.

use anyhow::Result;

use hdrpack_recipe::{reduce_identity, ArtifactKind, PackageIdentity, Recipe};

use crate::profile::Selection;

/// Compute the identity `create` would store the package under.
pub fn identity(recipe: &Recipe, selection: &Selection) -> PackageIdentity {
    reduce_identity(recipe.artifact_kind(), &selection.env)
}

/// Print the identity, as plain text or JSON.
pub fn run(recipe: &Recipe, selection: &Selection, json: bool) -> Result<()> {
    let id = identity(recipe, selection);
    if json {
        let kind = match recipe.artifact_kind() {
            ArtifactKind::HeaderOnly => "header-only",
            ArtifactKind::SettingsDependent => "settings-dependent",
        };
        let value = serde_json::json!({
            "reference": recipe.reference(),
            "kind": kind,
            "package_id": id.as_str(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{id}");
    }
    Ok(())
}
