//! `hdrpack inspect`: show the recipe.

use anyhow::{bail, Result};

use hdrpack_recipe::Recipe;

/// Print the recipe as a summary or as normalized TOML.
pub fn run(recipe: &Recipe, format: Option<&str>) -> Result<()> {
    match format.unwrap_or("text") {
        "text" => {
            print!("{}", summary(recipe));
            Ok(())
        }
        "toml" => {
            print!("{}", recipe.to_toml()?);
            Ok(())
        }
        other => bail!("unknown format '{other}' (expected text or toml)"),
    }
}

/// Human-readable recipe summary.
pub fn summary(recipe: &Recipe) -> String {
    let pkg = &recipe.package;
    let mut out = String::new();
    out.push_str(&format!("{}\n", recipe.reference()));
    if let Some(description) = &pkg.description {
        out.push_str(&format!("  {description}\n"));
    }
    if let Some(license) = &pkg.license {
        out.push_str(&format!("  License:     {license}\n"));
    }
    if let Some(homepage) = &pkg.homepage {
        out.push_str(&format!("  Homepage:    {homepage}\n"));
    }
    if !pkg.topics.is_empty() {
        out.push_str(&format!("  Topics:      {}\n", pkg.topics.join(", ")));
    }
    out.push_str(&format!(
        "  Kind:        {}\n",
        if pkg.header_only { "header-only" } else { "settings-dependent" }
    ));
    out.push_str(&format!("  Minimum std: C++{}\n", recipe.compatibility.min_cppstd));

    let table = &recipe.compatibility.compilers_minimum_version;
    if !table.is_empty() {
        out.push_str("  Compilers:\n");
        for (compiler, minimum) in table.iter() {
            out.push_str(&format!("    {compiler} >= {minimum}\n"));
        }
    }
    if !recipe.requires.is_empty() {
        out.push_str("  Requires:\n");
        for (name, version) in &recipe.requires {
            out.push_str(&format!("    {name}/{version}\n"));
        }
    }
    if !recipe.test_requires.is_empty() {
        out.push_str("  Test requires:\n");
        for (name, version) in &recipe.test_requires {
            out.push_str(&format!("    {name}/{version}\n"));
        }
    }
    out
}
