//! `hdrpack doctor`: toolchain diagnostics.

use std::path::PathBuf;
use std::process::Command;

use anyhow::Result;

use hdrpack_recipe::environment::host_platform;
use hdrpack_recipe::{PackageCache, Recipe};

/// Print toolchain diagnostic information.
pub fn run(
    found: hdrpack_recipe::Result<Option<(Recipe, PathBuf)>>,
    cache: Option<&PackageCache>,
) -> Result<()> {
    println!("=== hdrpack doctor ===");
    println!();

    println!("hdrpack version: {}", env!("CARGO_PKG_VERSION"));
    let (os, arch) = host_platform();
    println!("Host platform:   {os}/{arch}");
    match cache {
        Some(cache) => println!("Cache folder:    {}", cache.root().display()),
        None => println!("Cache folder:    not found (set HDRPACK_HOME or pass --cache-dir)"),
    }
    println!();

    println!("--- System Tools ---");
    print_tool_status("cmake", &["--version"]);
    print_tool_status("c++", &["--version"]);
    println!();

    println!("--- Project Status ---");
    match found {
        Ok(Some((recipe, dir))) => {
            println!("  {}: found at {}", hdrpack_recipe::RECIPE_FILE, dir.display());
            println!("  Package:   {}", recipe.reference());
            println!("  Min std:   C++{}", recipe.compatibility.min_cppstd);
            if let Err(e) = recipe.check_tool_version(&hdrpack_recipe::tool_version()) {
                println!("  Warning:   {e}");
            }
        }
        Ok(None) => {
            println!("  {}: not found", hdrpack_recipe::RECIPE_FILE);
        }
        Err(e) => {
            println!("  {}: error: {e}", hdrpack_recipe::RECIPE_FILE);
        }
    }

    Ok(())
}

fn print_tool_status(name: &str, args: &[&str]) {
    match Command::new(name).args(args).output() {
        Ok(output) => {
            let version = String::from_utf8_lossy(&output.stdout);
            let first_line = version.lines().next().unwrap_or("(unknown version)");
            println!("  {name}: {first_line}");
        }
        Err(_) => {
            println!("  {name}: not found");
        }
    }
}
