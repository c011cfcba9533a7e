//! `hdrpack validate`: compiler and standard compatibility check.

use anyhow::{Context, Result};

use hdrpack_recipe::{tool_version, Recipe};

use super::describe_env;
use crate::profile::Selection;

/// Check the selected environment against the recipe.
pub fn run(recipe: &Recipe, selection: &Selection) -> Result<()> {
    hdrpack_build::check(recipe, &selection.env, &tool_version()).with_context(|| {
        format!(
            "{} cannot be built for {}",
            recipe.reference(),
            describe_env(&selection.env)
        )
    })?;

    println!("{}: {} OK", recipe.reference(), describe_env(&selection.env));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;

    fn selection(compiler: &str, version: &str) -> Selection {
        Selection {
            env: fixtures::env(compiler, version),
            skip_test: false,
        }
    }

    #[test]
    fn supported_environment_passes() {
        run(&fixtures::recipe(), &selection("gcc", "12")).unwrap();
        run(&fixtures::recipe(), &selection("msvc", "193")).unwrap();
    }

    #[test]
    fn old_compiler_fails_with_details() {
        let err = run(&fixtures::recipe(), &selection("gcc", "10")).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("gcc-10"));
        assert!(message.contains("C++20"));
    }
}
