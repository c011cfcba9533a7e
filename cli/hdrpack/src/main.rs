//! hdrpack CLI: validate, build and package header-only C++ libraries.

mod commands;
mod logging;
mod profile;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};

use hdrpack_build::BuildError;
use hdrpack_recipe::{PackageCache, Recipe, RECIPE_FILE};

use profile::EnvArgs;

#[derive(Parser)]
#[command(name = "hdrpack", version, about = "Packaging for header-only C++ libraries")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Package cache folder (default: $HDRPACK_HOME/cache or ~/.hdrpack/cache)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that an environment can build the package
    Validate {
        #[command(flatten)]
        env: EnvArgs,
    },
    /// Print the package identity for an environment
    PackageId {
        #[command(flatten)]
        env: EnvArgs,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate, build and run the unit tests, then package into the cache
    Create {
        #[command(flatten)]
        env: EnvArgs,
        /// Build folder for the unit tests (default: build/)
        #[arg(long)]
        build_dir: Option<PathBuf>,
        /// Do not build or run the unit tests
        #[arg(long)]
        skip_test: bool,
        /// Rebuild even if the package is already cached
        #[arg(long)]
        force: bool,
    },
    /// Copy headers and licenses into a package folder
    Package {
        /// Output folder
        #[arg(long, short = 'o')]
        output: PathBuf,
        #[command(flatten)]
        env: EnvArgs,
    },
    /// Show the recipe
    Inspect {
        /// Output format (text, toml)
        #[arg(long)]
        format: Option<String>,
    },
    /// Inspect or prune the package cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Remove the unit-test build folder
    Clean {
        /// Also remove this recipe's cached packages
        #[arg(long)]
        cache: bool,
    },
    /// Check toolchain and project status
    Doctor,
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached packages
    List,
    /// Remove every cached identity of a package (name/version)
    Remove {
        reference: String,
    },
    /// Re-hash cached packages and report tampering
    Verify,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| run(cli, &cwd, PackageCache::default_location));
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(exit_code(&e));
    }
}

/// The failed child's exit code for build and test failures, else 1.
fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<BuildError>()
        .and_then(BuildError::exit_code)
        .filter(|code| *code != 0)
        .unwrap_or(1)
}

/// Dispatch one command. The cache is located with `locate_cache` only by
/// commands that use it, and only when `--cache-dir` is absent.
fn run(cli: Cli, cwd: &Path, locate_cache: fn() -> Option<PackageCache>) -> anyhow::Result<()> {
    let cache_dir = cli.cache_dir;
    let resolve_cache = || open_cache(cache_dir.clone(), locate_cache);

    match cli.command {
        Commands::Validate { env } => {
            let (recipe, _) = load_recipe_required(cwd)?;
            commands::validate::run(&recipe, &env.resolve(cwd)?)
        }

        Commands::PackageId { env, json } => {
            let (recipe, _) = load_recipe_required(cwd)?;
            commands::package_id::run(&recipe, &env.resolve(cwd)?, json)
        }

        Commands::Create {
            env,
            build_dir,
            skip_test,
            force,
        } => {
            let (recipe, project_dir) = load_recipe_required(cwd)?;
            let selection = env.resolve(cwd)?;
            let build_dir = build_dir
                .map(|d| cwd.join(d))
                .unwrap_or_else(|| project_dir.join("build"));
            commands::create::run(
                &recipe,
                &project_dir,
                &build_dir,
                &selection,
                &resolve_cache()?,
                skip_test || selection.skip_test,
                force,
            )
        }

        Commands::Package { output, env } => {
            let (recipe, project_dir) = load_recipe_required(cwd)?;
            commands::package::run(&recipe, &project_dir, &cwd.join(output), &env, cwd)
        }

        Commands::Inspect { format } => {
            let (recipe, _) = load_recipe_required(cwd)?;
            commands::inspect::run(&recipe, format.as_deref())
        }

        Commands::Cache { action } => {
            let cache = resolve_cache()?;
            match action {
                CacheAction::List => commands::cache::list(&cache),
                CacheAction::Remove { reference } => commands::cache::remove(&cache, &reference),
                CacheAction::Verify => commands::cache::verify(&cache),
            }
        }

        Commands::Clean { cache: with_cache } => {
            let (recipe, project_dir) = load_recipe_required(cwd)?;
            let cache = if with_cache { Some(resolve_cache()?) } else { None };
            commands::clean::run(&project_dir, cache.as_ref().map(|cache| (&recipe, cache)))
        }

        Commands::Doctor => {
            let found = Recipe::find_and_load(cwd);
            let cache = resolve_cache().ok();
            commands::doctor::run(found, cache.as_ref())
        }
    }
}

fn open_cache(
    cache_dir: Option<PathBuf>,
    locate: fn() -> Option<PackageCache>,
) -> anyhow::Result<PackageCache> {
    match cache_dir {
        Some(dir) => Ok(PackageCache::new(dir)),
        None => locate().context("cannot locate a cache folder: set HDRPACK_HOME or pass --cache-dir"),
    }
}

fn load_recipe_required(cwd: &Path) -> anyhow::Result<(Recipe, PathBuf)> {
    Recipe::find_and_load(cwd)
        .with_context(|| format!("loading {RECIPE_FILE}"))?
        .with_context(|| format!("no {RECIPE_FILE} found in {} or any parent", cwd.display()))
}
