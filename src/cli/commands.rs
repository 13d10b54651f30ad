use crate::core::entries::resolve_entries;
use crate::core::manifest::{BundleManifest, RevisionManifest};
use crate::core::models::{BuildConfig, BuildMode};
use crate::core::public_path::public_path_for;
use crate::core::{BuildService, KuraBuildService};
use crate::plugins::standard_plugins;
use crate::utils::config_loader::{CliOverrides, ConfigLoader};
use crate::utils::watch::{KuraWatcher, WatchConfig};
use crate::utils::{KuraError, Logger, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "kura")]
#[command(about = "kura - content-hashed asset bundles with bundle-tracker and revision manifests")]
pub struct Cli {
    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that loads the project configuration.
#[derive(Args, Clone, Debug)]
pub struct ProjectArgs {
    /// Project root directory
    #[arg(short, long, default_value = ".")]
    pub root: String,
    /// development or production; defaults to NODE_ENV
    #[arg(short, long)]
    pub mode: Option<BuildMode>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build every entry once and write both manifests
    Build {
        #[command(flatten)]
        project: ProjectArgs,
        /// Output directory (overrides kura.config.json)
        #[arg(short, long)]
        outdir: Option<String>,
        /// Extra input mixed into every content hash
        #[arg(long)]
        salt: Option<String>,
        /// Move modules shared by several entries into a common chunk
        #[arg(long)]
        code_splitting: bool,
        /// Worker threads for module resolution
        #[arg(short, long)]
        jobs: Option<usize>,
    },
    /// Rebuild on every source change
    Watch {
        #[command(flatten)]
        project: ProjectArgs,
        /// Quiet period before a rebuild, in milliseconds
        #[arg(long, default_value_t = 100)]
        debounce_ms: u64,
    },
    /// Print the <link>/<script> tags for an entry from the bundle manifest
    Tags {
        #[command(flatten)]
        project: ProjectArgs,
        /// Entry name, e.g. dashboard/orders
        entry: String,
    },
    /// Print the hashed URL of a static asset from the revision manifest
    Asset {
        #[command(flatten)]
        project: ProjectArgs,
        /// Path relative to the asset root, e.g. images/logo.png
        path: String,
    },
    /// List the entries the next build would compile
    Entries {
        #[command(flatten)]
        project: ProjectArgs,
    },
}

pub struct CliHandler;

impl CliHandler {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self) -> Result<()> {
        let cli = Cli::parse();
        Logger::init(cli.verbose);
        self.dispatch(cli.command, cli.verbose).await
    }

    async fn dispatch(&self, command: Commands, verbose: bool) -> Result<()> {
        match command {
            Commands::Build {
                project,
                outdir,
                salt,
                code_splitting,
                jobs,
            } => {
                let overrides = CliOverrides {
                    outdir,
                    hash_salt: salt,
                    code_splitting: code_splitting.then_some(true),
                };
                let config = self.load_config(&project, overrides)?;
                self.handle_build_command(config, jobs, verbose).await
            }
            Commands::Watch { mut project, debounce_ms } => {
                project.mode.get_or_insert(BuildMode::Development);
                let config = self.load_config(&project, CliOverrides::default())?;
                self.handle_watch_command(config, debounce_ms, verbose).await
            }
            Commands::Tags { project, entry } => {
                let config = self.load_config(&project, CliOverrides::default())?;
                self.handle_tags_command(&config, &entry)
            }
            Commands::Asset { project, path } => {
                let config = self.load_config(&project, CliOverrides::default())?;
                self.handle_asset_command(&config, &path)
            }
            Commands::Entries { project } => {
                let config = self.load_config(&project, CliOverrides::default())?;
                self.handle_entries_command(&config)
            }
        }
    }

    /// The only place the process environment is consulted for the mode.
    fn load_config(&self, project: &ProjectArgs, overrides: CliOverrides) -> Result<BuildConfig> {
        let root = absolute_root(&project.root)?;
        let mode = project
            .mode
            .unwrap_or_else(|| BuildMode::from_env_value(std::env::var("NODE_ENV").ok().as_deref()));
        let file_config = ConfigLoader::load_from_file(&root)?;
        Ok(ConfigLoader::merge_with_cli(root, mode, file_config, overrides))
    }

    async fn handle_build_command(&self, config: BuildConfig, jobs: Option<usize>, verbose: bool) -> Result<()> {
        let threads = jobs.unwrap_or_else(num_cpus::get).max(1);
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
            Logger::debug(&format!("Worker pool already configured: {}", e));
        }

        let mut build_service =
            KuraBuildService::with_defaults(&config).with_plugins(standard_plugins(&config, verbose));
        build_service.build(&config).await?;
        Ok(())
    }

    async fn handle_watch_command(&self, config: BuildConfig, debounce_ms: u64, verbose: bool) -> Result<()> {
        let mut build_service =
            KuraBuildService::with_defaults(&config).with_plugins(standard_plugins(&config, verbose));
        let watcher = KuraWatcher::new(WatchConfig { debounce_ms, verbose }, config);
        watcher.watch(&mut build_service).await
    }

    fn handle_tags_command(&self, config: &BuildConfig, entry: &str) -> Result<()> {
        let manifest = BundleManifest::load(&config.bundle_manifest_path)?;
        println!("{}", manifest.tags_for(&config.environment, entry)?);
        Ok(())
    }

    fn handle_asset_command(&self, config: &BuildConfig, path: &str) -> Result<()> {
        let manifest = RevisionManifest::load(&config.revision_manifest_path)?;
        println!("{}", manifest.url_for(path)?);
        Ok(())
    }

    fn handle_entries_command(&self, config: &BuildConfig) -> Result<()> {
        let entries = resolve_entries(&config.entry_root, &config.entry_pattern, &config.static_entries)?;
        Logger::info(&format!("🌐 Public path: {}", public_path_for(config)));
        for entry in &entries {
            let source = entry.source_path.strip_prefix(&config.root).unwrap_or(&entry.source_path);
            println!("{}\t{}", entry.name, source.display());
        }
        Logger::entries_resolved(entries.len());
        Ok(())
    }
}

impl Default for CliHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn absolute_root(root: &str) -> Result<PathBuf> {
    let path = Path::new(root);
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()?;
    Ok(match root {
        "." => cwd,
        _ => cwd.join(path),
    })
}

/// Exit status for a failed command; configuration problems are usage errors.
pub fn exit_code(error: &KuraError) -> i32 {
    match error {
        KuraError::Config(_) | KuraError::InvalidPattern { .. } => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_build_flags() {
        let cli = Cli::try_parse_from([
            "kura", "build", "--root", "/srv/shop", "--mode", "production", "--salt", "v2", "--code-splitting",
        ])
        .unwrap();
        match cli.command {
            Commands::Build {
                project,
                salt,
                code_splitting,
                outdir,
                ..
            } => {
                assert_eq!(project.root, "/srv/shop");
                assert_eq!(project.mode, Some(BuildMode::Production));
                assert_eq!(salt.as_deref(), Some("v2"));
                assert!(code_splitting);
                assert!(outdir.is_none());
            }
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn parses_tags_entry() {
        let cli = Cli::try_parse_from(["kura", "tags", "dashboard/orders", "-v"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Tags { entry, project } => {
                assert_eq!(entry, "dashboard/orders");
                assert!(project.mode.is_none());
            }
            _ => panic!("expected tags"),
        }
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["kura", "build", "--mode", "staging"]).is_err());
    }

    #[test]
    fn config_errors_are_usage_errors() {
        assert_eq!(exit_code(&KuraError::config("bad")), 2);
        assert_eq!(exit_code(&KuraError::build("boom")), 1);
    }
}
