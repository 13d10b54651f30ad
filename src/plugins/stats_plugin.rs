// Stats Plugin: logs build statistics

use crate::core::models::{ArtifactKind, BuildResult};
use crate::core::plugin::{Plugin, PluginContext};
use crate::utils::{Logger, Result};

/// Logs entry, artifact and asset counts around each build.
pub struct StatsPlugin {
    verbose: bool,
}

impl StatsPlugin {
    /// With `verbose`, every emitted file is listed too.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Plugin for StatsPlugin {
    fn name(&self) -> &str {
        "stats-plugin"
    }

    fn on_build_start(&self, context: &PluginContext) -> Result<()> {
        Logger::info("📊 Build started");
        Logger::info(&format!("  Mode: {}", context.config.mode));
        Logger::info(&format!("  Public path: {}", context.public_path));
        Logger::info(&format!("  Code splitting: {}", context.config.enable_code_splitting));
        Logger::info(&format!("  Minification: {}", context.config.enable_minification));
        Ok(())
    }

    fn on_build_end(&self, _context: &PluginContext, result: &BuildResult) -> Result<()> {
        let artifacts = result.artifacts();
        let scripts = artifacts.iter().filter(|a| a.kind == ArtifactKind::Script).count();
        let stylesheets = artifacts.len() - scripts;

        Logger::info("📊 Build Statistics");
        Logger::info(&format!("  ⚡ Build time: {:?}", result.build_time));
        Logger::info(&format!("  📦 Entries: {}", result.entry_artifacts.len()));
        Logger::info(&format!("  📄 Modules: {}", result.modules_processed));
        Logger::info(&format!("  📜 Scripts: {}, 🎨 Stylesheets: {}", scripts, stylesheets));
        Logger::info(&format!("  🖼️  Static assets: {}", result.static_assets.len()));

        if self.verbose {
            for artifact in &artifacts {
                Logger::info(&format!("     {} ({} bytes)", artifact.hashed_filename, artifact.size));
            }
            for asset in &result.static_assets {
                Logger::info(&format!("     {} ({} bytes)", asset.hashed_filename, asset.size));
            }
        }
        Ok(())
    }
}
