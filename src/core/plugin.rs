// Build lifecycle hooks. Manifest writers and build statistics hang off these.

use crate::core::models::{BuildConfig, BuildResult};
use crate::utils::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// Context provided to plugins during execution
#[derive(Debug, Clone)]
pub struct PluginContext {
    /// Current build configuration
    pub config: BuildConfig,
    /// Public path prefix chosen once for this build
    pub public_path: String,
}

impl PluginContext {
    pub fn new(config: BuildConfig, public_path: String) -> Self {
        Self { config, public_path }
    }
}

/// A manifest rendered by a plugin, written by the build service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
    /// Human label for logs, e.g. `Bundle`
    pub label: &'static str,
    pub path: PathBuf,
    pub contents: Vec<u8>,
    /// Top-level keys, for the log line
    pub keys: usize,
}

/// Hooks into the build lifecycle.
///
/// Manifests from every plugin are replaced together once all outputs are on
/// disk, then `on_build_end` runs. A plugin that records output paths never
/// refers to a file that does not exist.
pub trait Plugin: Send + Sync {
    /// Unique name for this plugin
    fn name(&self) -> &str;

    /// Called at the start of a build
    fn on_build_start(&self, _context: &PluginContext) -> Result<()> {
        Ok(())
    }

    /// Render this plugin's manifest, if it writes one
    fn manifest(&self, _context: &PluginContext, _result: &BuildResult) -> Result<Option<ManifestFile>> {
        Ok(None)
    }

    /// Called once the build has succeeded and all files are written
    fn on_build_end(&self, _context: &PluginContext, _result: &BuildResult) -> Result<()> {
        Ok(())
    }
}

/// Manages plugin registration and execution
#[derive(Default)]
pub struct PluginManager {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin. Hooks run in registration order.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    pub fn on_build_start(&self, context: &PluginContext) -> Result<()> {
        for plugin in &self.plugins {
            plugin.on_build_start(context)?;
        }
        Ok(())
    }

    /// Every plugin's manifest, rendered before any of them is written.
    pub fn manifests(&self, context: &PluginContext, result: &BuildResult) -> Result<Vec<ManifestFile>> {
        let mut manifests = Vec::new();
        for plugin in &self.plugins {
            if let Some(manifest) = plugin.manifest(context, result)? {
                manifests.push(manifest);
            }
        }
        Ok(manifests)
    }

    pub fn on_build_end(&self, context: &PluginContext, result: &BuildResult) -> Result<()> {
        for plugin in &self.plugins {
            plugin.on_build_end(context, result)?;
        }
        Ok(())
    }
}
