// Bundle-tracker manifest: entry name → ordered list of emitted artifacts.

use crate::core::manifest::BundleManifest;
use crate::core::models::BuildResult;
use crate::core::plugin::{ManifestFile, Plugin, PluginContext};
use crate::utils::Result;
use std::path::PathBuf;

/// Renders the bundle-tracker manifest once every artifact is on disk.
pub struct BundleTrackerPlugin {
    path: PathBuf,
    environment: String,
}

impl BundleTrackerPlugin {
    pub fn new(path: impl Into<PathBuf>, environment: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            environment: environment.into(),
        }
    }
}

impl Plugin for BundleTrackerPlugin {
    fn name(&self) -> &str {
        "bundle-tracker"
    }

    fn manifest(&self, _context: &PluginContext, result: &BuildResult) -> Result<Option<ManifestFile>> {
        let manifest = BundleManifest::from_build(&self.environment, result);
        Ok(Some(ManifestFile {
            label: "Bundle",
            path: self.path.clone(),
            contents: manifest.to_json()?.into_bytes(),
            keys: manifest.entry_count(&self.environment),
        }))
    }
}
