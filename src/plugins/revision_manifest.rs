// Revision manifest: logical static-asset path → hashed public URL.

use crate::core::manifest::RevisionManifest;
use crate::core::models::BuildResult;
use crate::core::plugin::{ManifestFile, Plugin, PluginContext};
use crate::infrastructure::processors::asset_processor::is_excluded;
use crate::utils::{Logger, Result};
use std::path::PathBuf;

/// Records every static asset under the asset root, minus excluded sub-paths.
pub struct RevisionManifestPlugin {
    path: PathBuf,
    exclude: Vec<String>,
}

impl RevisionManifestPlugin {
    pub fn new(path: impl Into<PathBuf>, exclude: Vec<String>) -> Self {
        Self {
            path: path.into(),
            exclude,
        }
    }

    pub fn manifest_for(&self, result: &BuildResult) -> RevisionManifest {
        let mut manifest = RevisionManifest::new();
        for asset in &result.static_assets {
            if asset.in_asset_root && !is_excluded(&asset.logical_path, &self.exclude) {
                manifest.insert(asset.logical_path.clone(), asset.public_url.clone());
            }
        }
        manifest
    }
}

impl Plugin for RevisionManifestPlugin {
    fn name(&self) -> &str {
        "revision-manifest"
    }

    fn manifest(&self, _context: &PluginContext, result: &BuildResult) -> Result<Option<ManifestFile>> {
        let manifest = self.manifest_for(result);
        if manifest.is_empty() {
            Logger::debug("No static assets to record in the revision manifest");
        }
        Ok(Some(ManifestFile {
            label: "Revision",
            path: self.path.clone(),
            contents: manifest.to_json()?.into_bytes(),
            keys: manifest.len(),
        }))
    }
}
