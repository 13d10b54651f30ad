use kura::core::models::{BuildConfig, BuildMode, BuildResult};
use kura::core::{BuildService, KuraBuildService};
use kura::plugins::standard_plugins;
use kura::utils::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway project laid out like a typical storefront/dashboard site.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let project = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        project.write(
            "assets/js/dashboard/orders.js",
            "import { formatPrice } from '../lib/format';\nimport '../../scss/dashboard.scss';\n\nexport function render(total) {\n  return formatPrice(total);\n}\n",
        );
        project.write(
            "assets/js/dashboard/products.js",
            "const { formatPrice } = require('../lib/format');\nmodule.exports = formatPrice(10);\n",
        );
        project.write(
            "assets/js/lib/format.js",
            "export function formatPrice(value) {\n  return '$' + value.toFixed(2);\n}\n",
        );
        project.write("assets/js/storefront.js", "console.log('storefront');\n");
        project.write(
            "assets/scss/dashboard.scss",
            "$brand: #336699;\n.dashboard {\n  color: $brand;\n  background: url('../images/logo.png');\n}\n",
        );
        project.write("assets/images/logo.png", "logo-bytes");
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    pub fn config(&self, mode: BuildMode) -> BuildConfig {
        BuildConfig::new(self.root(), mode)
    }

    pub async fn build(&self, config: &BuildConfig) -> Result<BuildResult> {
        let mut service = KuraBuildService::with_defaults(config)
            .with_plugins(standard_plugins(config, false))
            .quiet();
        service.build(config).await
    }

    pub fn bundle_manifest(&self) -> serde_json::Value {
        serde_json::from_str(&self.read("kura-bundle.json")).unwrap()
    }

    pub fn revision_manifest(&self) -> serde_json::Value {
        serde_json::from_str(&self.read("manifest.json")).unwrap()
    }
}
