// Built-in plugins: the two manifest writers and build statistics

pub mod bundle_tracker;
pub mod revision_manifest;
pub mod stats_plugin;

pub use bundle_tracker::BundleTrackerPlugin;
pub use revision_manifest::RevisionManifestPlugin;
pub use stats_plugin::StatsPlugin;

use crate::core::models::BuildConfig;
use crate::core::plugin::Plugin;
use std::sync::Arc;

/// Manifest writers for `config`, plus build statistics when `verbose`.
pub fn standard_plugins(config: &BuildConfig, verbose: bool) -> Vec<Arc<dyn Plugin>> {
    let mut plugins: Vec<Arc<dyn Plugin>> = vec![
        Arc::new(BundleTrackerPlugin::new(
            config.bundle_manifest_path.clone(),
            config.environment.clone(),
        )),
        Arc::new(RevisionManifestPlugin::new(
            config.revision_manifest_path.clone(),
            config.revision_exclude.clone(),
        )),
    ];
    if verbose {
        plugins.push(Arc::new(StatsPlugin::new(true)));
    }
    plugins
}
