// Watch mode: rebuild whenever a source file under the project root changes.

use crate::core::interfaces::BuildService;
use crate::core::models::BuildConfig;
use crate::utils::{Logger, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Configuration for watch mode
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Quiet period after the last change before a rebuild starts
    pub debounce_ms: u64,
    pub verbose: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            verbose: false,
        }
    }
}

pub struct KuraWatcher {
    config: WatchConfig,
    build_config: BuildConfig,
    /// Build outputs; changes here must not trigger another build.
    ignored: Vec<PathBuf>,
}

impl KuraWatcher {
    pub fn new(config: WatchConfig, build_config: BuildConfig) -> Self {
        let ignored = vec![
            build_config.outdir.clone(),
            build_config.bundle_manifest_path.clone(),
            build_config.revision_manifest_path.clone(),
        ];
        Self {
            config,
            build_config,
            ignored,
        }
    }

    /// Build once, then rebuild on change until Ctrl+C. A failed build is
    /// logged and watching continues.
    pub async fn watch<B: BuildService>(&self, build_service: &mut B) -> Result<()> {
        let root = &self.build_config.root;
        Logger::info("👀 Watch mode started - monitoring for changes...");
        Logger::info(&format!("   Watching: {}", root.display()));
        Logger::info("   Press Ctrl+C to stop");

        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if let Ok(event) = res {
                    let _ = tx.send(event);
                }
            },
            notify::Config::default(),
        )?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        self.rebuild(build_service, 0).await;

        let debounce = Duration::from_millis(self.config.debounce_ms);
        let mut pending: BTreeSet<PathBuf> = BTreeSet::new();
        let mut last_change = Instant::now();

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    Logger::info("👋 Stopping watch mode...");
                    break;
                }
                event = rx.recv() => {
                    let Some(event) = event else {
                        Logger::warn("Watch channel disconnected");
                        break;
                    };
                    if is_relevant_kind(&event.kind) {
                        for path in event.paths {
                            if !self.should_ignore(&path) {
                                if self.config.verbose {
                                    Logger::debug(&format!("Changed: {}", path.display()));
                                }
                                pending.insert(path);
                                last_change = Instant::now();
                            }
                        }
                    }
                }
                _ = tokio::time::sleep(Duration::from_millis(50)), if !pending.is_empty() => {
                    if last_change.elapsed() >= debounce {
                        let changed = std::mem::take(&mut pending);
                        self.rebuild(build_service, changed.len()).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn rebuild<B: BuildService>(&self, build_service: &mut B, changed: usize) {
        if changed > 0 {
            Logger::info(&format!("🔄 Rebuilding... ({} files changed)", changed));
        }
        let start = Instant::now();
        match build_service.build(&self.build_config).await {
            Ok(result) => Logger::info(&format!(
                "✅ Build complete in {}ms ({} entries, {} modules)",
                start.elapsed().as_millis(),
                result.entry_artifacts.len(),
                result.modules_processed
            )),
            Err(e) => Logger::error(&format!("Build failed: {}", e)),
        }
    }

    fn should_ignore(&self, path: &Path) -> bool {
        if self.ignored.iter().any(|ignored| path.starts_with(ignored)) {
            return true;
        }
        let in_tooling_dir = path
            .components()
            .any(|c| matches!(c.as_os_str().to_str(), Some(".git" | "node_modules")));
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        in_tooling_dir || name.ends_with('~') || name.ends_with(".swp") || name.starts_with(".tmp")
    }
}

fn is_relevant_kind(kind: &EventKind) -> bool {
    !matches!(kind, EventKind::Access(_) | EventKind::Other)
}
