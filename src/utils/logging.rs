use tracing::{debug, error, info, warn};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

pub struct Logger;

impl Logger {
    /// Install the global subscriber. `RUST_LOG` wins over the default filter.
    pub fn init(verbose: bool) {
        let default_filter = if verbose { "kura=debug" } else { "kura=info" };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        // A second init (tests, repeated CLI runs in one process) is harmless.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    }

    pub fn build_start(root: &str, outdir: &str, mode: &str) {
        info!("🔨 kura - {} build", mode);
        info!("📁 Root: {}", root);
        info!("📦 Output: {}", outdir);
    }

    pub fn entries_resolved(count: usize) {
        info!("📦 Resolved {} entries", count);
    }

    pub fn processing_entry(name: &str) {
        debug!("⚡ Compiling entry: {}", name);
    }

    pub fn processing_stylesheet(name: &str) {
        debug!("🎨 Processing stylesheet: {}", name);
    }

    pub fn manifest_written(kind: &str, path: &str, keys: usize) {
        info!("📝 {} manifest: {} ({} keys)", kind, path, keys);
    }

    pub fn info(msg: &str) {
        info!("{}", msg);
    }

    pub fn debug(msg: &str) {
        debug!("{}", msg);
    }

    pub fn error(msg: &str) {
        error!("❌ {}", msg);
    }

    pub fn warn(msg: &str) {
        warn!("⚠️  {}", msg);
    }
}

pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn start(name: &str) -> Self {
        debug!("⏱️  Starting: {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        debug!("⏱️  Completed: {} in {:.2?}", self.name, self.elapsed());
    }
}
