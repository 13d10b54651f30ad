use crate::core::models::*;
use crate::utils::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// File system operations interface
#[async_trait]
pub trait FileSystemService: Send + Sync {
    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<()>;
    /// Replace each `(path, content)` through a sibling temp file. No target
    /// is renamed until every temp file is written.
    async fn write_atomic(&self, files: Vec<(PathBuf, Vec<u8>)>) -> Result<()>;
    async fn create_directory(&self, path: &Path) -> Result<()>;
}

/// Resolves an import specifier to a file on disk.
pub trait ModuleResolver: Send + Sync {
    fn resolve(&self, specifier: &str, importer: &Path) -> Option<PathBuf>;
}

/// Script module processing interface
pub trait JsProcessor: Send + Sync {
    /// Rewrite one module into a registry definition.
    fn process_module(&self, module: &ModuleInfo) -> Result<String>;
    /// Concatenate module definitions into one chunk.
    fn bundle_chunk(&self, definitions: &[String], entry_id: Option<&str>) -> String;
}

/// Stylesheet processing interface
pub trait CssProcessor: Send + Sync {
    /// Compile one stylesheet source to plain CSS. Failures name `entry`.
    fn process_stylesheet(&self, entry: &str, path: &Path) -> Result<String>;
    /// Final pass over an entry's concatenated stylesheet.
    fn finalize(&self, css: &str, path: &Path) -> String;
    fn supports_minification(&self) -> bool;
}

/// Build service interface
#[async_trait]
pub trait BuildService: Send + Sync {
    async fn build(&mut self, config: &BuildConfig) -> Result<BuildResult>;
}
