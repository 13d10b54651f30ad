use crate::core::interfaces::FileSystemService;
use crate::utils::{KuraError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;

pub struct TokioFileSystemService;

#[async_trait::async_trait]
impl FileSystemService for TokioFileSystemService {
    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.create_directory(parent).await?;
        }

        fs::write(path, content).await.map_err(KuraError::Io)
    }

    async fn write_atomic(&self, files: Vec<(PathBuf, Vec<u8>)>) -> Result<()> {
        tokio::task::spawn_blocking(move || write_atomic_all(&files))
            .await
            .map_err(|e| KuraError::build(format!("write task failed: {}", e)))?
    }

    async fn create_directory(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await.map_err(KuraError::Io)
    }
}

/// Replace every target in two phases: write and sync a temp file next to
/// each one, then rename them all. A failure in the first phase leaves every
/// target untouched, and a reader sees either the old file or the new one.
pub fn write_atomic_all(files: &[(PathBuf, Vec<u8>)]) -> Result<()> {
    let mut staged = Vec::with_capacity(files.len());
    for (path, content) in files {
        staged.push((path, stage(path, content)?));
    }
    for (path, tmp) in staged {
        tmp.persist(path).map_err(|e| manifest_error(path, e.error))?;
    }
    Ok(())
}

// The temp file lives next to the target so the rename never crosses a
// filesystem.
fn stage(path: &Path, content: &[u8]) -> Result<NamedTempFile> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| manifest_error(path, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| manifest_error(path, e))?;
    tmp.write_all(content).map_err(|e| manifest_error(path, e))?;
    tmp.as_file().sync_all().map_err(|e| manifest_error(path, e))?;
    Ok(tmp)
}

fn manifest_error(path: &Path, source: std::io::Error) -> KuraError {
    KuraError::ManifestWrite {
        path: path.to_path_buf(),
        source,
    }
}
