// Entry discovery: a pure directory scan that maps logical entry names to
// source files.

use crate::core::models::Entry;
use crate::utils::{KuraError, Logger, Result};
use globset::{Glob, GlobMatcher};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Scan `root` for files matching `pattern` and merge in `static_entries`.
///
/// Auto-discovered names are `<parent dir>/<file stem>`. Traversal is in
/// sorted path order and the last writer wins on a name collision; static
/// entries are merged last so they override discovered ones. A missing root or
/// an empty match set is not an error.
pub fn resolve_entries(
    root: &Path,
    pattern: &str,
    static_entries: &BTreeMap<String, PathBuf>,
) -> Result<Vec<Entry>> {
    let matcher = compile_pattern(pattern)?;
    let mut resolved: BTreeMap<String, PathBuf> = BTreeMap::new();

    let files = if root.is_dir() {
        let mut files = Vec::new();
        collect_files(root, root, &mut files)?;
        files.sort();
        files
    } else {
        Logger::warn(&format!(
            "Entry root {} does not exist, using named entries only",
            root.display()
        ));
        Vec::new()
    };

    for (relative, path) in files {
        if !matcher.is_match(&relative) {
            continue;
        }
        let Some(name) = entry_name_for(&path) else {
            continue;
        };
        if let Some(previous) = resolved.insert(name.clone(), path.clone()) {
            Logger::warn(&format!(
                "Entry '{}' from {} replaces {}",
                name,
                path.display(),
                previous.display()
            ));
        }
    }

    if resolved.is_empty() {
        Logger::debug(&format!(
            "Pattern '{}' matched no files under {}",
            pattern,
            root.display()
        ));
    }

    for (name, path) in static_entries {
        if let Some(previous) = resolved.insert(name.clone(), path.clone()) {
            Logger::warn(&format!(
                "Named entry '{}' overrides discovered {}",
                name,
                previous.display()
            ));
        }
    }

    Ok(resolved
        .into_iter()
        .map(|(name, source_path)| Entry { name, source_path })
        .collect())
}

/// `<parent dir name>/<file stem>` for a discovered entry file.
pub fn entry_name_for(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    match path.parent().and_then(|p| p.file_name()).and_then(|n| n.to_str()) {
        Some(parent) => Some(format!("{}/{}", parent, stem)),
        None => Some(stem.to_string()),
    }
}

fn compile_pattern(pattern: &str) -> Result<GlobMatcher> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|e| KuraError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

/// Collect `(root-relative forward-slash path, absolute path)` for every file.
fn collect_files(root: &Path, dir: &Path, out: &mut Vec<(String, PathBuf)>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            collect_files(root, &path, out)?;
        } else if file_type.is_file() {
            if let Ok(relative) = path.strip_prefix(root) {
                let relative = relative.to_string_lossy().replace('\\', "/");
                out.push((relative, path));
            }
        }
    }
    Ok(())
}
