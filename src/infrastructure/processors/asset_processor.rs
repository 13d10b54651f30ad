use crate::core::models::StaticAsset;
use crate::utils::hashing::{content_digest, ContentHasher};
use crate::utils::{Logger, Result};
use std::path::{Path, PathBuf};

/// Copies static files (images, fonts, anything under the asset root) to the
/// output directory under a content-hashed name.
pub struct AssetProcessor {
    hasher: ContentHasher,
    pattern: String,
    public_path: String,
}

impl AssetProcessor {
    /// `pattern` understands `[path]`, `[name]`, `[hash]` and `[ext]`.
    pub fn new(hasher: ContentHasher, pattern: impl Into<String>, public_path: impl Into<String>) -> Self {
        Self {
            hasher,
            pattern: pattern.into(),
            public_path: public_path.into(),
        }
    }

    pub fn emit(&self, source: &Path, logical_path: &str, in_asset_root: bool, bytes: &[u8]) -> StaticAsset {
        let hash = self.hasher.hash(bytes);
        let hashed_filename = render_filename(&self.pattern, logical_path, &hash);
        Logger::debug(&format!("🖼️  {} → {}", logical_path, hashed_filename));

        StaticAsset {
            source: source.to_path_buf(),
            logical_path: logical_path.to_string(),
            in_asset_root,
            public_url: format!("{}{}", self.public_path, hashed_filename),
            hashed_filename,
            content_hash: content_digest(bytes),
            size: bytes.len(),
        }
    }
}

/// Expand an output filename pattern for one file.
///
/// `[path]` is the logical directory with a trailing `/` (empty at the top
/// level). A file without an extension drops the `.[ext]` part.
pub fn render_filename(pattern: &str, logical_path: &str, hash: &str) -> String {
    let (dir, file) = match logical_path.rfind('/') {
        Some(idx) => (&logical_path[..=idx], &logical_path[idx + 1..]),
        None => ("", logical_path),
    };
    let (name, ext) = match file.rfind('.') {
        Some(idx) if idx > 0 => (&file[..idx], &file[idx + 1..]),
        _ => (file, ""),
    };

    let pattern = if ext.is_empty() {
        pattern.replace(".[ext]", "")
    } else {
        pattern.to_string()
    };
    pattern
        .replace("[path]", dir)
        .replace("[name]", name)
        .replace("[hash]", hash)
        .replace("[ext]", ext)
}

/// True when `logical_path` sits under one of the excluded sub-paths or is a
/// dot file.
pub fn is_excluded(logical_path: &str, exclude: &[String]) -> bool {
    if logical_path.split('/').any(|segment| segment.starts_with('.')) {
        return true;
    }
    exclude.iter().any(|prefix| {
        let prefix = prefix.trim_matches('/');
        !prefix.is_empty()
            && (logical_path == prefix
                || logical_path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/')))
    })
}

/// Every non-excluded file under `asset_root` as `(logical path, absolute
/// path)`, sorted. Directories in `skip` (the output directory, for one) are
/// never entered.
pub fn collect_static_assets(
    asset_root: &Path,
    exclude: &[String],
    skip: &[PathBuf],
) -> Result<Vec<(String, PathBuf)>> {
    let mut found = Vec::new();
    if asset_root.is_dir() {
        walk(asset_root, asset_root, exclude, skip, &mut found)?;
    } else {
        Logger::debug(&format!("No asset root at {}", asset_root.display()));
    }
    found.sort();
    Ok(found)
}

fn walk(
    root: &Path,
    dir: &Path,
    exclude: &[String],
    skip: &[PathBuf],
    out: &mut Vec<(String, PathBuf)>,
) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if skip.iter().any(|s| s == &path) {
            continue;
        }
        let Ok(relative) = path.strip_prefix(root) else { continue };
        let logical = relative.to_string_lossy().replace('\\', "/");
        if is_excluded(&logical, exclude) {
            continue;
        }

        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk(root, &path, exclude, skip, out)?;
        } else if file_type.is_file() {
            out.push((logical, path));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn renders_patterns() {
        assert_eq!(
            render_filename("[path][name].[hash].[ext]", "img/logo.png", "abcd"),
            "img/logo.abcd.png"
        );
        assert_eq!(render_filename("[name].[ext]", "fonts/icons.woff2", "abcd"), "icons.woff2");
        assert_eq!(
            render_filename("[path][name].[hash].[ext]", "vendor/jquery.min.js", "ff"),
            "vendor/jquery.min.ff.js"
        );
        assert_eq!(render_filename("[name].[hash].[ext]", "LICENSE", "ff"), "LICENSE.ff");
    }

    #[test]
    fn exclusions_match_whole_segments() {
        let exclude = vec!["js".to_string(), "/scss/".to_string()];
        assert!(is_excluded("js/app.js", &exclude));
        assert!(is_excluded("scss/theme.scss", &exclude));
        assert!(is_excluded("img/.DS_Store", &exclude));
        assert!(!is_excluded("json/data.json", &exclude));
        assert!(!is_excluded("img/logo.png", &exclude));
    }

    #[test]
    fn collects_sorted_assets() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("assets");
        for file in ["img/b.png", "img/a.png", "js/app.js", "fonts/icons.woff2", "build/old.png"] {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, file).unwrap();
        }

        let found = collect_static_assets(&root, &["js".to_string()], &[root.join("build")]).unwrap();
        let logical: Vec<_> = found.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(logical, vec!["fonts/icons.woff2", "img/a.png", "img/b.png"]);
    }

    #[test]
    fn emits_hashed_asset() {
        let processor = AssetProcessor::new(ContentHasher::new("", 8), "[path][name].[hash].[ext]", "/static/build/");
        let asset = processor.emit(Path::new("/p/assets/img/logo.png"), "img/logo.png", true, b"png-bytes");

        assert!(asset.hashed_filename.starts_with("img/logo."));
        assert!(asset.hashed_filename.ends_with(".png"));
        assert_eq!(asset.hashed_filename.len(), "img/logo..png".len() + 8);
        assert_eq!(asset.public_url, format!("/static/build/{}", asset.hashed_filename));
        assert_eq!(asset.size, 9);
    }
}
