use crate::core::interfaces::ModuleResolver;
use crate::utils::path_aliases::{AliasTarget, PathAliasResolver};
use dashmap::DashMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// The parts of `package.json` that matter for picking an entry file.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageJson {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub browser: Option<BrowserField>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BrowserField {
    String(String),
    Object(HashMap<String, serde_json::Value>),
}

const EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx", "json", "scss", "sass", "css"];
const INDEX_FILES: &[&str] = &["index.js", "index.jsx", "index.mjs", "index.json"];

/// Node-style resolution: relative and root-absolute paths, aliases, then a
/// `node_modules` walk up to the project root.
pub struct NodeModuleResolver {
    root: PathBuf,
    aliases: PathAliasResolver,
    package_cache: DashMap<PathBuf, Option<PackageJson>>,
}

impl NodeModuleResolver {
    pub fn new(root: PathBuf, aliases: PathAliasResolver) -> Self {
        Self {
            root,
            aliases,
            package_cache: DashMap::new(),
        }
    }

    fn resolve_specifier(&self, import_path: &str, from_file: &Path, depth: usize) -> Option<PathBuf> {
        if import_path.starts_with("./") || import_path.starts_with("../") {
            let dir = from_file.parent()?;
            return self.resolve_file_or_directory(&dir.join(import_path));
        }

        if let Some(rest) = import_path.strip_prefix('/') {
            return self.resolve_file_or_directory(&self.root.join(rest));
        }

        // An alias may point at another alias; stop before that becomes a loop.
        if depth < 8 {
            match self.aliases.resolve(import_path) {
                Some(AliasTarget::Path(path)) => {
                    // A missing alias target falls back to normal package lookup.
                    if let Some(found) = self.resolve_file_or_directory(&path) {
                        return Some(found);
                    }
                }
                Some(AliasTarget::Specifier(spec)) if spec != import_path => {
                    return self.resolve_specifier(&spec, from_file, depth + 1)
                }
                _ => {}
            }
        }

        self.resolve_node_module(import_path, from_file)
    }

    fn resolve_node_module(&self, specifier: &str, from_file: &Path) -> Option<PathBuf> {
        let (pkg_name, subpath) = parse_package_specifier(specifier);
        let mut current_dir = from_file.parent();

        while let Some(dir) = current_dir {
            let package_dir = dir.join("node_modules").join(&pkg_name);
            if package_dir.is_dir() {
                if let Some(entry) = self.resolve_package_entry(&package_dir, subpath.as_deref()) {
                    return Some(entry);
                }
            }
            if dir == self.root {
                break;
            }
            current_dir = dir.parent();
        }

        None
    }

    /// `browser` (string form) wins over `module`, then `main`, then `index.*`.
    fn resolve_package_entry(&self, package_dir: &Path, subpath: Option<&str>) -> Option<PathBuf> {
        if let Some(subpath) = subpath {
            return self.resolve_file_or_directory(&package_dir.join(subpath));
        }

        if let Some(pkg) = self.read_package_json(&package_dir.join("package.json")) {
            let candidates = [
                match &pkg.browser {
                    Some(BrowserField::String(path)) => Some(path.as_str()),
                    _ => None,
                },
                pkg.module.as_deref(),
                pkg.main.as_deref(),
            ];
            for field in candidates.into_iter().flatten() {
                if let Some(resolved) = self.resolve_file_or_directory(&package_dir.join(field)) {
                    return Some(resolved);
                }
            }
        }

        self.resolve_index(package_dir)
    }

    fn resolve_file_or_directory(&self, path: &Path) -> Option<PathBuf> {
        if let Some(file) = resolve_as_file(path) {
            return Some(file);
        }
        if !path.is_dir() {
            return None;
        }

        if let Some(pkg) = self.read_package_json(&path.join("package.json")) {
            if let Some(main) = &pkg.main {
                if let Some(resolved) = resolve_as_file(&path.join(main)) {
                    return Some(resolved);
                }
            }
        }

        self.resolve_index(path)
    }

    fn resolve_index(&self, dir: &Path) -> Option<PathBuf> {
        INDEX_FILES
            .iter()
            .map(|index| dir.join(index))
            .find(|candidate| candidate.is_file())
    }

    fn read_package_json(&self, path: &Path) -> Option<PackageJson> {
        if let Some(cached) = self.package_cache.get(path) {
            return cached.clone();
        }

        let package = std::fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str::<PackageJson>(&content).ok());
        self.package_cache.insert(path.to_path_buf(), package.clone());
        package
    }
}

impl ModuleResolver for NodeModuleResolver {
    fn resolve(&self, specifier: &str, importer: &Path) -> Option<PathBuf> {
        self.resolve_specifier(specifier, importer, 0)
            .map(|path| normalize_path(&path))
    }
}

/// Lexically drop `.` and `..` components so module ids are stable.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn resolve_as_file(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }

    let file_name = path.file_name()?.to_str()?;
    EXTENSIONS
        .iter()
        .map(|ext| path.with_file_name(format!("{}.{}", file_name, ext)))
        .find(|candidate| candidate.is_file())
}

/// `@scope/pkg/sub/path` → (`@scope/pkg`, `sub/path`)
fn parse_package_specifier(specifier: &str) -> (String, Option<String>) {
    let segments = if specifier.starts_with('@') { 2 } else { 1 };
    let mut parts = specifier.splitn(segments + 1, '/');
    let name: Vec<&str> = parts.by_ref().take(segments).collect();
    let subpath = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
    (name.join("/"), subpath)
}
