use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Which kind of deployment the build targets. Read once by the CLI and
/// carried in [`BuildConfig`]; nothing below the CLI consults the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Development,
    Production,
}

impl BuildMode {
    /// Anything other than `production` is a development build.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("production") => BuildMode::Production,
            _ => BuildMode::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Development => "development",
            BuildMode::Production => "production",
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, BuildMode::Development)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(BuildMode::Development),
            "production" | "prod" => Ok(BuildMode::Production),
            other => Err(format!(
                "unknown mode '{}', expected 'development' or 'production'",
                other
            )),
        }
    }
}

/// Fully resolved build configuration. All paths are absolute (joined onto `root`).
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub root: PathBuf,
    pub mode: BuildMode,
    pub asset_root: PathBuf,
    pub entry_root: PathBuf,
    pub entry_pattern: String,
    pub static_entries: BTreeMap<String, PathBuf>,
    pub outdir: PathBuf,
    pub dev_server_origin: String,
    pub static_mount: String,
    pub revision_exclude: Vec<String>,
    pub asset_filename: String,
    pub hash_length: usize,
    pub hash_salt: String,
    pub bundle_manifest_path: PathBuf,
    pub revision_manifest_path: PathBuf,
    pub environment: String,
    pub alias: BTreeMap<String, String>,
    pub enable_code_splitting: bool,
    pub shared_chunk_name: String,
    pub shared_chunk_min_entries: usize,
    pub enable_minification: bool,
}

pub const DEFAULT_ASSET_ROOT: &str = "assets";
pub const DEFAULT_ENTRY_ROOT: &str = "assets/js";
pub const DEFAULT_ENTRY_PATTERN: &str = "dashboard/**/*.js";
pub const DEFAULT_OUTDIR: &str = "static/build";
pub const DEFAULT_DEV_SERVER_ORIGIN: &str = "http://localhost:2992";
pub const DEFAULT_STATIC_MOUNT: &str = "/static/build/";
pub const DEFAULT_ASSET_FILENAME: &str = "[path][name].[hash].[ext]";
pub const DEFAULT_BUNDLE_MANIFEST: &str = "kura-bundle.json";
pub const DEFAULT_REVISION_MANIFEST: &str = "manifest.json";
pub const DEFAULT_ENVIRONMENT: &str = "default";
pub const DEFAULT_SHARED_CHUNK_NAME: &str = "commons";

/// Packages pinned to their prebuilt browser bundles.
pub const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("jquery", "./node_modules/jquery/dist/jquery.js"),
    ("react", "./node_modules/react/dist/react.min.js"),
    ("react-dom", "./node_modules/react-dom/dist/react-dom.min.js"),
];

impl BuildConfig {
    /// Defaults for a project rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, mode: BuildMode) -> Self {
        let root = root.into();
        let mut static_entries = BTreeMap::new();
        static_entries.insert(
            "storefront".to_string(),
            root.join("assets/js/storefront.js"),
        );

        Self {
            asset_root: root.join(DEFAULT_ASSET_ROOT),
            entry_root: root.join(DEFAULT_ENTRY_ROOT),
            entry_pattern: DEFAULT_ENTRY_PATTERN.to_string(),
            static_entries,
            outdir: root.join(DEFAULT_OUTDIR),
            dev_server_origin: DEFAULT_DEV_SERVER_ORIGIN.to_string(),
            static_mount: DEFAULT_STATIC_MOUNT.to_string(),
            revision_exclude: vec!["js".to_string(), "scss".to_string()],
            asset_filename: DEFAULT_ASSET_FILENAME.to_string(),
            hash_length: crate::utils::hashing::DEFAULT_HASH_LENGTH,
            hash_salt: String::new(),
            bundle_manifest_path: root.join(DEFAULT_BUNDLE_MANIFEST),
            revision_manifest_path: root.join(DEFAULT_REVISION_MANIFEST),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            alias: BUILTIN_ALIASES
                .iter()
                .map(|(name, target)| (name.to_string(), target.to_string()))
                .collect(),
            enable_code_splitting: false,
            shared_chunk_name: DEFAULT_SHARED_CHUNK_NAME.to_string(),
            shared_chunk_min_entries: 2,
            enable_minification: !mode.is_development(),
            mode,
            root,
        }
    }
}

/// A top-level source module that roots one compiled bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub source_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Script,
    Stylesheet,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Script => "js",
            ArtifactKind::Stylesheet => "css",
        }
    }
}

/// One physical output file produced for an entry (or for the shared chunk).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub entry_name: String,
    pub kind: ArtifactKind,
    /// Un-hashed name, e.g. `dashboard/orders.js`.
    pub logical_name: String,
    /// Output-directory-relative name, e.g. `dashboard/orders.1f3a….js`.
    pub hashed_filename: String,
    pub content_hash: String,
    pub public_url: String,
    pub size: usize,
}

/// A file copied through the file-loader stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticAsset {
    pub source: PathBuf,
    /// Forward-slash path relative to the asset root (or to the project root
    /// for files referenced from outside it).
    pub logical_path: String,
    pub in_asset_root: bool,
    pub hashed_filename: String,
    pub content_hash: String,
    pub public_url: String,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleType {
    JavaScript,
    Json,
    /// Plain CSS imported from script; injected at runtime.
    Css,
    /// SCSS/SASS imported from script; extracted into the entry stylesheet.
    Scss,
    Unknown,
}

impl ModuleType {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" => ModuleType::JavaScript,
            "json" => ModuleType::Json,
            "css" => ModuleType::Css,
            "scss" | "sass" => ModuleType::Scss,
            _ => ModuleType::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImport {
    pub specifier: String,
    pub path: PathBuf,
    pub id: String,
}

/// A name bound from the compile-time provide table, e.g. `$` → `jquery`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidedBinding {
    pub name: String,
    pub path: PathBuf,
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct ModuleInfo {
    /// Root-relative forward-slash path; stable across machines.
    pub id: String,
    pub path: PathBuf,
    pub content: String,
    pub module_type: ModuleType,
    pub dependencies: Vec<ResolvedImport>,
    pub provided: Vec<ProvidedBinding>,
}

impl ModuleInfo {
    pub fn dependency_id(&self, specifier: &str) -> Option<&str> {
        self.dependencies
            .iter()
            .find(|d| d.specifier == specifier)
            .map(|d| d.id.as_str())
    }
}

/// An entry together with its modules in dependency-first order.
#[derive(Debug, Clone)]
pub struct EntryGraph {
    pub entry: Entry,
    pub root_id: String,
    pub modules: Vec<Arc<ModuleInfo>>,
}

impl EntryGraph {
    pub fn stylesheets(&self) -> impl Iterator<Item = &Arc<ModuleInfo>> {
        self.modules
            .iter()
            .filter(|m| m.module_type == ModuleType::Scss)
    }
}

#[derive(Debug, Default, Clone)]
pub struct BuildResult {
    pub public_path: String,
    pub entries: Vec<Entry>,
    /// Entry name → artifacts in include order (shared chunk first).
    pub entry_artifacts: BTreeMap<String, Vec<Artifact>>,
    pub shared_artifacts: Vec<Artifact>,
    pub static_assets: Vec<StaticAsset>,
    pub modules_processed: usize,
    pub build_time: Duration,
}

impl BuildResult {
    /// Every distinct artifact written by the build.
    pub fn artifacts(&self) -> Vec<&Artifact> {
        let mut seen = std::collections::BTreeSet::new();
        self.shared_artifacts
            .iter()
            .chain(self.entry_artifacts.values().flatten())
            .filter(|a| seen.insert(a.hashed_filename.as_str()))
            .collect()
    }
}
