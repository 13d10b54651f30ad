use crate::core::models::{BuildConfig, BuildMode};
use crate::utils::{KuraError, Logger, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "kura.config.json";

/// Configuration file format (kura.config.json). Every key is optional;
/// relative paths are resolved against the project root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KuraConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_root: Option<String>,

    /// Directory the entry pattern is matched against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_root: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_pattern: Option<String>,

    /// Static entries, name → source file. Replaces the built-in table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<BTreeMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outdir: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_server_origin: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_mount: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision_exclude: Option<Vec<String>>,

    /// Output name pattern for static assets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_filename: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_length: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_salt: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_manifest: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision_manifest: Option<String>,

    /// Key the bundle manifest groups entries under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<BTreeMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_splitting: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_chunk_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_chunk_min_entries: Option<usize>,

    /// Defaults to on for production builds only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minify: Option<bool>,
}

/// Settings given on the command line; these win over the config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub outdir: Option<String>,
    pub hash_salt: Option<String>,
    pub code_splitting: Option<bool>,
}

/// Config loader that supports config files with CLI override
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load `kura.config.json` from the project root if it exists.
    pub fn load_from_file(root: &Path) -> Result<Option<KuraConfig>> {
        let config_path = root.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            Logger::debug(&format!("No {} found, using defaults", CONFIG_FILE_NAME));
            return Ok(None);
        }

        Logger::debug(&format!("Loading config from {}", config_path.display()));

        let content = std::fs::read_to_string(&config_path)?;
        let config: KuraConfig = serde_json::from_str(&content).map_err(|e| {
            KuraError::config(format!("Failed to parse {}: {}", CONFIG_FILE_NAME, e))
        })?;

        Logger::debug("✅ Config file loaded successfully");
        Ok(Some(config))
    }

    /// Layer defaults, then the config file, then CLI overrides.
    pub fn merge_with_cli(
        root: PathBuf,
        mode: BuildMode,
        file_config: Option<KuraConfig>,
        overrides: CliOverrides,
    ) -> BuildConfig {
        let file = file_config.unwrap_or_default();
        let mut config = BuildConfig::new(root.clone(), mode);
        let rooted = |value: &str| resolve_path(&root, value);

        if let Some(v) = file.asset_root.as_deref() {
            config.asset_root = rooted(v);
        }
        if let Some(v) = file.entry_root.as_deref() {
            config.entry_root = rooted(v);
        }
        if let Some(v) = file.entry_pattern {
            config.entry_pattern = v;
        }
        if let Some(entries) = file.entries {
            config.static_entries = entries
                .into_iter()
                .map(|(name, path)| (name, rooted(&path)))
                .collect();
        }
        if let Some(v) = overrides.outdir.as_deref().or(file.outdir.as_deref()) {
            config.outdir = rooted(v);
        }
        if let Some(v) = file.dev_server_origin {
            config.dev_server_origin = v;
        }
        if let Some(v) = file.static_mount {
            config.static_mount = v;
        }
        if let Some(v) = file.revision_exclude {
            config.revision_exclude = v;
        }
        if let Some(v) = file.asset_filename {
            config.asset_filename = v;
        }
        if let Some(v) = file.hash_length {
            config.hash_length = v;
        }
        if let Some(v) = overrides.hash_salt.or(file.hash_salt) {
            config.hash_salt = v;
        }
        if let Some(v) = file.bundle_manifest.as_deref() {
            config.bundle_manifest_path = rooted(v);
        }
        if let Some(v) = file.revision_manifest.as_deref() {
            config.revision_manifest_path = rooted(v);
        }
        if let Some(v) = file.environment {
            config.environment = v;
        }
        if let Some(v) = file.alias {
            config.alias.extend(v);
        }
        if let Some(v) = overrides.code_splitting.or(file.code_splitting) {
            config.enable_code_splitting = v;
        }
        if let Some(v) = file.shared_chunk_name {
            config.shared_chunk_name = v;
        }
        if let Some(v) = file.shared_chunk_min_entries {
            config.shared_chunk_min_entries = v;
        }
        if let Some(v) = file.minify {
            config.enable_minification = v;
        }

        config
    }
}

fn resolve_path(root: &Path, value: &str) -> PathBuf {
    if Path::new(value).is_absolute() {
        PathBuf::from(value)
    } else {
        root.join(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_file_not_exists() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = ConfigLoader::load_from_file(temp_dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_load_from_file_valid() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            r#"{"outdir": "public/build", "hashSalt": "v2", "entries": {"admin": "assets/js/admin.js"}}"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(temp_dir.path()).unwrap().unwrap();
        assert_eq!(config.outdir.as_deref(), Some("public/build"));
        assert_eq!(config.hash_salt.as_deref(), Some("v2"));
        assert_eq!(config.entries.unwrap().len(), 1);
    }

    #[test]
    fn test_load_from_file_invalid() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILE_NAME), r#"{"outDirectory": 1}"#).unwrap();

        let err = ConfigLoader::load_from_file(temp_dir.path()).unwrap_err();
        assert!(matches!(err, KuraError::Config(_)));
    }

    #[test]
    fn test_merge_with_cli_override() {
        let file_config = KuraConfig {
            outdir: Some("build".to_string()),
            code_splitting: Some(false),
            hash_salt: Some("file".to_string()),
            minify: Some(false),
            ..Default::default()
        };

        let merged = ConfigLoader::merge_with_cli(
            PathBuf::from("/srv/shop"),
            BuildMode::Production,
            Some(file_config),
            CliOverrides {
                outdir: Some("dist-override".to_string()),
                hash_salt: None,
                code_splitting: Some(true),
            },
        );

        assert_eq!(merged.outdir, PathBuf::from("/srv/shop/dist-override"));
        assert!(merged.enable_code_splitting);
        assert_eq!(merged.hash_salt, "file");
        assert!(!merged.enable_minification);
    }

    #[test]
    fn test_file_entries_replace_defaults() {
        let file_config = KuraConfig {
            entries: Some(BTreeMap::from([(
                "admin".to_string(),
                "assets/js/admin.js".to_string(),
            )])),
            ..Default::default()
        };
        let merged = ConfigLoader::merge_with_cli(
            PathBuf::from("/srv/shop"),
            BuildMode::Development,
            Some(file_config),
            CliOverrides::default(),
        );

        assert_eq!(merged.static_entries.len(), 1);
        assert_eq!(
            merged.static_entries["admin"],
            PathBuf::from("/srv/shop/assets/js/admin.js")
        );
        assert!(merged.static_entries.get("storefront").is_none());
    }
}
