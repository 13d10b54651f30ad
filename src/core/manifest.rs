//! On-disk manifest formats and the read-side lookups a page renderer uses.
//!
//! Both manifests are plain JSON objects backed by `BTreeMap`s so that two
//! builds over the same inputs serialize to identical bytes.

use crate::core::models::{ArtifactKind, BuildResult};
use crate::utils::{KuraError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One artifact reference as recorded in the bundle-tracker manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestAsset {
    pub kind: ArtifactKind,
    /// Output-directory-relative hashed filename.
    pub name: String,
    /// Public URL, already carrying the build's path prefix.
    pub url: String,
}

/// `{ environment: { entry: [artifact, ...] } }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundleManifest {
    environments: BTreeMap<String, BTreeMap<String, Vec<ManifestAsset>>>,
}

impl BundleManifest {
    pub fn from_build(environment: &str, result: &BuildResult) -> Self {
        let entries = result
            .entry_artifacts
            .iter()
            .map(|(name, artifacts)| {
                let assets = artifacts
                    .iter()
                    .map(|a| ManifestAsset {
                        kind: a.kind,
                        name: a.hashed_filename.clone(),
                        url: a.public_url.clone(),
                    })
                    .collect();
                (name.clone(), assets)
            })
            .collect();

        let mut environments = BTreeMap::new();
        environments.insert(environment.to_string(), entries);
        Self { environments }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    pub fn entry_count(&self, environment: &str) -> usize {
        self.environments
            .get(environment)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    /// Artifacts for `entry`, in include order. Missing entries are an error.
    pub fn entry(&self, environment: &str, entry: &str) -> Result<&[ManifestAsset]> {
        self.environments
            .get(environment)
            .and_then(|entries| entries.get(entry))
            .map(Vec::as_slice)
            .ok_or_else(|| KuraError::MissingEntry(entry.to_string()))
    }

    pub fn script_tags(&self, environment: &str, entry: &str) -> Result<String> {
        self.render(environment, entry, ArtifactKind::Script)
    }

    pub fn link_tags(&self, environment: &str, entry: &str) -> Result<String> {
        self.render(environment, entry, ArtifactKind::Stylesheet)
    }

    /// Stylesheet links followed by scripts.
    pub fn tags_for(&self, environment: &str, entry: &str) -> Result<String> {
        let links = self.link_tags(environment, entry)?;
        let scripts = self.script_tags(environment, entry)?;
        Ok([links, scripts]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn render(&self, environment: &str, entry: &str, kind: ArtifactKind) -> Result<String> {
        let tags: Vec<String> = self
            .entry(environment, entry)?
            .iter()
            .filter(|asset| asset.kind == kind)
            .map(|asset| match asset.kind {
                ArtifactKind::Script => {
                    format!(r#"<script type="text/javascript" src="{}"></script>"#, asset.url)
                }
                ArtifactKind::Stylesheet => {
                    format!(r#"<link rel="stylesheet" type="text/css" href="{}">"#, asset.url)
                }
            })
            .collect();
        Ok(tags.join("\n"))
    }
}

/// `{ "images/logo.png": "/static/build/images/logo.5be0….png" }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionManifest {
    assets: BTreeMap<String, String>,
}

impl RevisionManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, logical_path: impl Into<String>, public_url: impl Into<String>) {
        self.assets.insert(logical_path.into(), public_url.into());
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Hashed public URL for a logical path. A leading `/` is ignored.
    pub fn url_for(&self, logical_path: &str) -> Result<&str> {
        let key = logical_path.trim_start_matches('/');
        self.assets
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| KuraError::MissingAsset(key.to_string()))
    }
}
