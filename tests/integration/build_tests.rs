use crate::support::Project;
use kura::core::models::{ArtifactKind, BuildMode};
use kura::utils::KuraError;

#[tokio::test]
async fn test_manifest_has_one_key_per_entry() {
    let project = Project::new();
    let config = project.config(BuildMode::Production);

    let result = project.build(&config).await.expect("build should succeed");

    let names: Vec<_> = result.entry_artifacts.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["dashboard/orders", "dashboard/products", "storefront"]);

    let manifest = project.bundle_manifest();
    let entries = manifest["default"].as_object().unwrap();
    let keys: Vec<_> = entries.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["dashboard/orders", "dashboard/products", "storefront"]);
}

#[tokio::test]
async fn test_development_urls_use_dev_server_origin() {
    let project = Project::new();
    let config = project.config(BuildMode::Development);
    project.build(&config).await.unwrap();

    let manifest = project.bundle_manifest();
    for assets in manifest["default"].as_object().unwrap().values() {
        for asset in assets.as_array().unwrap() {
            let url = asset["url"].as_str().unwrap();
            assert!(url.starts_with("http://localhost:2992/static/build/"), "{}", url);
        }
    }
    for url in project.revision_manifest().as_object().unwrap().values() {
        assert!(url.as_str().unwrap().starts_with("http://localhost:2992/static/build/"));
    }
}

#[tokio::test]
async fn test_production_urls_use_static_mount() {
    let project = Project::new();
    let config = project.config(BuildMode::Production);
    project.build(&config).await.unwrap();

    let manifest = project.bundle_manifest();
    for assets in manifest["default"].as_object().unwrap().values() {
        for asset in assets.as_array().unwrap() {
            let url = asset["url"].as_str().unwrap();
            assert!(url.starts_with("/static/build/"), "{}", url);
        }
    }
}

#[tokio::test]
async fn test_manifest_files_exist_on_disk() {
    let project = Project::new();
    let config = project.config(BuildMode::Production);
    let result = project.build(&config).await.unwrap();

    for artifact in result.artifacts() {
        assert!(config.outdir.join(&artifact.hashed_filename).is_file(), "{}", artifact.hashed_filename);
    }
    let manifest = project.bundle_manifest();
    for assets in manifest["default"].as_object().unwrap().values() {
        for asset in assets.as_array().unwrap() {
            assert!(config.outdir.join(asset["name"].as_str().unwrap()).is_file());
        }
    }
    for asset in &result.static_assets {
        assert!(config.outdir.join(&asset.hashed_filename).is_file());
    }
}

#[tokio::test]
async fn test_rebuild_is_byte_identical() {
    let project = Project::new();
    let config = project.config(BuildMode::Production);

    project.build(&config).await.unwrap();
    let bundle_first = project.read("kura-bundle.json");
    let revision_first = project.read("manifest.json");

    project.build(&config).await.unwrap();
    assert_eq!(project.read("kura-bundle.json"), bundle_first);
    assert_eq!(project.read("manifest.json"), revision_first);
}

#[tokio::test]
async fn test_source_change_only_rehashes_that_entry() {
    let project = Project::new();
    let config = project.config(BuildMode::Production);
    let before = project.build(&config).await.unwrap();

    project.write("assets/js/storefront.js", "console.log('storefront!');\n");
    let after = project.build(&config).await.unwrap();

    let script = |result: &kura::core::models::BuildResult, entry: &str| {
        result.entry_artifacts[entry]
            .iter()
            .find(|a| a.kind == ArtifactKind::Script)
            .map(|a| a.hashed_filename.clone())
            .unwrap()
    };
    assert_ne!(script(&before, "storefront"), script(&after, "storefront"));
    assert_eq!(script(&before, "dashboard/orders"), script(&after, "dashboard/orders"));
    assert_eq!(script(&before, "dashboard/products"), script(&after, "dashboard/products"));
}

#[tokio::test]
async fn test_salt_changes_every_hash() {
    let project = Project::new();
    let mut config = project.config(BuildMode::Production);
    let plain = project.build(&config).await.unwrap();

    config.hash_salt = "release-2".to_string();
    let salted = project.build(&config).await.unwrap();

    let plain_names: Vec<_> = plain.artifacts().iter().map(|a| a.hashed_filename.clone()).collect();
    for artifact in salted.artifacts() {
        assert!(!plain_names.contains(&artifact.hashed_filename));
    }
}

#[tokio::test]
async fn test_scss_is_extracted_with_rewritten_urls() {
    let project = Project::new();
    let config = project.config(BuildMode::Development);
    let result = project.build(&config).await.unwrap();

    let orders = &result.entry_artifacts["dashboard/orders"];
    let sheet = orders
        .iter()
        .find(|a| a.kind == ArtifactKind::Stylesheet)
        .expect("orders imports scss");
    assert!(sheet.hashed_filename.starts_with("dashboard/orders."));
    assert!(sheet.hashed_filename.ends_with(".css"));

    let css = std::fs::read_to_string(config.outdir.join(&sheet.hashed_filename)).unwrap();
    assert!(css.contains(".dashboard"));
    assert!(!css.contains("$brand"));
    let logo = result
        .static_assets
        .iter()
        .find(|a| a.logical_path == "images/logo.png")
        .unwrap();
    assert!(css.contains(&logo.public_url), "{}", css);

    assert!(result.entry_artifacts["storefront"]
        .iter()
        .all(|a| a.kind == ArtifactKind::Script));
}

#[tokio::test]
async fn test_unresolved_import_names_the_entry() {
    let project = Project::new();
    project.write("assets/js/dashboard/products.js", "import missing from './missing';\n");
    let config = project.config(BuildMode::Production);

    let err = project.build(&config).await.unwrap_err();
    assert!(matches!(err, KuraError::UnresolvedModule { .. }));
    assert_eq!(err.entry_name(), Some("dashboard/products"));
    assert!(err.format_detailed().contains("./missing"));
    assert!(!project.path("kura-bundle.json").exists());
}

#[tokio::test]
async fn test_identical_duplicate_images_share_an_output() {
    let project = Project::new();
    project.write("assets/images/brand/logo.png", "logo-bytes");
    let mut config = project.config(BuildMode::Production);
    config.asset_filename = "[name].[hash].[ext]".to_string();

    let result = project.build(&config).await.unwrap();

    let revision = project.revision_manifest();
    let first = revision["images/logo.png"].as_str().unwrap();
    let second = revision["images/brand/logo.png"].as_str().unwrap();
    assert_eq!(first, second);
    assert_eq!(result.static_assets.len(), 2);
}

#[tokio::test]
async fn test_different_content_same_name_is_a_collision() {
    let project = Project::new();
    project.write("assets/images/brand/logo.png", "other-logo-bytes");
    let mut config = project.config(BuildMode::Production);
    config.asset_filename = "[name].[ext]".to_string();

    let err = project.build(&config).await.unwrap_err();
    match err {
        KuraError::HashCollision { output, .. } => assert_eq!(output, "logo.png"),
        other => panic!("expected a hash collision, got {other}"),
    }
    assert!(!project.path("manifest.json").exists());
}

#[tokio::test]
async fn test_code_splitting_puts_shared_chunk_first() {
    let project = Project::new();
    let mut config = project.config(BuildMode::Production);
    config.enable_code_splitting = true;

    let result = project.build(&config).await.unwrap();

    assert_eq!(result.shared_artifacts.len(), 1);
    let shared = &result.shared_artifacts[0];
    assert!(shared.hashed_filename.starts_with("commons."));

    for entry in ["dashboard/orders", "dashboard/products"] {
        let artifacts = &result.entry_artifacts[entry];
        assert_eq!(artifacts[0].hashed_filename, shared.hashed_filename);
    }

    let commons = std::fs::read_to_string(config.outdir.join(&shared.hashed_filename)).unwrap();
    assert!(commons.contains("assets/js/lib/format.js"));

    let manifest = project.bundle_manifest();
    assert_eq!(
        manifest["default"]["dashboard/orders"][0]["name"].as_str().unwrap(),
        shared.hashed_filename
    );
}

#[tokio::test]
async fn test_empty_project_builds_empty_manifests() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = kura::core::models::BuildConfig::new(dir.path(), BuildMode::Production);
    config.static_entries.clear();

    let project = Project { dir };
    let result = project.build(&config).await.unwrap();

    assert!(result.entry_artifacts.is_empty());
    assert_eq!(project.bundle_manifest()["default"], serde_json::json!({}));
    assert_eq!(project.revision_manifest(), serde_json::json!({}));
}

fn outside_root_project() -> (Project, kura::core::models::BuildConfig) {
    let project = Project {
        dir: tempfile::tempdir().unwrap(),
    };
    project.write("secret.png", "secret-bytes");
    let config = kura::core::models::BuildConfig::new(project.path("shop"), BuildMode::Production);
    (project, config)
}

fn hashed_copies_of_secret(project: &Project) -> Vec<String> {
    let mut found = Vec::new();
    let mut dirs = vec![project.root().to_path_buf()];
    while let Some(dir) = dirs.pop() {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                dirs.push(path);
            } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with("secret.") && name != "secret.png" {
                    found.push(path.display().to_string());
                }
            }
        }
    }
    found
}

#[tokio::test]
async fn test_stylesheet_url_outside_root_is_unresolved() {
    let (project, config) = outside_root_project();
    project.write("shop/assets/js/storefront.js", "import '../scss/site.scss';\n");
    project.write(
        "shop/assets/scss/site.scss",
        ".hero { background: url('../../../secret.png'); }\n",
    );

    let err = project.build(&config).await.unwrap_err();
    match &err {
        KuraError::UnresolvedModule { specifier, .. } => assert_eq!(specifier, "../../../secret.png"),
        other => panic!("expected an unresolved url, got {other}"),
    }
    assert_eq!(err.entry_name(), Some("storefront"));
    assert!(hashed_copies_of_secret(&project).is_empty());
    assert!(!config.outdir.exists());
}

#[tokio::test]
async fn test_script_import_outside_root_is_unresolved() {
    let (project, config) = outside_root_project();
    project.write(
        "shop/assets/js/storefront.js",
        "import secret from '../../../secret.png';\nconsole.log(secret);\n",
    );

    let err = project.build(&config).await.unwrap_err();
    assert!(matches!(err, KuraError::UnresolvedModule { .. }));
    assert_eq!(err.entry_name(), Some("storefront"));
    assert!(hashed_copies_of_secret(&project).is_empty());
}

#[tokio::test]
async fn test_failed_rebuild_keeps_previous_manifests() {
    let project = Project::new();
    let config = project.config(BuildMode::Production);
    project.build(&config).await.unwrap();
    let bundle = project.read("kura-bundle.json");
    let revision = project.read("manifest.json");

    project.write("assets/js/storefront.js", "import gone from './gone';\n");
    let err = project.build(&config).await.unwrap_err();
    assert_eq!(err.entry_name(), Some("storefront"));

    assert_eq!(project.read("kura-bundle.json"), bundle);
    assert_eq!(project.read("manifest.json"), revision);
}

#[tokio::test]
async fn test_removed_entry_drops_from_manifest() {
    let project = Project::new();
    let config = project.config(BuildMode::Production);
    project.build(&config).await.unwrap();
    assert!(project.bundle_manifest()["default"].get("dashboard/products").is_some());

    std::fs::remove_file(project.path("assets/js/dashboard/products.js")).unwrap();
    project.build(&config).await.unwrap();

    let manifest = project.bundle_manifest();
    let keys: Vec<_> = manifest["default"].as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["dashboard/orders", "storefront"]);
}

#[tokio::test]
async fn test_manifests_are_replaced_together() {
    let project = Project::new();
    let mut config = project.config(BuildMode::Production);
    project.build(&config).await.unwrap();
    let bundle = project.read("kura-bundle.json");

    // The revision manifest's directory is a regular file, so it cannot be staged.
    project.write("blocked", "");
    config.revision_manifest_path = project.path("blocked/manifest.json");
    project.write("assets/js/storefront.js", "console.log('changed');\n");

    let err = project.build(&config).await.unwrap_err();
    assert!(matches!(err, KuraError::ManifestWrite { .. }));
    assert_eq!(project.read("kura-bundle.json"), bundle);
}
