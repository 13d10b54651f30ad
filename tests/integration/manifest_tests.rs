use crate::support::Project;
use kura::core::manifest::{BundleManifest, RevisionManifest};
use kura::core::models::BuildMode;
use kura::utils::KuraError;

#[tokio::test]
async fn test_revision_manifest_excludes_scripts_and_stylesheets() {
    let project = Project::new();
    project.write("assets/fonts/icons.woff2", "font-bytes");
    let config = project.config(BuildMode::Production);
    project.build(&config).await.unwrap();

    let revision = project.revision_manifest();
    let keys: Vec<_> = revision.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["fonts/icons.woff2", "images/logo.png"]);
}

#[tokio::test]
async fn test_tags_render_from_bundle_manifest() {
    let project = Project::new();
    let config = project.config(BuildMode::Production);
    project.build(&config).await.unwrap();

    let manifest = BundleManifest::load(&config.bundle_manifest_path).unwrap();
    let tags = manifest.tags_for("default", "dashboard/orders").unwrap();
    let link = tags.find("<link").expect("stylesheet link");
    let script = tags.find("<script").expect("script tag");
    assert!(link < script);
    assert!(tags.contains("/static/build/dashboard/orders."));

    let err = manifest.tags_for("default", "dashboard/missing").unwrap_err();
    assert!(matches!(err, KuraError::MissingEntry(_)));
}

#[tokio::test]
async fn test_asset_lookup_from_revision_manifest() {
    let project = Project::new();
    let config = project.config(BuildMode::Production);
    project.build(&config).await.unwrap();

    let manifest = RevisionManifest::load(&config.revision_manifest_path).unwrap();
    let url = manifest.url_for("images/logo.png").unwrap();
    assert!(url.starts_with("/static/build/images/logo."));
    assert!(url.ends_with(".png"));
    assert_eq!(manifest.url_for("/images/logo.png").unwrap(), url);

    let err = manifest.url_for("images/missing.png").unwrap_err();
    assert!(matches!(err, KuraError::MissingAsset(_)));
}

#[tokio::test]
async fn test_manifests_end_with_newline() {
    let project = Project::new();
    let config = project.config(BuildMode::Production);
    project.build(&config).await.unwrap();

    assert!(project.read("kura-bundle.json").ends_with("}\n"));
    assert!(project.read("manifest.json").ends_with("}\n"));
}
