use crate::core::models::{BuildConfig, BuildMode};

/// Public base URL for every emitted file.
///
/// Development builds point at the dev-server origin; production builds are
/// served from the page's own origin under the static mount.
pub fn select_public_path(mode: BuildMode, dev_server_origin: &str, static_mount: &str) -> String {
    let mount = normalize_mount(static_mount);
    match mode {
        BuildMode::Development => {
            format!("{}{}", dev_server_origin.trim_end_matches('/'), mount)
        }
        BuildMode::Production => mount,
    }
}

pub fn public_path_for(config: &BuildConfig) -> String {
    select_public_path(config.mode, &config.dev_server_origin, &config.static_mount)
}

/// `static/build` → `/static/build/`
fn normalize_mount(mount: &str) -> String {
    let trimmed = mount.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}
