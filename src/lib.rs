// kura - build-time asset pipeline
// Content-hashed bundles, bundle-tracker and revision manifests

pub mod cli;
pub mod core;
pub mod infrastructure;
pub mod plugins;
pub mod utils;
