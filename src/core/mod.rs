// Core domain layer
pub mod emit;
pub mod entries;
pub mod graph;
pub mod interfaces;
pub mod manifest;
pub mod models;
pub mod plugin;
pub mod public_path;
pub mod services;

pub use interfaces::*;
pub use models::*;
pub use services::*;
