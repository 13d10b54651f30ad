// Shared utilities module
pub mod config_loader;
pub mod errors;
pub mod hashing;
pub mod logging;
pub mod path_aliases;
pub mod ui;
pub mod watch;

pub use errors::*;
pub use logging::*;
pub use ui::*;
