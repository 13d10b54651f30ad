use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KuraError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid entry pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Entry '{entry}': cannot resolve '{specifier}' imported from {}", importer.display())]
    UnresolvedModule {
        entry: String,
        specifier: String,
        importer: PathBuf,
    },

    #[error(
        "Hash collision on '{output}': {existing} and {incoming} have different content but the same output name"
    )]
    HashCollision {
        output: String,
        existing: String,
        incoming: String,
    },

    #[error("Failed to write manifest {}: {source}", path.display())]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Entry '{entry}': stylesheet {} failed: {message}", path.display())]
    Stylesheet {
        entry: String,
        path: PathBuf,
        message: String,
    },

    #[error("Build error: {0}")]
    Build(String),

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("Entry '{0}' is not present in the bundle manifest")]
    MissingEntry(String),

    #[error("Asset '{0}' is not present in the revision manifest")]
    MissingAsset(String),
}

impl KuraError {
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Entry the failure is attributed to, when there is one.
    pub fn entry_name(&self) -> Option<&str> {
        match self {
            KuraError::UnresolvedModule { entry, .. } | KuraError::Stylesheet { entry, .. } => {
                Some(entry)
            }
            KuraError::MissingEntry(entry) => Some(entry),
            _ => None,
        }
    }

    /// Single-line report used by the CLI when a build aborts.
    pub fn format_detailed(&self) -> String {
        match self.entry_name() {
            Some(entry) => format!("❌ Build failed in entry '{}': {}", entry, self),
            None => format!("❌ Build failed: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, KuraError>;

impl From<regex::Error> for KuraError {
    fn from(err: regex::Error) -> Self {
        KuraError::build(format!("Regex error: {}", err))
    }
}

impl From<notify::Error> for KuraError {
    fn from(err: notify::Error) -> Self {
        KuraError::Watch(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_module_names_the_entry() {
        let err = KuraError::UnresolvedModule {
            entry: "dashboard/orders".to_string(),
            specifier: "./missing".to_string(),
            importer: PathBuf::from("assets/js/dashboard/orders.js"),
        };

        assert_eq!(err.entry_name(), Some("dashboard/orders"));
        let report = err.format_detailed();
        assert!(report.contains("dashboard/orders"));
        assert!(report.contains("./missing"));
    }

    #[test]
    fn collision_has_no_entry() {
        let err = KuraError::HashCollision {
            output: "logo.png".to_string(),
            existing: "images/logo.png".to_string(),
            incoming: "css/img/logo.png".to_string(),
        };

        assert_eq!(err.entry_name(), None);
        assert!(err.to_string().contains("images/logo.png"));
        assert!(err.format_detailed().starts_with("❌ Build failed:"));
    }
}
