use crate::utils::Logger;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Maps import specifiers onto fixed targets, e.g. `jquery` → a vendored file.
///
/// A target that looks like a path (`./`, `../`, `/`) resolves against the
/// project root; anything else is another bare specifier that the resolver
/// looks up in `node_modules`.
#[derive(Debug, Clone, Default)]
pub struct PathAliasResolver {
    aliases: BTreeMap<String, String>,
    root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasTarget {
    Path(PathBuf),
    Specifier(String),
}

impl PathAliasResolver {
    pub fn new(aliases: BTreeMap<String, String>, root: PathBuf) -> Self {
        Logger::debug(&format!("🔗 {} path aliases", aliases.len()));
        for (alias, target) in &aliases {
            Logger::debug(&format!("  {} → {}", alias, target));
        }

        Self { aliases, root }
    }

    /// Rewrite `import_path` through the longest matching alias.
    pub fn resolve(&self, import_path: &str) -> Option<AliasTarget> {
        let (alias, target) = self
            .aliases
            .iter()
            .filter(|(alias, _)| {
                import_path == alias.as_str()
                    || import_path
                        .strip_prefix(alias.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|(alias, _)| alias.len())?;

        let rest = import_path[alias.len()..].trim_start_matches('/');
        let resolved = if is_path_like(target) {
            let base = self.resolve_target(target);
            AliasTarget::Path(if rest.is_empty() { base } else { base.join(rest) })
        } else if rest.is_empty() {
            AliasTarget::Specifier(target.clone())
        } else {
            AliasTarget::Specifier(format!("{}/{}", target.trim_end_matches('/'), rest))
        };

        Logger::debug(&format!("🔗 Resolved alias: {} → {:?}", import_path, resolved));
        Some(resolved)
    }

    pub fn matches_alias(&self, import_path: &str) -> bool {
        self.resolve(import_path).is_some()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    fn resolve_target(&self, target: &str) -> PathBuf {
        let path = Path::new(target);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(target.trim_start_matches("./"))
        }
    }
}

fn is_path_like(target: &str) -> bool {
    target.starts_with("./") || target.starts_with("../") || target.starts_with('/')
}
