// Per-entry module graphs. Modules are loaded once per build and shared
// between entries through the cache.

use crate::core::interfaces::ModuleResolver;
use crate::core::models::*;
use crate::infrastructure::processors::js_processor::{detect_provided, scan_specifiers};
use crate::utils::{KuraError, Logger, Result};
use dashmap::DashMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct ModuleGraphBuilder<'a> {
    root: &'a Path,
    resolver: &'a dyn ModuleResolver,
    cache: DashMap<PathBuf, Arc<ModuleInfo>>,
}

impl<'a> ModuleGraphBuilder<'a> {
    pub fn new(root: &'a Path, resolver: &'a dyn ModuleResolver) -> Self {
        Self {
            root,
            resolver,
            cache: DashMap::new(),
        }
    }

    /// Distinct modules loaded so far across all entries.
    pub fn module_count(&self) -> usize {
        self.cache.len()
    }

    /// Walk `entry` and return its modules dependency-first, entry module last.
    pub fn build(&self, entry: &Entry) -> Result<EntryGraph> {
        if !entry.source_path.is_file() {
            return Err(KuraError::UnresolvedModule {
                entry: entry.name.clone(),
                specifier: entry.source_path.display().to_string(),
                importer: self.root.to_path_buf(),
            });
        }

        let mut visited = HashSet::new();
        let mut modules = Vec::new();
        let root_id = self.visit(entry, &entry.source_path, &mut visited, &mut modules)?;

        Ok(EntryGraph {
            entry: entry.clone(),
            root_id,
            modules,
        })
    }

    fn visit(
        &self,
        entry: &Entry,
        path: &Path,
        visited: &mut HashSet<String>,
        order: &mut Vec<Arc<ModuleInfo>>,
    ) -> Result<String> {
        let id = module_id(self.root, path);
        if !visited.insert(id.clone()) {
            return Ok(id);
        }

        let module = self.load(entry, path, &id)?;
        let edges: Vec<PathBuf> = module
            .dependencies
            .iter()
            .map(|d| d.path.clone())
            .chain(module.provided.iter().map(|p| p.path.clone()))
            .collect();
        for dependency in edges {
            self.visit(entry, &dependency, visited, order)?;
        }

        order.push(module);
        Ok(id)
    }

    fn load(&self, entry: &Entry, path: &Path, id: &str) -> Result<Arc<ModuleInfo>> {
        if let Some(cached) = self.cache.get(path) {
            return Ok(cached.clone());
        }

        let module_type = path
            .extension()
            .and_then(|e| e.to_str())
            .map(ModuleType::from_extension)
            .unwrap_or(ModuleType::Unknown);

        // Stylesheets are compiled from disk later; other files only need a URL.
        let content = match module_type {
            ModuleType::JavaScript | ModuleType::Json | ModuleType::Css => {
                std::fs::read_to_string(path)?
            }
            ModuleType::Scss | ModuleType::Unknown => String::new(),
        };

        let (dependencies, provided) = if module_type == ModuleType::JavaScript {
            (
                self.resolve_imports(entry, path, &content)?,
                self.resolve_provided(path, id, &content),
            )
        } else {
            (Vec::new(), Vec::new())
        };

        Logger::debug(&format!(
            "📄 {} ({} deps, {} provided)",
            id,
            dependencies.len(),
            provided.len()
        ));

        let module = Arc::new(ModuleInfo {
            id: id.to_string(),
            path: path.to_path_buf(),
            content,
            module_type,
            dependencies,
            provided,
        });
        self.cache.insert(path.to_path_buf(), module.clone());
        Ok(module)
    }

    fn resolve_imports(&self, entry: &Entry, path: &Path, content: &str) -> Result<Vec<ResolvedImport>> {
        scan_specifiers(content)
            .into_iter()
            .map(|specifier| {
                let resolved = self.resolver.resolve(&specifier, path).ok_or_else(|| {
                    KuraError::UnresolvedModule {
                        entry: entry.name.clone(),
                        specifier: specifier.clone(),
                        importer: path.to_path_buf(),
                    }
                })?;
                Ok(ResolvedImport {
                    id: module_id(self.root, &resolved),
                    path: resolved,
                    specifier,
                })
            })
            .collect()
    }

    fn resolve_provided(&self, path: &Path, id: &str, content: &str) -> Vec<ProvidedBinding> {
        detect_provided(content)
            .into_iter()
            .filter_map(|(name, specifier)| {
                let Some(resolved) = self.resolver.resolve(specifier, path) else {
                    Logger::warn(&format!(
                        "{} uses '{}' but '{}' cannot be resolved; leaving it global",
                        id, name, specifier
                    ));
                    return None;
                };
                let provided_id = module_id(self.root, &resolved);
                // The providing package itself refers to its own globals.
                (provided_id != id).then(|| ProvidedBinding {
                    name: name.to_string(),
                    path: resolved,
                    id: provided_id,
                })
            })
            .collect()
    }
}

/// Root-relative forward-slash path, so output does not depend on where the
/// project is checked out.
pub fn module_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::node_resolver::NodeModuleResolver;
    use crate::utils::path_aliases::PathAliasResolver;
    use std::fs;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn entry(name: &str, path: PathBuf) -> Entry {
        Entry {
            name: name.to_string(),
            source_path: path,
        }
    }

    #[test]
    fn orders_dependencies_first() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            &root.join("assets/js/dashboard/orders.js"),
            "import { table } from '../lib/table';\nimport '../../scss/orders.scss';\ntable();\n",
        );
        write(
            &root.join("assets/js/lib/table.js"),
            "const fmt = require('./format');\nexport function table() { return fmt; }\n",
        );
        write(&root.join("assets/js/lib/format.js"), "module.exports = 1;\n");
        write(&root.join("assets/scss/orders.scss"), ".orders { color: red; }\n");

        let resolver = NodeModuleResolver::new(root.to_path_buf(), PathAliasResolver::default());
        let builder = ModuleGraphBuilder::new(root, &resolver);
        let graph = builder
            .build(&entry("dashboard/orders", root.join("assets/js/dashboard/orders.js")))
            .unwrap();

        let ids: Vec<_> = graph.modules.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "assets/js/lib/format.js",
                "assets/js/lib/table.js",
                "assets/scss/orders.scss",
                "assets/js/dashboard/orders.js",
            ]
        );
        assert_eq!(graph.root_id, "assets/js/dashboard/orders.js");
        assert_eq!(graph.stylesheets().count(), 1);
    }

    #[test]
    fn unresolved_import_names_the_entry() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(&root.join("assets/js/dashboard/products.js"), "import x from './nope';\n");

        let resolver = NodeModuleResolver::new(root.to_path_buf(), PathAliasResolver::default());
        let builder = ModuleGraphBuilder::new(root, &resolver);
        let err = builder
            .build(&entry("dashboard/products", root.join("assets/js/dashboard/products.js")))
            .unwrap_err();

        assert_eq!(err.entry_name(), Some("dashboard/products"));
        assert!(err.to_string().contains("./nope"));
    }

    #[test]
    fn provided_globals_become_dependencies() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            &root.join("node_modules/jquery/package.json"),
            r#"{"name":"jquery","main":"dist/jquery.js"}"#,
        );
        write(
            &root.join("node_modules/jquery/dist/jquery.js"),
            "var jQuery = function () {};\nwindow.jQuery = window.$ = jQuery;\n",
        );
        write(&root.join("assets/js/storefront.js"), "$('.cart').show();\n");

        let resolver = NodeModuleResolver::new(root.to_path_buf(), PathAliasResolver::default());
        let builder = ModuleGraphBuilder::new(root, &resolver);
        let graph = builder
            .build(&entry("storefront", root.join("assets/js/storefront.js")))
            .unwrap();

        assert_eq!(graph.modules.len(), 2);
        assert_eq!(graph.modules[0].id, "node_modules/jquery/dist/jquery.js");
        assert!(graph.modules[0].provided.is_empty());
        let entry_module = &graph.modules[1];
        assert_eq!(entry_module.provided.len(), 1);
        assert_eq!(entry_module.provided[0].name, "$");
    }

    #[test]
    fn missing_provided_package_is_not_fatal() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(&root.join("assets/js/storefront.js"), "new Popper(a, b);\n");

        let resolver = NodeModuleResolver::new(root.to_path_buf(), PathAliasResolver::default());
        let builder = ModuleGraphBuilder::new(root, &resolver);
        let graph = builder
            .build(&entry("storefront", root.join("assets/js/storefront.js")))
            .unwrap();
        assert_eq!(graph.modules.len(), 1);
        assert!(graph.modules[0].provided.is_empty());
    }

    #[test]
    fn shares_modules_between_entries() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(&root.join("js/a.js"), "require('./shared');\n");
        write(&root.join("js/b.js"), "require('./shared');\n");
        write(&root.join("js/shared.js"), "module.exports = {};\n");

        let resolver = NodeModuleResolver::new(root.to_path_buf(), PathAliasResolver::default());
        let builder = ModuleGraphBuilder::new(root, &resolver);
        builder.build(&entry("a", root.join("js/a.js"))).unwrap();
        builder.build(&entry("b", root.join("js/b.js"))).unwrap();
        assert_eq!(builder.module_count(), 3);
    }
}
