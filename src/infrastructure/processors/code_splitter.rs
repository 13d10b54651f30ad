// Shared-chunk extraction: script modules used by enough entries move into
// one synthetic chunk that every page loads before its own.

use crate::core::models::{EntryGraph, ModuleInfo, ModuleType};
use crate::utils::{KuraError, Logger, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CodeSplitConfig {
    /// Name of the synthetic shared entry
    pub shared_chunk_name: String,
    /// Entries that must include a module before it is extracted
    pub min_entries: usize,
}

impl Default for CodeSplitConfig {
    fn default() -> Self {
        Self {
            shared_chunk_name: "commons".to_string(),
            min_entries: 2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SplitPlan {
    /// Modules placed in the shared chunk, in first-seen order.
    pub shared: Vec<Arc<ModuleInfo>>,
    /// Entry name → modules left in that entry's own chunk.
    pub per_entry: BTreeMap<String, Vec<Arc<ModuleInfo>>>,
}

impl SplitPlan {
    /// Every module stays with its entry.
    pub fn unsplit(graphs: &[EntryGraph]) -> Self {
        Self {
            shared: Vec::new(),
            per_entry: graphs
                .iter()
                .map(|g| (g.entry.name.clone(), g.modules.clone()))
                .collect(),
        }
    }
}

pub struct CodeSplitter {
    config: CodeSplitConfig,
}

impl CodeSplitter {
    pub fn new(config: CodeSplitConfig) -> Self {
        Self { config }
    }

    pub fn split(&self, graphs: &[EntryGraph]) -> Result<SplitPlan> {
        if self.config.min_entries < 2 {
            return Err(KuraError::config(format!(
                "sharedChunkMinEntries must be at least 2, got {}",
                self.config.min_entries
            )));
        }
        if graphs.iter().any(|g| g.entry.name == self.config.shared_chunk_name) {
            return Err(KuraError::config(format!(
                "entry '{}' collides with the shared chunk name",
                self.config.shared_chunk_name
            )));
        }

        let roots: HashSet<&str> = graphs.iter().map(|g| g.root_id.as_str()).collect();
        let mut usage: HashMap<&str, usize> = HashMap::new();
        for graph in graphs {
            for module in &graph.modules {
                *usage.entry(module.id.as_str()).or_default() += 1;
            }
        }

        let is_shared = |module: &ModuleInfo| {
            module.module_type != ModuleType::Scss
                && !roots.contains(module.id.as_str())
                && usage.get(module.id.as_str()).copied().unwrap_or(0) >= self.config.min_entries
        };

        let mut ordered: Vec<&EntryGraph> = graphs.iter().collect();
        ordered.sort_by(|a, b| a.entry.name.cmp(&b.entry.name));

        let mut plan = SplitPlan::default();
        let mut seen = HashSet::new();
        for graph in ordered {
            let mut own = Vec::new();
            for module in &graph.modules {
                if is_shared(module) {
                    if seen.insert(module.id.clone()) {
                        plan.shared.push(module.clone());
                    }
                } else {
                    own.push(module.clone());
                }
            }
            plan.per_entry.insert(graph.entry.name.clone(), own);
        }

        Logger::debug(&format!(
            "✂️  {} module(s) moved to '{}'",
            plan.shared.len(),
            self.config.shared_chunk_name
        ));
        Ok(plan)
    }
}
