use crate::core::emit::{ClaimOutcome, EmitRegistry};
use crate::core::entries::resolve_entries;
use crate::core::graph::ModuleGraphBuilder;
use crate::core::plugin::{Plugin, PluginContext, PluginManager};
use crate::core::public_path::public_path_for;
use crate::core::{interfaces::*, models::*};
use crate::infrastructure::node_resolver::normalize_path;
use crate::infrastructure::{
    is_excluded, rewrite_urls, AssetProcessor, CodeSplitConfig, CodeSplitter, NodeModuleResolver,
    RegistryJsProcessor, SplitPlan, StylesheetProcessor, TokioFileSystemService,
};
use crate::utils::hashing::{content_digest, hashed_filename, ContentHasher};
use crate::utils::path_aliases::PathAliasResolver;
use crate::utils::{CompletionStats, KuraError, KuraUI, Logger, OutputFileInfo, Result, Timer};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Main build service implementation
pub struct KuraBuildService {
    fs_service: Arc<dyn FileSystemService>,
    js_processor: Arc<dyn JsProcessor>,
    css_processor: Arc<dyn CssProcessor>,
    plugin_manager: PluginManager,
    show_ui: bool,
}

impl KuraBuildService {
    pub fn new(
        fs_service: Arc<dyn FileSystemService>,
        js_processor: Arc<dyn JsProcessor>,
        css_processor: Arc<dyn CssProcessor>,
    ) -> Self {
        Self {
            fs_service,
            js_processor,
            css_processor,
            plugin_manager: PluginManager::new(),
            show_ui: true,
        }
    }

    /// Tokio file system, registry script output and grass/lightningcss
    /// stylesheets, configured for `config`.
    pub fn with_defaults(config: &BuildConfig) -> Self {
        let css = StylesheetProcessor::new(config.enable_minification)
            .with_load_paths([config.asset_root.clone(), config.root.join("node_modules")]);
        Self::new(
            Arc::new(TokioFileSystemService),
            Arc::new(RegistryJsProcessor::new()),
            Arc::new(css),
        )
    }

    pub fn with_plugins(mut self, plugins: impl IntoIterator<Item = Arc<dyn Plugin>>) -> Self {
        for plugin in plugins {
            self.plugin_manager.register(plugin);
        }
        self
    }

    /// Suppress the banner and completion summary.
    pub fn quiet(mut self) -> Self {
        self.show_ui = false;
        self
    }

    async fn resolve_graphs(&self, config: &BuildConfig, entries: &[Entry]) -> Result<(Vec<EntryGraph>, usize)> {
        let _timer = Timer::start("module resolution");
        let root = config.root.clone();
        let alias = config.alias.clone();
        let entries = entries.to_vec();

        tokio::task::spawn_blocking(move || {
            let resolver = NodeModuleResolver::new(root.clone(), PathAliasResolver::new(alias, root.clone()));
            let builder = ModuleGraphBuilder::new(&root, &resolver);

            let results: Vec<Result<EntryGraph>> = entries
                .par_iter()
                .map(|entry| {
                    Logger::processing_entry(&entry.name);
                    builder.build(entry)
                })
                .collect();

            // First failure in entry order, so the report is stable.
            let graphs = results.into_iter().collect::<Result<Vec<_>>>()?;
            Ok((graphs, builder.module_count()))
        })
        .await
        .map_err(|e| KuraError::build(format!("module resolution task failed: {}", e)))?
    }

    /// Give imported plain CSS and imported files their final content.
    fn prepare_module(
        &self,
        entry: &str,
        module: &Arc<ModuleInfo>,
        stage: &mut AssetStage<'_>,
        outputs: &mut Outputs,
    ) -> Result<Arc<ModuleInfo>> {
        let content = match module.module_type {
            ModuleType::Css => {
                let rewritten = stage.rewrite_stylesheet(entry, &module.path, &module.content, outputs)?;
                self.css_processor.finalize(&rewritten, &module.path)
            }
            ModuleType::Unknown => stage.add(entry, &module.path, outputs)?.public_url.clone(),
            _ => return Ok(module.clone()),
        };

        let mut prepared = (**module).clone();
        prepared.content = content;
        Ok(Arc::new(prepared))
    }

    fn compile_stylesheet(
        &self,
        graph: &EntryGraph,
        stage: &mut AssetStage<'_>,
        outputs: &mut Outputs,
    ) -> Result<Option<String>> {
        let mut parts = Vec::new();
        for module in graph.stylesheets() {
            let css = self.css_processor.process_stylesheet(&graph.entry.name, &module.path)?;
            parts.push(stage.rewrite_stylesheet(&graph.entry.name, &module.path, &css, outputs)?);
        }
        if parts.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.css_processor.finalize(&parts.join("\n"), &graph.entry.source_path)))
    }

    fn artifact(
        &self,
        entry_name: &str,
        kind: ArtifactKind,
        content: &[u8],
        hasher: &ContentHasher,
        public_path: &str,
    ) -> Artifact {
        let hash = hasher.hash(content);
        let hashed = hashed_filename(entry_name, &hash, kind.extension());
        Artifact {
            entry_name: entry_name.to_string(),
            kind,
            logical_name: format!("{}.{}", entry_name, kind.extension()),
            public_url: format!("{}{}", public_path, hashed),
            hashed_filename: hashed,
            content_hash: hash,
            size: content.len(),
        }
    }
}

#[async_trait::async_trait]
impl BuildService for KuraBuildService {
    async fn build(&mut self, config: &BuildConfig) -> Result<BuildResult> {
        let ui = KuraUI::new();
        if self.show_ui {
            ui.show_banner(config.mode.as_str());
        }
        let build_start = Instant::now();
        Logger::build_start(
            &config.root.display().to_string(),
            &config.outdir.display().to_string(),
            config.mode.as_str(),
        );

        // Chosen once; every URL in this build uses it.
        let public_path = public_path_for(config);
        let context = PluginContext::new(config.clone(), public_path.clone());
        if self.plugin_manager.plugin_count() > 0 {
            Logger::debug(&format!(
                "Running on_build_start for {} plugins",
                self.plugin_manager.plugin_count()
            ));
        }
        self.plugin_manager.on_build_start(&context)?;

        let entries = resolve_entries(&config.entry_root, &config.entry_pattern, &config.static_entries)?;
        Logger::entries_resolved(entries.len());

        let (graphs, modules_processed) = self.resolve_graphs(config, &entries).await?;

        let hasher = ContentHasher::new(config.hash_salt.clone(), config.hash_length);
        let asset_processor = AssetProcessor::new(hasher.clone(), config.asset_filename.clone(), public_path.clone());
        let mut outputs = Outputs::default();
        let mut stage = AssetStage::new(config, &asset_processor);

        // File-loader stage: everything under the asset root that is not excluded.
        {
            let _timer = Timer::start("static assets");
            let skip = [
                config.outdir.clone(),
                config.bundle_manifest_path.clone(),
                config.revision_manifest_path.clone(),
            ];
            for (logical, path) in crate::infrastructure::collect_static_assets(
                &config.asset_root,
                &config.revision_exclude,
                &skip,
            )? {
                stage.add_logical(&path, &logical, true, &mut outputs)?;
            }
        }

        let plan = if config.enable_code_splitting {
            CodeSplitter::new(CodeSplitConfig {
                shared_chunk_name: config.shared_chunk_name.clone(),
                min_entries: config.shared_chunk_min_entries,
            })
            .split(&graphs)?
        } else {
            SplitPlan::unsplit(&graphs)
        };

        Logger::debug(&format!(
            "Stylesheet minification: {}",
            self.css_processor.supports_minification()
        ));

        let mut definitions = DefinitionCache::default();

        let mut shared_artifacts = Vec::new();
        if !plan.shared.is_empty() {
            let shared_name = config.shared_chunk_name.as_str();
            let defs = plan
                .shared
                .iter()
                .map(|m| definitions.get_or_define(self, shared_name, m, &mut stage, &mut outputs))
                .collect::<Result<Vec<_>>>()?;
            let chunk = self.js_processor.bundle_chunk(&defs, None);
            let artifact = self.artifact(shared_name, ArtifactKind::Script, chunk.as_bytes(), &hasher, &public_path);
            outputs.add(&artifact.hashed_filename, chunk.into_bytes(), shared_name)?;
            shared_artifacts.push(artifact);
        }

        let mut entry_artifacts = BTreeMap::new();
        for graph in &graphs {
            let name = graph.entry.name.as_str();
            let _timer = Timer::start(&format!("entry {}", name));
            let own = plan.per_entry.get(name).map(Vec::as_slice).unwrap_or_default();

            let defs = own
                .iter()
                .map(|m| definitions.get_or_define(self, name, m, &mut stage, &mut outputs))
                .collect::<Result<Vec<_>>>()?;
            let chunk = self.js_processor.bundle_chunk(&defs, Some(&graph.root_id));

            let mut artifacts = shared_artifacts.clone();
            let script = self.artifact(name, ArtifactKind::Script, chunk.as_bytes(), &hasher, &public_path);
            outputs.add(&script.hashed_filename, chunk.into_bytes(), name)?;
            artifacts.push(script);

            if let Some(css) = self.compile_stylesheet(graph, &mut stage, &mut outputs)? {
                let sheet = self.artifact(name, ArtifactKind::Stylesheet, css.as_bytes(), &hasher, &public_path);
                outputs.add(&sheet.hashed_filename, css.into_bytes(), name)?;
                artifacts.push(sheet);
            }

            entry_artifacts.insert(name.to_string(), artifacts);
        }

        // Every name is claimed; only now does anything touch the output directory.
        self.fs_service.create_directory(&config.outdir).await?;
        {
            let _timer = Timer::start("write outputs");
            let writes = outputs.files.iter().map(|(name, bytes)| {
                let path = config.outdir.join(name);
                let fs_service = self.fs_service.clone();
                async move { fs_service.write_file(&path, bytes).await }
            });
            futures::future::try_join_all(writes).await?;
        }

        let result = BuildResult {
            public_path,
            entries,
            entry_artifacts,
            shared_artifacts,
            static_assets: stage.into_assets(),
            modules_processed,
            build_time: build_start.elapsed(),
        };

        // Manifests are replaced together, and only after every output exists.
        let manifests = self.plugin_manager.manifests(&context, &result)?;
        if !manifests.is_empty() {
            let files = manifests
                .iter()
                .map(|m| (m.path.clone(), m.contents.clone()))
                .collect();
            self.fs_service.write_atomic(files).await?;
            for manifest in &manifests {
                Logger::manifest_written(manifest.label, &manifest.path.display().to_string(), manifest.keys);
            }
        }
        self.plugin_manager.on_build_end(&context, &result)?;

        if self.show_ui {
            let mut output_files: Vec<OutputFileInfo> = result
                .artifacts()
                .into_iter()
                .map(|a| OutputFileInfo {
                    name: a.hashed_filename.clone(),
                    size: a.size,
                })
                .chain(result.static_assets.iter().map(|a| OutputFileInfo {
                    name: a.hashed_filename.clone(),
                    size: a.size,
                }))
                .collect();
            output_files.sort_by(|a, b| a.name.cmp(&b.name));
            output_files.dedup_by(|a, b| a.name == b.name);

            ui.show_completion(CompletionStats {
                outdir_label: outdir_label(&config.root, &config.outdir),
                output_files,
                entry_count: result.entry_artifacts.len(),
                asset_count: result.static_assets.len(),
            });
        }

        Ok(result)
    }
}

/// One registry definition per module id, shared by every chunk that
/// includes the module.
#[derive(Default)]
struct DefinitionCache {
    definitions: HashMap<String, String>,
}

impl DefinitionCache {
    fn get_or_define(
        &mut self,
        service: &KuraBuildService,
        entry: &str,
        module: &Arc<ModuleInfo>,
        stage: &mut AssetStage<'_>,
        outputs: &mut Outputs,
    ) -> Result<String> {
        if let Some(existing) = self.definitions.get(&module.id) {
            return Ok(existing.clone());
        }
        let prepared = service.prepare_module(entry, module, stage, outputs)?;
        let definition = service.js_processor.process_module(&prepared)?;
        self.definitions.insert(module.id.clone(), definition.clone());
        Ok(definition)
    }
}

/// Files scheduled for writing, keyed through the emit registry.
#[derive(Default)]
struct Outputs {
    registry: EmitRegistry,
    files: Vec<(String, Vec<u8>)>,
}

impl Outputs {
    fn add(&mut self, output: &str, bytes: Vec<u8>, owner: &str) -> Result<()> {
        if !is_safe_output_name(output) {
            return Err(KuraError::build(format!(
                "output name '{}' for '{}' escapes the output directory",
                output, owner
            )));
        }
        match self.registry.claim(output, &content_digest(&bytes), owner)? {
            ClaimOutcome::New => self.files.push((output.to_string(), bytes)),
            ClaimOutcome::Duplicate => {
                Logger::debug(&format!("{} already emitted with identical content", output))
            }
        }
        Ok(())
    }
}

/// Static files emitted during this build, indexed by source path.
struct AssetStage<'a> {
    processor: &'a AssetProcessor,
    root: &'a Path,
    asset_root: &'a Path,
    exclude: &'a [String],
    assets: Vec<StaticAsset>,
    index: HashMap<PathBuf, usize>,
}

impl<'a> AssetStage<'a> {
    fn new(config: &'a BuildConfig, processor: &'a AssetProcessor) -> Self {
        Self {
            processor,
            root: &config.root,
            asset_root: &config.asset_root,
            exclude: &config.revision_exclude,
            assets: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn add_logical(
        &mut self,
        path: &Path,
        logical: &str,
        in_asset_root: bool,
        outputs: &mut Outputs,
    ) -> Result<&StaticAsset> {
        if let Some(&idx) = self.index.get(path) {
            return Ok(&self.assets[idx]);
        }

        let bytes = std::fs::read(path)?;
        let asset = self.processor.emit(path, logical, in_asset_root, &bytes);
        outputs.add(&asset.hashed_filename, bytes, logical)?;

        self.index.insert(path.to_path_buf(), self.assets.len());
        self.assets.push(asset);
        Ok(&self.assets[self.assets.len() - 1])
    }

    /// Emit a file referenced from a stylesheet or imported from script.
    /// Files outside both the asset root and the project root have no
    /// output name and fail the entry.
    fn add(&mut self, entry: &str, path: &Path, outputs: &mut Outputs) -> Result<&StaticAsset> {
        let (logical, in_asset_root) = if let Ok(rel) = path.strip_prefix(self.asset_root) {
            let logical = forward_slashes(rel);
            let recorded = !is_excluded(&logical, self.exclude);
            (logical, recorded)
        } else if let Ok(rel) = path.strip_prefix(self.root) {
            (forward_slashes(rel), false)
        } else {
            return Err(KuraError::UnresolvedModule {
                entry: entry.to_string(),
                specifier: path.display().to_string(),
                importer: self.root.to_path_buf(),
            });
        };
        self.add_logical(path, &logical, in_asset_root, outputs)
    }

    fn rewrite_stylesheet(
        &mut self,
        entry: &str,
        stylesheet: &Path,
        css: &str,
        outputs: &mut Outputs,
    ) -> Result<String> {
        let dir = stylesheet.parent().unwrap_or(self.root).to_path_buf();
        rewrite_urls(css, |url| {
            let resolved = self.resolve_url(url, &dir).ok_or_else(|| KuraError::UnresolvedModule {
                entry: entry.to_string(),
                specifier: url.to_string(),
                importer: stylesheet.to_path_buf(),
            })?;
            Ok(self.add(entry, &resolved, outputs)?.public_url.clone())
        })
    }

    /// Relative to the stylesheet first, then to the asset root. A leading
    /// `~` names a package in `node_modules`. Targets outside the project
    /// and asset roots never match.
    fn resolve_url(&self, url: &str, stylesheet_dir: &Path) -> Option<PathBuf> {
        let candidates = match url.strip_prefix('~') {
            Some(package_path) => vec![self.root.join("node_modules").join(package_path)],
            None => vec![stylesheet_dir.join(url), self.asset_root.join(url)],
        };
        candidates
            .into_iter()
            .map(|candidate| normalize_path(&candidate))
            .filter(|candidate| candidate.starts_with(self.root) || candidate.starts_with(self.asset_root))
            .find(|candidate| candidate.is_file())
    }

    fn into_assets(self) -> Vec<StaticAsset> {
        self.assets
    }
}

/// Relative, with only plain components, so `outdir.join(name)` stays
/// inside the output directory.
fn is_safe_output_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('\\')
        && Path::new(name)
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)))
}

fn forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn outdir_label(root: &Path, outdir: &Path) -> String {
    let relative = outdir.strip_prefix(root).unwrap_or(outdir);
    format!("{}/", forward_slashes(relative).trim_end_matches('/'))
}
