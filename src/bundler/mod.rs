//! Build pipeline orchestration
//!
//! The build is an ordered sequence of pure stages, each consuming the
//! previous stage's output:
//!
//! ```text
//! classify -> build_graph -> split -> emit
//! ```
//!
//! Classification validates the asset rule table and is applied per file as
//! modules are loaded; graph building produces one transitive module set per
//! logical page; splitting partitions the union into chunks; emission binds
//! chunks to HTML templates and produces the artifact set. A failure in any
//! stage aborts before a single artifact is written.

mod chunk;
mod graph;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::assets::Classifier;
use crate::config::Config;
use crate::emit::{self, ArtifactSet};
use crate::error::Error;
use crate::resolver::Resolver;
use crate::utils::module_id;

pub use chunk::{split, Chunk, ChunkKind, SplitPolicy, VendorGroup};
pub use graph::{Module, ModuleGraph, ModuleId, ModuleKind, PageGraph, PageModules};

/// Result of a build written to disk
#[derive(Debug)]
pub struct BuildReport {
    /// Emitted artifacts as (output-relative path, size in bytes)
    pub artifacts: Vec<(String, usize)>,
}

/// The bundler facade: runs the staged pipeline for one profile.
pub struct Bundler {
    config: Arc<Config>,
    profile: String,
}

impl Bundler {
    pub fn new(config: Arc<Config>, profile: impl Into<String>) -> Self {
        Self {
            config,
            profile: profile.into(),
        }
    }

    /// Run the full pipeline into an in-memory artifact set. Nothing touches
    /// the filesystem; this is what the dev server swaps atomically.
    pub fn build_artifacts(&self) -> Result<ArtifactSet> {
        let start = Instant::now();

        let classifier = classify(&self.config)?;

        info!("Building module graph...");
        let page_graph = build_graph(&self.config, &self.profile, &classifier)?;

        info!("Splitting chunks...");
        let policy = SplitPolicy::from(&self.config.split);
        let chunks = split(&page_graph, &policy);

        info!("Emitting pages...");
        let profile = self.config.profile(&self.profile)?;
        let artifacts = emit::emit(&self.config, profile, &page_graph, &chunks)?;

        debug!("Build completed in {:?}", start.elapsed());

        Ok(artifacts)
    }

    /// Run the full pipeline and write the result to the output directory.
    /// The directory is fully reset first, but only once the whole build has
    /// succeeded, so a failed build leaves prior artifacts in place.
    pub fn build(&self) -> Result<BuildReport> {
        let artifacts = self.build_artifacts()?;

        let out_dir = self.config.output_dir();
        emit::write_to_disk(&artifacts, &out_dir)?;

        Ok(BuildReport {
            artifacts: artifacts
                .iter()
                .map(|(path, bytes)| (path.clone(), bytes.len()))
                .collect(),
        })
    }
}

/// Stage 1: build and validate the asset rule table.
pub fn classify(config: &Config) -> Result<Classifier> {
    Classifier::with_defaults(config.assets.inline_threshold)
}

/// Stage 2: construct one dependency subgraph per page by statically
/// resolving imports from each entry module, classifying every non-script
/// file as it is loaded.
pub fn build_graph(config: &Config, profile: &str, classifier: &Classifier) -> Result<PageGraph> {
    let profile_config = config.profile(profile)?;

    let root = fs::canonicalize(&config.root)
        .with_context(|| format!("Failed to resolve project root: {}", config.root.display()))?;

    let mut loader = GraphLoader {
        root: root.clone(),
        resolver: Resolver::new(root),
        classifier,
        graph: ModuleGraph::new(),
        actions: BTreeMap::new(),
    };

    let mut pages = Vec::new();

    for page in &profile_config.pages {
        let entry_path = config.entry_path(page);
        if !entry_path.is_file() {
            return Err(Error::config(format!(
                "entry module for page '{}' does not exist: {}",
                page.name,
                entry_path.display()
            ))
            .into());
        }

        debug!("Processing page '{}' -> {}", page.name, entry_path.display());
        let entry = loader.load(&entry_path, &page.name, true)?;
        let modules = loader.graph.reachable(entry);

        pages.push(PageModules {
            name: page.name.clone(),
            entry,
            modules,
        });
    }

    Ok(PageGraph {
        graph: loader.graph,
        pages,
        actions: loader.actions,
    })
}

struct GraphLoader<'a> {
    root: PathBuf,
    resolver: Resolver,
    classifier: &'a Classifier,
    graph: ModuleGraph,
    actions: BTreeMap<ModuleId, crate::assets::Action>,
}

impl GraphLoader<'_> {
    /// Load one module and, for scripts, its transitive imports.
    fn load(&mut self, path: &Path, page: &str, is_entry: bool) -> Result<ModuleId> {
        let canonical = fs::canonicalize(path)
            .with_context(|| format!("Failed to resolve module path: {}", path.display()))?;

        if let Some(id) = self.graph.get_module_id(&canonical) {
            return Ok(id);
        }

        let bytes = fs::read(&canonical)
            .with_context(|| format!("Failed to read module: {}", canonical.display()))?;

        let kind = canonical
            .extension()
            .and_then(|e| e.to_str())
            .map(ModuleKind::from_extension)
            .unwrap_or(ModuleKind::Other);

        let identifier = module_id(&canonical, &self.root);

        let id = self.graph.add_module(Module {
            path: canonical.clone(),
            identifier: identifier.clone(),
            bytes,
            kind,
            is_entry,
            dependencies: Vec::new(),
        });

        if kind == ModuleKind::Script {
            let source = self
                .graph
                .module(id)
                .source()
                .ok_or_else(|| Error::config(format!("module is not UTF-8: {}", identifier)))?
                .to_string();

            let mut dependencies = Vec::new();
            for specifier in self.resolver.extract_dependencies(&source) {
                let resolved =
                    self.resolver
                        .resolve(&specifier, &canonical)
                        .ok_or_else(|| Error::Resolution {
                            specifier: specifier.clone(),
                            importer: identifier.clone(),
                            page: page.to_string(),
                        })?;
                let dep_id = self.load(&resolved, page, false)?;
                dependencies.push((specifier, dep_id));
            }
            self.graph.set_dependencies(id, dependencies);
        } else {
            // Per-file classification happens at load time so an unmatched
            // asset fails the build up front.
            let action = self
                .classifier
                .classify(&canonical, &self.graph.module(id).bytes)?;
            self.actions.insert(id, action);
        }

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn project() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/mpa")).unwrap();
        fs::create_dir_all(root.join("public")).unwrap();
        fs::write(root.join("public/index.html"), "<html><body></body></html>").unwrap();
        let config = Config::default_config(root);
        (dir, config)
    }

    #[test]
    fn test_missing_entry_names_the_page() {
        let (_dir, config) = project();
        let classifier = classify(&config).unwrap();
        let err = build_graph(&config, "multi", &classifier).unwrap_err();
        assert!(err.to_string().contains("page 'home'"));
    }

    #[test]
    fn test_unresolved_import_names_module_and_page() {
        let (dir, config) = project();
        fs::write(
            dir.path().join("src/mpa/home.js"),
            "import missing from './nowhere';",
        )
        .unwrap();
        fs::write(dir.path().join("src/mpa/login.js"), "export {};").unwrap();

        let classifier = classify(&config).unwrap();
        let err = build_graph(&config, "multi", &classifier).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'./nowhere'"));
        assert!(msg.contains("src/mpa/home.js"));
        assert!(msg.contains("page 'home'"));
    }

    #[test]
    fn test_overlapping_modules_have_two_owners() {
        let (dir, config) = project();
        let root = dir.path();
        fs::write(root.join("src/mpa/common.js"), "export const shared = 1;").unwrap();
        fs::write(
            root.join("src/mpa/home.js"),
            "import { shared } from './common';",
        )
        .unwrap();
        fs::write(
            root.join("src/mpa/login.js"),
            "import { shared } from './common';",
        )
        .unwrap();

        let classifier = classify(&config).unwrap();
        let page_graph = build_graph(&config, "multi", &classifier).unwrap();

        let owners = page_graph.owners();
        let common = page_graph
            .pages
            .iter()
            .flat_map(|p| p.modules.iter())
            .find(|&&id| page_graph.graph.module(id).identifier == "src/mpa/common.js")
            .copied()
            .unwrap();
        assert_eq!(owners[&common].len(), 2);
    }

    #[test]
    fn test_assets_are_classified_at_load_time() {
        let (dir, config) = project();
        let root = dir.path();
        fs::create_dir_all(root.join("src/mpa/css")).unwrap();
        fs::write(root.join("src/mpa/css/public.css"), "body{color:red}").unwrap();
        fs::write(root.join("src/mpa/home.js"), "import './css/public.css';").unwrap();
        fs::write(root.join("src/mpa/login.js"), "export {};").unwrap();

        let classifier = classify(&config).unwrap();
        let page_graph = build_graph(&config, "multi", &classifier).unwrap();
        assert_eq!(page_graph.actions.len(), 1);
    }
}
