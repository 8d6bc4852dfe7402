//! Page emission
//!
//! Turns the chunk partition into final artifacts: one JS bundle per chunk,
//! one extracted stylesheet per page (plus `.chunk.css` files for shared and
//! vendor chunks), hashed image files, a verbatim `img/` copy, and one HTML
//! document per logical page binding exactly the chunks that page owns.
//!
//! Emission always targets an in-memory [`ArtifactSet`] first; the CLI build
//! then writes it to disk (resetting the output directory so stale artifacts
//! never leak between builds), while the dev server swaps it into place
//! atomically.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;
use walkdir::WalkDir;

use crate::assets::{render_function, resolve_stylesheet, Action};
use crate::bundler::{Chunk, ChunkKind, ModuleKind, PageGraph};
use crate::config::{Config, ProfileConfig};
use crate::error::Error;
use crate::utils::module_id;

/// A complete, immutable set of build outputs keyed by output-relative path.
#[derive(Debug, Default, Clone)]
pub struct ArtifactSet {
    files: BTreeMap<String, Vec<u8>>,
}

impl ArtifactSet {
    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(path.into(), bytes);
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(|b| b.as_slice())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<u8>)> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Stage 4: produce the artifact set for a chunk partition.
pub fn emit(
    config: &Config,
    profile: &ProfileConfig,
    page_graph: &PageGraph,
    chunks: &[Chunk],
) -> Result<ArtifactSet> {
    let mut artifacts = ArtifactSet::default();

    emit_scripts(page_graph, chunks, &mut artifacts)?;
    let stylesheets = emit_stylesheets(page_graph, chunks, &mut artifacts)?;
    emit_pages(config, profile, chunks, &stylesheets, &mut artifacts)?;
    copy_static(config, profile, &mut artifacts)?;

    Ok(artifacts)
}

/// Write the artifact set to an output directory, resetting it first so no
/// artifact from an earlier build survives.
pub fn write_to_disk(artifacts: &ArtifactSet, dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)
            .with_context(|| format!("Failed to reset output directory: {}", dir.display()))?;
    }
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    for (path, bytes) in artifacts.iter() {
        let dest = dir.join(path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, bytes)
            .with_context(|| format!("Failed to write artifact: {}", dest.display()))?;
    }

    Ok(())
}

/// Idempotent runtime preamble; every chunk carries it so chunk load order
/// within a page does not matter for registration.
const RUNTIME: &str = r#"var __mpack__ = window.__mpack__ || (window.__mpack__ = (function() {
  var modules = {}, deps = {}, cache = {};
  function load(id) {
    if (cache[id]) return cache[id].exports;
    var module = cache[id] = { exports: {} };
    var fn = modules[id];
    if (fn) {
      fn(module, module.exports, function(spec) {
        var map = deps[id] || {};
        return load(map[spec] !== undefined ? map[spec] : spec);
      });
    }
    return module.exports;
  }
  return { modules: modules, deps: deps, load: load };
})());
"#;

fn emit_scripts(
    page_graph: &PageGraph,
    chunks: &[Chunk],
    artifacts: &mut ArtifactSet,
) -> Result<()> {
    let graph = &page_graph.graph;

    for chunk in chunks {
        let mut code = String::from(RUNTIME);

        for &id in &chunk.modules {
            let module = graph.module(id);
            let identifier = &module.identifier;

            let body = match module.kind {
                ModuleKind::Script => {
                    if !module.dependencies.is_empty() {
                        let map: BTreeMap<&str, &str> = module
                            .dependencies
                            .iter()
                            .map(|(spec, dep)| (spec.as_str(), graph.module(*dep).identifier.as_str()))
                            .collect();
                        code.push_str(&format!(
                            "__mpack__.deps[{}] = {};\n",
                            js_string(identifier),
                            serde_json::to_string(&map)?
                        ));
                    }
                    module
                        .source()
                        .ok_or_else(|| Error::config(format!("module is not UTF-8: {}", identifier)))?
                        .to_string()
                }
                ModuleKind::Style => {
                    // Styles are extracted to css artifacts; the module slot
                    // exports nothing.
                    "module.exports = {};".to_string()
                }
                ModuleKind::Template => {
                    let source = module.source().ok_or_else(|| {
                        Error::config(format!("template is not UTF-8: {}", identifier))
                    })?;
                    render_function(source)
                }
                ModuleKind::Image | ModuleKind::Other => match page_graph.actions.get(&id) {
                    Some(Action::Inline { mime, payload }) => {
                        format!("module.exports = \"data:{};base64,{}\";", mime, payload)
                    }
                    Some(Action::EmitFile { dest }) => {
                        artifacts.insert(dest.clone(), module.bytes.clone());
                        format!("module.exports = \"/{}\";", dest)
                    }
                    _ => "module.exports = {};".to_string(),
                },
            };

            code.push_str(&format!(
                "__mpack__.modules[{}] = function(module, exports, require) {{\n{}\n}};\n",
                js_string(identifier),
                body
            ));
        }

        // Page chunks also kick off their entry module.
        if chunk.kind == ChunkKind::Page {
            if let Some(page) = page_graph.pages.iter().find(|p| p.name == chunk.name) {
                code.push_str(&format!(
                    "__mpack__.load({});\n",
                    js_string(&graph.module(page.entry).identifier)
                ));
            }
        }

        artifacts.insert(format!("js/{}.js", chunk.name), code.into_bytes());
    }

    Ok(())
}

/// Extract chunk styles into css artifacts. Returns chunk name -> emitted
/// stylesheet path for the pages to link against.
fn emit_stylesheets(
    page_graph: &PageGraph,
    chunks: &[Chunk],
    artifacts: &mut ArtifactSet,
) -> Result<BTreeMap<String, String>> {
    let graph = &page_graph.graph;
    let mut stylesheets = BTreeMap::new();

    for chunk in chunks {
        let mut css = String::new();
        for &id in &chunk.modules {
            let module = graph.module(id);
            if module.kind != ModuleKind::Style {
                continue;
            }
            let source = module.source().ok_or_else(|| {
                Error::config(format!("stylesheet is not UTF-8: {}", module.identifier))
            })?;
            css.push_str(&resolve_stylesheet(source, &module.path)?);
            css.push('\n');
        }

        if css.is_empty() {
            continue;
        }

        let path = match chunk.kind {
            ChunkKind::Page => format!("css/{}.css", chunk.name),
            ChunkKind::Shared | ChunkKind::Vendor => format!("css/{}.chunk.css", chunk.name),
        };
        artifacts.insert(path.clone(), css.into_bytes());
        stylesheets.insert(chunk.name.clone(), path);
    }

    Ok(stylesheets)
}

/// Bind each page's chunks to its HTML template.
fn emit_pages(
    config: &Config,
    profile: &ProfileConfig,
    chunks: &[Chunk],
    stylesheets: &BTreeMap<String, String>,
    artifacts: &mut ArtifactSet,
) -> Result<()> {
    for page in &profile.pages {
        let template_path = config.template_path(profile, page)?;
        let template = fs::read_to_string(&template_path).map_err(|e| {
            Error::config(format!(
                "cannot read template for page '{}': {}: {}",
                page.name,
                template_path.display(),
                e
            ))
        })?;

        let owned: Vec<&Chunk> = chunks.iter().filter(|c| c.owned_by(&page.name)).collect();

        let links: String = owned
            .iter()
            .filter_map(|c| stylesheets.get(&c.name))
            .map(|path| format!("  <link rel=\"stylesheet\" href=\"{}\">\n", path))
            .collect();

        let scripts: String = owned
            .iter()
            .map(|c| format!("  <script src=\"js/{}.js\"></script>\n", c.name))
            .collect();

        let html = inject(&template, &links, &scripts);
        artifacts.insert(format!("{}.html", page.name), html.into_bytes());
    }

    Ok(())
}

/// Insert stylesheet links before `</head>` and script tags before
/// `</body>`; append when the template lacks those markers.
fn inject(template: &str, links: &str, scripts: &str) -> String {
    let mut html = template.to_string();

    if !links.is_empty() {
        if let Some(pos) = html.rfind("</head>") {
            html.insert_str(pos, links);
        } else {
            html.insert_str(0, links);
        }
    }

    if !scripts.is_empty() {
        if let Some(pos) = html.rfind("</body>") {
            html.insert_str(pos, scripts);
        } else {
            html.push_str(scripts);
        }
    }

    html
}

/// Copy the profile's static directory verbatim into `img/`.
fn copy_static(
    config: &Config,
    profile: &ProfileConfig,
    artifacts: &mut ArtifactSet,
) -> Result<()> {
    let Some(static_dir) = &profile.static_dir else {
        return Ok(());
    };
    let source = config.root.join(static_dir);
    if !source.is_dir() {
        debug!("Static directory absent, skipping copy: {}", source.display());
        return Ok(());
    }

    let mut entries: Vec<_> = WalkDir::new(&source)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    entries.sort();

    for path in entries {
        let rel = module_id(&path, &source);
        let bytes = fs::read(&path)
            .with_context(|| format!("Failed to read static file: {}", path.display()))?;
        artifacts.insert(format!("img/{}", rel), bytes);
    }

    Ok(())
}

/// Quote a module identifier as a JS string literal.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).expect("string serialization cannot fail")
}
