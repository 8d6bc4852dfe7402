//! Module graph data structures

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use crate::assets::Action;

/// Unique identifier for a module within one build
pub type ModuleId = usize;

/// Kinds of source files the pipeline understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Script,
    Style,
    Template,
    Image,
    Other,
}

impl ModuleKind {
    /// Determine module kind from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "js" | "mjs" | "cjs" => ModuleKind::Script,
            "css" => ModuleKind::Style,
            "ejs" => ModuleKind::Template,
            "png" | "svg" | "jpg" | "jpeg" | "gif" => ModuleKind::Image,
            _ => ModuleKind::Other,
        }
    }
}

/// A module in the dependency graph
#[derive(Debug, Clone)]
pub struct Module {
    /// Absolute path on disk
    pub path: PathBuf,

    /// Stable root-relative identifier (forward slashes); chunk naming and
    /// hashing key off this, never off the absolute path
    pub identifier: String,

    /// Raw file content
    pub bytes: Vec<u8>,

    /// Module kind
    pub kind: ModuleKind,

    /// Whether this is a page entry point
    pub is_entry: bool,

    /// Resolved imports: specifier as written in the source, paired with the
    /// module it resolved to
    pub dependencies: Vec<(String, ModuleId)>,
}

impl Module {
    /// Content size in bytes, the unit the split policy thresholds use
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Source text for script/style/template modules
    pub fn source(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

/// The module dependency graph, shared by all pages of a build
#[derive(Debug, Default)]
pub struct ModuleGraph {
    modules: Vec<Module>,
    path_to_id: HashMap<PathBuf, ModuleId>,
    edges: HashMap<ModuleId, Vec<ModuleId>>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module, returning its id; adding the same path twice returns
    /// the existing id.
    pub fn add_module(&mut self, module: Module) -> ModuleId {
        if let Some(&id) = self.path_to_id.get(&module.path) {
            return id;
        }

        let id = self.modules.len();
        self.path_to_id.insert(module.path.clone(), id);
        self.modules.push(module);
        self.edges.insert(id, Vec::new());
        id
    }

    /// Add a dependency edge between modules
    pub fn add_dependency(&mut self, from: ModuleId, to: ModuleId) {
        let deps = self.edges.entry(from).or_default();
        if !deps.contains(&to) {
            deps.push(to);
        }
    }

    /// Record a module's resolved imports and mirror them as edges.
    pub fn set_dependencies(&mut self, id: ModuleId, dependencies: Vec<(String, ModuleId)>) {
        for &(_, to) in &dependencies {
            self.add_dependency(id, to);
        }
        self.modules[id].dependencies = dependencies;
    }

    pub fn get_module_id(&self, path: &PathBuf) -> Option<ModuleId> {
        self.path_to_id.get(path).copied()
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id]
    }

    /// All modules reachable from `start` (BFS), sorted by identifier so the
    /// result is independent of read order.
    pub fn reachable(&self, start: ModuleId) -> Vec<ModuleId> {
        let mut visited = HashSet::new();
        let mut result = Vec::new();
        let mut queue = VecDeque::new();

        queue.push_back(start);
        visited.insert(start);

        while let Some(id) = queue.pop_front() {
            result.push(id);

            if let Some(deps) = self.edges.get(&id) {
                for &dep_id in deps {
                    if visited.insert(dep_id) {
                        queue.push_back(dep_id);
                    }
                }
            }
        }

        result.sort_by(|a, b| self.modules[*a].identifier.cmp(&self.modules[*b].identifier));
        result
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// One page's slice of the graph
#[derive(Debug)]
pub struct PageModules {
    /// Page name
    pub name: String,

    /// Entry module id
    pub entry: ModuleId,

    /// Full transitive module set, sorted by identifier
    pub modules: Vec<ModuleId>,
}

/// The classified, per-page module graph handed from the graph-building
/// stage to the splitter.
#[derive(Debug)]
pub struct PageGraph {
    pub graph: ModuleGraph,

    /// Pages in profile declaration order
    pub pages: Vec<PageModules>,

    /// Classifier verdict for every non-script module
    pub actions: BTreeMap<ModuleId, Action>,
}

impl PageGraph {
    /// Map each module to the set of pages that reference it.
    pub fn owners(&self) -> BTreeMap<ModuleId, BTreeSet<String>> {
        let mut owners: BTreeMap<ModuleId, BTreeSet<String>> = BTreeMap::new();
        for page in &self.pages {
            for &id in &page.modules {
                owners.entry(id).or_default().insert(page.name.clone());
            }
        }
        owners
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(path: &str) -> Module {
        Module {
            path: PathBuf::from(path),
            identifier: path.trim_start_matches('/').to_string(),
            bytes: b"export {};".to_vec(),
            kind: ModuleKind::Script,
            is_entry: false,
            dependencies: Vec::new(),
        }
    }

    #[test]
    fn test_module_kind_detection() {
        assert_eq!(ModuleKind::from_extension("js"), ModuleKind::Script);
        assert_eq!(ModuleKind::from_extension("css"), ModuleKind::Style);
        assert_eq!(ModuleKind::from_extension("ejs"), ModuleKind::Template);
        assert_eq!(ModuleKind::from_extension("png"), ModuleKind::Image);
        assert_eq!(ModuleKind::from_extension("woff"), ModuleKind::Other);
    }

    #[test]
    fn test_add_module_is_idempotent() {
        let mut graph = ModuleGraph::new();
        let a = graph.add_module(module("/src/a.js"));
        let b = graph.add_module(module("/src/a.js"));
        assert_eq!(a, b);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_reachable_is_sorted_regardless_of_edge_order() {
        let mut graph = ModuleGraph::new();
        let entry = graph.add_module(module("/src/entry.js"));
        let z = graph.add_module(module("/src/z.js"));
        let a = graph.add_module(module("/src/a.js"));
        graph.add_dependency(entry, z);
        graph.add_dependency(entry, a);

        let reachable = graph.reachable(entry);
        let ids: Vec<&str> = reachable
            .iter()
            .map(|&id| graph.module(id).identifier.as_str())
            .collect();
        assert_eq!(ids, vec!["src/a.js", "src/entry.js", "src/z.js"]);
    }

    #[test]
    fn test_owners_tracks_shared_modules() {
        let mut graph = ModuleGraph::new();
        let a = graph.add_module(module("/src/a.js"));
        let b = graph.add_module(module("/src/b.js"));
        let shared = graph.add_module(module("/src/shared.js"));

        let pages = vec![
            PageModules {
                name: "home".to_string(),
                entry: a,
                modules: vec![a, shared],
            },
            PageModules {
                name: "login".to_string(),
                entry: b,
                modules: vec![b, shared],
            },
        ];

        let page_graph = PageGraph {
            graph,
            pages,
            actions: BTreeMap::new(),
        };

        let owners = page_graph.owners();
        assert_eq!(owners[&shared].len(), 2);
        assert_eq!(owners[&a].len(), 1);
    }
}
