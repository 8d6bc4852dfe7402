//! Chunk generation for code splitting
//!
//! Partitions the union of all pages' modules into chunks:
//!
//! 1. modules matching a vendor group pattern go to that group's named
//!    chunk, regardless of size (first-declared group wins ties);
//! 2. modules referenced by two or more pages form a shared chunk named by
//!    the owning page names joined with the policy delimiter, provided the
//!    grouped size reaches the minimum; below it the modules are duplicated
//!    into each owner's own chunk instead of paying an extra tiny request;
//! 3. everything else stays in its sole owner's chunk.
//!
//! All module lists are ordered by identifier before naming, so chunk
//! contents and names are deterministic regardless of read order.

use std::collections::{BTreeMap, BTreeSet};

use super::graph::{ModuleId, PageGraph};
use crate::config::SplitConfig;

/// Type of chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// Dedicated chunk for a pinned third-party dependency
    Vendor,
    /// Modules shared by two or more pages
    Shared,
    /// One page's own modules; also carries the entry invocation
    Page,
}

/// A named, independently loadable group of modules
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Chunk name (used for output filenames)
    pub name: String,

    /// Type of chunk
    pub kind: ChunkKind,

    /// Member modules, ordered by identifier
    pub modules: Vec<ModuleId>,

    /// Pages whose documents must load this chunk
    pub owners: BTreeSet<String>,
}

impl Chunk {
    /// Whether this chunk is loaded by the given page
    pub fn owned_by(&self, page: &str) -> bool {
        self.owners.contains(page)
    }
}

/// A vendor cache group
#[derive(Debug, Clone)]
pub struct VendorGroup {
    pub name: String,
    pub pattern: String,
}

/// Splitting policy derived from configuration
#[derive(Debug, Clone)]
pub struct SplitPolicy {
    pub vendor_groups: Vec<VendorGroup>,
    pub min_shared_size: u64,
    pub delimiter: String,
}

impl From<&SplitConfig> for SplitPolicy {
    fn from(config: &SplitConfig) -> Self {
        Self {
            vendor_groups: config
                .vendor
                .iter()
                .map(|g| VendorGroup {
                    name: g.name.clone(),
                    pattern: g.pattern.clone(),
                })
                .collect(),
            min_shared_size: config.min_shared_size,
            delimiter: config.delimiter.clone(),
        }
    }
}

/// Compute the chunk partition for a classified page graph.
pub fn split(page_graph: &PageGraph, policy: &SplitPolicy) -> Vec<Chunk> {
    let graph = &page_graph.graph;
    let owners = page_graph.owners();

    // Stable walk order: every decision below sees modules sorted by
    // identifier.
    let mut all: Vec<ModuleId> = owners.keys().copied().collect();
    all.sort_by(|a, b| graph.module(*a).identifier.cmp(&graph.module(*b).identifier));

    let mut vendor_members: Vec<Vec<ModuleId>> = vec![Vec::new(); policy.vendor_groups.len()];
    let mut vendor_owners: Vec<BTreeSet<String>> =
        vec![BTreeSet::new(); policy.vendor_groups.len()];
    let mut shared_groups: BTreeMap<BTreeSet<String>, Vec<ModuleId>> = BTreeMap::new();
    let mut page_members: BTreeMap<String, Vec<ModuleId>> = BTreeMap::new();

    for &id in &all {
        let identifier = &graph.module(id).identifier;
        let owning = &owners[&id];

        // First-declared vendor group wins when several patterns match.
        if let Some(group_idx) = policy
            .vendor_groups
            .iter()
            .position(|g| identifier.contains(&g.pattern))
        {
            vendor_members[group_idx].push(id);
            vendor_owners[group_idx].extend(owning.iter().cloned());
            continue;
        }

        if owning.len() >= 2 {
            shared_groups.entry(owning.clone()).or_default().push(id);
        } else {
            let page = owning.iter().next().expect("module with no owner");
            page_members.entry(page.clone()).or_default().push(id);
        }
    }

    let mut shared_chunks: Vec<Chunk> = Vec::new();
    for (owning, modules) in shared_groups {
        let size: u64 = modules.iter().map(|&id| graph.module(id).size()).sum();
        if size >= policy.min_shared_size {
            let name = owning
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(&policy.delimiter);
            shared_chunks.push(Chunk {
                name,
                kind: ChunkKind::Shared,
                modules,
                owners: owning,
            });
        } else {
            // Too small to be worth a request of its own: duplicate into
            // every owner's page chunk.
            for page in &owning {
                page_members
                    .entry(page.clone())
                    .or_default()
                    .extend(modules.iter().copied());
            }
        }
    }

    let mut chunks = Vec::new();

    for (group_idx, group) in policy.vendor_groups.iter().enumerate() {
        if vendor_members[group_idx].is_empty() {
            continue;
        }
        chunks.push(Chunk {
            name: group.name.clone(),
            kind: ChunkKind::Vendor,
            modules: std::mem::take(&mut vendor_members[group_idx]),
            owners: std::mem::take(&mut vendor_owners[group_idx]),
        });
    }

    shared_chunks.sort_by(|a, b| a.name.cmp(&b.name));
    chunks.extend(shared_chunks);

    // Page chunks follow profile declaration order; every page gets one even
    // if all its modules were factored out, because the entry invocation
    // lives here.
    for page in &page_graph.pages {
        let mut modules = page_members.remove(&page.name).unwrap_or_default();
        modules.sort_by(|a, b| graph.module(*a).identifier.cmp(&graph.module(*b).identifier));
        chunks.push(Chunk {
            name: page.name.clone(),
            kind: ChunkKind::Page,
            modules,
            owners: BTreeSet::from([page.name.clone()]),
        });
    }

    chunks
}
