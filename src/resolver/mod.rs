//! Module resolution
//!
//! Extracts import specifiers from script sources and resolves them to
//! files. Relative specifiers resolve against the importing module; bare
//! specifiers (third-party names like `jquery`) resolve through the
//! project's `vendor/` directory so vendor modules participate in the
//! dependency graph and can be split into their own chunks.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static IMPORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:import|export)\s+(?:(?:\{[^}]*\}|\*\s+as\s+\w+|\w+)\s+from\s+)?["']([^"']+)["']|require\s*\(\s*["']([^"']+)["']\s*\)"#).unwrap()
});

/// Extensions probed when a specifier omits one.
const PROBE_EXTENSIONS: &[&str] = &["js", "css", "ejs", "json"];

/// Static import resolver rooted at the project directory.
pub struct Resolver {
    root: PathBuf,
}

impl Resolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Extract import/require specifiers from script source, in order of
    /// first appearance, deduplicated.
    pub fn extract_dependencies(&self, source: &str) -> Vec<String> {
        let mut dependencies = Vec::new();

        for cap in IMPORT_REGEX.captures_iter(source) {
            if let Some(specifier) = cap.get(1).or_else(|| cap.get(2)) {
                let spec = specifier.as_str().to_string();
                if !dependencies.contains(&spec) {
                    dependencies.push(spec);
                }
            }
        }

        debug!("Found {} dependencies", dependencies.len());

        dependencies
    }

    /// Resolve an import specifier to an absolute file path. Returns `None`
    /// when nothing matches; the graph builder turns that into a fatal
    /// resolution error attributed to the importing page.
    pub fn resolve(&self, specifier: &str, from: &Path) -> Option<PathBuf> {
        debug!("Resolving '{}' from '{}'", specifier, from.display());

        if specifier.starts_with('.') || specifier.starts_with('/') {
            let base_dir = from.parent().unwrap_or(Path::new("."));
            self.resolve_relative(specifier, base_dir)
        } else {
            self.resolve_vendor(specifier)
        }
    }

    /// Resolve a relative import with extension probing.
    fn resolve_relative(&self, specifier: &str, base_dir: &Path) -> Option<PathBuf> {
        let target = base_dir.join(specifier);

        if target.is_file() {
            return Some(target);
        }

        for ext in PROBE_EXTENSIONS {
            let with_ext = target.with_extension(ext);
            if with_ext.is_file() {
                return Some(with_ext);
            }
        }

        if target.is_dir() {
            let index = target.join("index.js");
            if index.is_file() {
                return Some(index);
            }
        }

        None
    }

    /// Resolve a bare specifier against the vendor directory.
    fn resolve_vendor(&self, specifier: &str) -> Option<PathBuf> {
        let vendor = self.root.join("vendor");

        let direct = vendor.join(specifier);
        if direct.is_file() {
            return Some(direct);
        }

        let with_ext = vendor.join(format!("{}.js", specifier));
        if with_ext.is_file() {
            return Some(with_ext);
        }

        let index = direct.join("index.js");
        if index.is_file() {
            return Some(index);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_extract_imports() {
        let source = r#"
            import foo from './foo';
            import { bar } from './bar.js';
            import * as baz from '../baz';
            export { qux } from './qux';
            const x = require('./x');
            import 'jquery';
        "#;

        let resolver = Resolver::new(".");
        let deps = resolver.extract_dependencies(source);

        assert!(deps.contains(&"./foo".to_string()));
        assert!(deps.contains(&"./bar.js".to_string()));
        assert!(deps.contains(&"../baz".to_string()));
        assert!(deps.contains(&"./qux".to_string()));
        assert!(deps.contains(&"./x".to_string()));
        assert!(deps.contains(&"jquery".to_string()));
    }

    #[test]
    fn test_extract_deduplicates() {
        let source = "import a from './a'; import { b } from './a';";
        let resolver = Resolver::new(".");
        assert_eq!(resolver.extract_dependencies(source), vec!["./a".to_string()]);
    }

    #[test]
    fn test_resolve_relative_and_vendor() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("vendor")).unwrap();
        fs::write(root.join("src/util.js"), "export const n = 1;").unwrap();
        fs::write(root.join("vendor/jquery.js"), "module.exports = {};").unwrap();

        let resolver = Resolver::new(root);
        let from = root.join("src/index.js");

        assert_eq!(
            resolver.resolve("./util", &from),
            Some(root.join("src/util.js"))
        );
        assert_eq!(
            resolver.resolve("jquery", &from),
            Some(root.join("vendor/jquery.js"))
        );
        assert_eq!(resolver.resolve("./missing", &from), None);
    }
}
