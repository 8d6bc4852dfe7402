//! Asset classification
//!
//! Every non-script source file runs through an ordered list of
//! (pattern, action) rules. The first matching rule decides what happens to
//! the asset: inline it as a base64 data URL, emit it as a hashed file, or
//! transform it into an intermediate representation (extracted stylesheet,
//! render function). A file matching no rule is a configuration error raised
//! at build time, never deferred to the browser.

mod style;
mod template;

use std::path::Path;

use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use globset::{Glob, GlobMatcher};

use crate::error::Error;
use crate::utils::hashed_filename;

pub use style::resolve_stylesheet;
pub use template::render_function;

/// Intermediate representations produced by `Action::Transform`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    /// Two-stage style pipeline: normalize to plain CSS, then extract into a
    /// page-scoped stylesheet file. Styles are never inlined into script
    /// output so stylesheet loads stay cacheable on their own.
    Style,
    /// Template file compiled to a render function that keeps its variable
    /// bindings live.
    Template,
}

/// What a rule does with a matching asset.
#[derive(Debug, Clone)]
pub enum RuleAction {
    /// Inline small files, emit large ones; the threshold is inclusive.
    InlineOrEmit { threshold: u64 },
    /// Hand the file to a transform stage.
    Transform(TransformKind),
}

/// The classified outcome for one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Embed the asset directly as a data URL.
    Inline { mime: &'static str, payload: String },
    /// Write the asset as a separate fetchable file at `dest`.
    EmitFile { dest: String },
    /// Route the asset through a transform stage.
    Transform(TransformKind),
}

/// One classification rule. The pattern is a glob tested against the file
/// name only.
#[derive(Debug, Clone)]
pub struct AssetRule {
    pattern: GlobMatcher,
    action: RuleAction,
}

impl AssetRule {
    pub fn new(pattern: &str, action: RuleAction) -> Result<Self> {
        let pattern = Glob::new(pattern)
            .map_err(|e| Error::config(format!("invalid asset rule pattern '{}': {}", pattern, e)))?
            .compile_matcher();
        Ok(Self { pattern, action })
    }
}

/// Ordered asset rule table. Rules are evaluated top-down and the first
/// match wins; overlap between patterns is resolved by declaration order.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<AssetRule>,
}

impl Classifier {
    /// Build a classifier from an explicit rule list.
    pub fn new(rules: Vec<AssetRule>) -> Self {
        Self { rules }
    }

    /// The fixed default rule set: styles, images, templates.
    pub fn with_defaults(inline_threshold: u64) -> Result<Self> {
        Ok(Self::new(vec![
            AssetRule::new("*.css", RuleAction::Transform(TransformKind::Style))?,
            AssetRule::new(
                "*.{png,svg,jpg,jpeg,gif}",
                RuleAction::InlineOrEmit {
                    threshold: inline_threshold,
                },
            )?,
            AssetRule::new("*.ejs", RuleAction::Transform(TransformKind::Template))?,
        ]))
    }

    /// Classify one asset by path and content.
    pub fn classify(&self, path: &Path, content: &[u8]) -> Result<Action> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::config(format!("asset has no file name: {}", path.display())))?;

        for rule in &self.rules {
            if rule.pattern.is_match(file_name) {
                return Ok(apply(&rule.action, path, content));
            }
        }

        Err(Error::config(format!("no asset rule matches '{}'", path.display())).into())
    }
}

fn apply(action: &RuleAction, path: &Path, content: &[u8]) -> Action {
    match action {
        RuleAction::InlineOrEmit { threshold } => {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("bin");
            if content.len() as u64 <= *threshold {
                Action::Inline {
                    mime: mime_for(ext),
                    payload: BASE64.encode(content),
                }
            } else {
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("asset");
                Action::EmitFile {
                    dest: format!("images/{}", hashed_filename(stem, content, ext)),
                }
            }
        }
        RuleAction::Transform(kind) => Action::Transform(*kind),
    }
}

/// MIME type for inlined image data URLs.
fn mime_for(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::with_defaults(8 * 1024).unwrap()
    }

    #[test]
    fn test_styles_are_transformed() {
        let action = classifier()
            .classify(Path::new("src/css/public.css"), b"body{}")
            .unwrap();
        assert_eq!(action, Action::Transform(TransformKind::Style));
    }

    #[test]
    fn test_templates_are_transformed() {
        let action = classifier()
            .classify(Path::new("src/header.ejs"), b"<h1><%= title %></h1>")
            .unwrap();
        assert_eq!(action, Action::Transform(TransformKind::Template));
    }

    #[test]
    fn test_image_inline_boundary() {
        let c = classifier();

        let small = vec![0u8; 8191];
        assert!(matches!(
            c.classify(Path::new("a.png"), &small).unwrap(),
            Action::Inline { mime: "image/png", .. }
        ));

        // The threshold is inclusive.
        let exact = vec![0u8; 8192];
        assert!(matches!(
            c.classify(Path::new("a.png"), &exact).unwrap(),
            Action::Inline { .. }
        ));

        let large = vec![0u8; 8193];
        match c.classify(Path::new("a.png"), &large).unwrap() {
            Action::EmitFile { dest } => {
                assert!(dest.starts_with("images/a."));
                assert!(dest.ends_with(".png"));
                // images/<name>.<hash6>.<ext>
                assert_eq!(dest.split('.').nth(1).unwrap().len(), 6);
            }
            other => panic!("expected EmitFile, got {:?}", other),
        }
    }

    #[test]
    fn test_same_name_different_content_gets_different_files() {
        let c = classifier();
        let a = c.classify(Path::new("one/logo.png"), &vec![1u8; 9000]).unwrap();
        let b = c.classify(Path::new("two/logo.png"), &vec![2u8; 9000]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        // Two deliberately overlapping rules; declaration order decides.
        let c = Classifier::new(vec![
            AssetRule::new("*.png", RuleAction::Transform(TransformKind::Style)).unwrap(),
            AssetRule::new("*.{png,gif}", RuleAction::InlineOrEmit { threshold: 0 }).unwrap(),
        ]);
        let action = c.classify(Path::new("pixel.png"), b"x").unwrap();
        assert_eq!(action, Action::Transform(TransformKind::Style));
    }

    #[test]
    fn test_unmatched_asset_is_a_hard_error() {
        let err = classifier()
            .classify(Path::new("font.woff2"), b"")
            .unwrap_err();
        assert!(err.to_string().contains("no asset rule matches"));
    }
}
