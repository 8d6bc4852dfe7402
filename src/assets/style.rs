//! Stylesheet resolution
//!
//! Stage one of the style pipeline: parse the source stylesheet and reprint
//! it as normalized, minified CSS. Stage two (extraction into a per-page
//! `css/<name>.css` artifact) happens in the emitter, so stylesheet loads
//! stay independent of script bundles.

use std::path::Path;

use anyhow::Result;
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{ParserOptions, StyleSheet};

use crate::error::Error;

/// Resolve a stylesheet source to plain minified CSS.
pub fn resolve_stylesheet(source: &str, path: &Path) -> Result<String> {
    let sheet = StyleSheet::parse(source, ParserOptions::default()).map_err(|e| {
        Error::config(format!("invalid stylesheet {}: {}", path.display(), e))
    })?;

    let output = sheet
        .to_css(PrinterOptions {
            minify: true,
            ..Default::default()
        })
        .map_err(|e| anyhow::anyhow!("failed to print stylesheet {}: {}", path.display(), e))?;

    Ok(output.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minifies_and_preserves_rules() {
        let css = "body {\n  color: red;\n}\n\n.login { margin: 0px; }\n";
        let out = resolve_stylesheet(css, Path::new("public.css")).unwrap();
        assert!(out.contains("body"));
        assert!(out.contains(".login"));
        assert!(!out.contains('\n') || out.len() < css.len());
    }

    #[test]
    fn test_invalid_css_is_rejected() {
        let err = resolve_stylesheet("% { color: red }", Path::new("bad.css")).unwrap_err();
        assert!(err.to_string().contains("bad.css"));
    }
}
