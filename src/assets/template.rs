//! Template compilation
//!
//! Compiles `.ejs` template sources into a render-function module. The
//! transform is not a static copy: every `<%= binding %>` in the source
//! survives as a live property access on the render function's data
//! argument.

use once_cell::sync::Lazy;
use regex::Regex;

static BINDING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<%=\s*([A-Za-z_$][\w$.]*)\s*%>").unwrap());

/// Compile a template source into the body of a CommonJS render-function
/// module.
pub fn render_function(source: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut last = 0;

    for cap in BINDING.captures_iter(source) {
        let whole = cap.get(0).unwrap();
        let binding = cap.get(1).unwrap().as_str();

        if whole.start() > last {
            parts.push(quote(&source[last..whole.start()]));
        }
        parts.push(format!("(data.{})", binding));
        last = whole.end();
    }

    if last < source.len() {
        parts.push(quote(&source[last..]));
    }

    let body = if parts.is_empty() {
        "\"\"".to_string()
    } else {
        parts.join(" + ")
    };

    format!(
        "module.exports = function render(data) {{\n  data = data || {{}};\n  return {};\n}};\n",
        body
    )
}

/// Quote a literal segment as a JavaScript string.
fn quote(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len() + 2);
    out.push('"');
    for c in segment.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bindings_are_preserved() {
        let out = render_function("<h1><%= title %></h1><p><%= user.name %></p>");
        assert!(out.contains("(data.title)"));
        assert!(out.contains("(data.user.name)"));
        assert!(out.contains("\"<h1>\""));
        assert!(out.contains("function render(data)"));
    }

    #[test]
    fn test_literal_only_template() {
        let out = render_function("<div>static</div>");
        assert!(out.contains("\"<div>static</div>\""));
        assert!(!out.contains("data."));
    }

    #[test]
    fn test_literals_are_escaped() {
        let out = render_function("say \"hi\"\nto <%= who %>");
        assert!(out.contains("\\\"hi\\\""));
        assert!(out.contains("\\n"));
        assert!(out.contains("(data.who)"));
    }

    #[test]
    fn test_empty_template() {
        let out = render_function("");
        assert!(out.contains("return \"\";"));
    }
}
