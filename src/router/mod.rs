//! Client-side route table
//!
//! A small static router for the emitted pages: exact-match paths, one level
//! of redirect, no catch-all. The router is an explicitly constructed value
//! handed to the application root at startup; there is no process-wide
//! router instance.

use anyhow::Result;

use crate::error::Error;

/// Opaque reference to a page component, resolved by the rendering runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRef(pub String);

impl ComponentRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// One route table entry. Paths are unique; at most one entry lacks a
/// component (the pure redirect).
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub path: String,
    pub name: String,
    pub component: Option<ComponentRef>,
    pub redirect_to: Option<String>,
}

impl RouteEntry {
    pub fn component(path: &str, name: &str, component: ComponentRef) -> Self {
        Self {
            path: path.to_string(),
            name: name.to_string(),
            component: Some(component),
            redirect_to: None,
        }
    }

    pub fn redirect(path: &str, to: &str) -> Self {
        Self {
            path: path.to_string(),
            name: String::new(),
            component: None,
            redirect_to: Some(to.to_string()),
        }
    }
}

/// Outcome of resolving a navigation.
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// Render this component.
    Render(&'a ComponentRef),
    /// Unmatched path (or a dead redirect): render nothing. Deliberately not
    /// an error and deliberately no fallback page.
    Nothing,
}

/// Static route table, constructed once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<RouteEntry>,
}

impl Router {
    /// Build a router, validating the table invariants.
    pub fn new(routes: Vec<RouteEntry>) -> Result<Self> {
        let mut componentless = 0;
        for (i, route) in routes.iter().enumerate() {
            if routes[..i].iter().any(|r| r.path == route.path) {
                return Err(
                    Error::config(format!("duplicate route path '{}'", route.path)).into(),
                );
            }
            if route.component.is_none() {
                componentless += 1;
                if route.redirect_to.is_none() {
                    return Err(Error::config(format!(
                        "route '{}' has neither a component nor a redirect",
                        route.path
                    ))
                    .into());
                }
            }
        }
        if componentless > 1 {
            return Err(Error::config("at most one route may lack a component").into());
        }

        Ok(Self { routes })
    }

    /// The default three-entry table: `/` redirects to `/home`, which
    /// renders Home; `/login` renders Login.
    pub fn default_table() -> Result<Self> {
        Self::new(vec![
            RouteEntry::redirect("/", "/home"),
            RouteEntry::component("/home", "Home", ComponentRef::new("Home")),
            RouteEntry::component("/login", "Login", ComponentRef::new("Login")),
        ])
    }

    fn entry(&self, path: &str) -> Option<&RouteEntry> {
        self.routes.iter().find(|r| r.path == path)
    }

    /// Resolve a navigation target. Exact match only; a redirect is followed
    /// exactly once, and the redirect target's own redirect (if any) is not
    /// taken.
    pub fn resolve(&self, path: &str) -> Resolution<'_> {
        let Some(entry) = self.entry(path) else {
            return Resolution::Nothing;
        };

        if let Some(target) = &entry.redirect_to {
            return match self.entry(target).and_then(|e| e.component.as_ref()) {
                Some(component) => Resolution::Render(component),
                None => Resolution::Nothing,
            };
        }

        match &entry.component {
            Some(component) => Resolution::Render(component),
            None => Resolution::Nothing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_redirects_to_home() {
        let router = Router::default_table().unwrap();
        assert_eq!(router.resolve("/"), router.resolve("/home"));
        assert!(matches!(
            router.resolve("/"),
            Resolution::Render(c) if c.0 == "Home"
        ));
    }

    #[test]
    fn test_login_renders_login() {
        let router = Router::default_table().unwrap();
        assert!(matches!(
            router.resolve("/login"),
            Resolution::Render(c) if c.0 == "Login"
        ));
    }

    #[test]
    fn test_unmatched_path_renders_nothing() {
        let router = Router::default_table().unwrap();
        assert_eq!(router.resolve("/missing"), Resolution::Nothing);
    }

    #[test]
    fn test_duplicate_path_is_rejected() {
        let err = Router::new(vec![
            RouteEntry::component("/home", "Home", ComponentRef::new("Home")),
            RouteEntry::component("/home", "Home2", ComponentRef::new("Home2")),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate route path"));
    }

    #[test]
    fn test_chained_redirects_are_not_followed() {
        let router = Router::new(vec![
            RouteEntry::redirect("/", "/a"),
            RouteEntry {
                path: "/a".to_string(),
                name: "A".to_string(),
                component: Some(ComponentRef::new("A")),
                redirect_to: Some("/b".to_string()),
            },
            RouteEntry::component("/b", "B", ComponentRef::new("B")),
        ])
        .unwrap();

        // `/` takes one hop to `/a`; `/a`'s own redirect is ignored and its
        // component renders instead.
        assert!(matches!(
            router.resolve("/"),
            Resolution::Render(c) if c.0 == "A"
        ));
        // Direct navigation to `/a` honors the redirect (one hop).
        assert!(matches!(
            router.resolve("/a"),
            Resolution::Render(c) if c.0 == "B"
        ));
    }

    #[test]
    fn test_two_pure_redirects_are_rejected() {
        let err = Router::new(vec![
            RouteEntry::redirect("/", "/home"),
            RouteEntry::redirect("/old", "/home"),
            RouteEntry::component("/home", "Home", ComponentRef::new("Home")),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("at most one route"));
    }
}
