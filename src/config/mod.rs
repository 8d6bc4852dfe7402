//! Configuration handling for mpack
//!
//! Parses and manages mpack.toml configuration files. Two build profiles are
//! built in: `single` (pages `index`, `login`, one template each) and `multi`
//! (pages `home`, `login`, one shared template). A config file may override
//! them, but profiles are fixed at load time, never parameterized per
//! invocation.

mod schema;

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub use schema::*;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project metadata
    pub project: ProjectConfig,

    /// Named build profiles
    #[serde(default = "default_profiles")]
    pub profiles: BTreeMap<String, ProfileConfig>,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,

    /// Asset classification settings
    #[serde(default)]
    pub assets: AssetsConfig,

    /// Code-splitting policy
    #[serde(default)]
    pub split: SplitConfig,

    /// Development server settings
    #[serde(default)]
    pub dev: DevConfig,

    /// Root directory (computed from config file location)
    #[serde(skip)]
    pub root: PathBuf,
}

/// The two built-in profiles, mirroring the classic single-entry and
/// multi-entry project layouts.
fn default_profiles() -> BTreeMap<String, ProfileConfig> {
    let mut profiles = BTreeMap::new();
    profiles.insert(
        "single".to_string(),
        ProfileConfig {
            pages: vec![
                PageConfig {
                    name: "index".to_string(),
                    entry: "src/index.js".to_string(),
                    template: Some("src/index.html".to_string()),
                },
                PageConfig {
                    name: "login".to_string(),
                    entry: "src/login.js".to_string(),
                    template: Some("src/login.html".to_string()),
                },
            ],
            template: None,
            static_dir: Some("src/img".to_string()),
        },
    );
    profiles.insert(
        "multi".to_string(),
        ProfileConfig {
            pages: vec![
                PageConfig {
                    name: "home".to_string(),
                    entry: "src/mpa/home.js".to_string(),
                    template: None,
                },
                PageConfig {
                    name: "login".to_string(),
                    entry: "src/mpa/login.js".to_string(),
                    template: None,
                },
            ],
            template: Some("public/index.html".to_string()),
            static_dir: Some("src/img".to_string()),
        },
    );
    profiles
}

impl Config {
    /// Load configuration from a file path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let canonical_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        let content = fs::read_to_string(&canonical_path)
            .with_context(|| format!("Failed to read config file: {}", canonical_path.display()))?;

        let mut config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse mpack.toml")?;

        config.root = canonical_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        config.validate()?;

        Ok(config)
    }

    /// Create a default configuration rooted at the given directory
    pub fn default_config(root: impl Into<PathBuf>) -> Self {
        Self {
            project: ProjectConfig {
                name: "my-app".to_string(),
                version: "0.1.0".to_string(),
            },
            profiles: default_profiles(),
            output: OutputConfig::default(),
            assets: AssetsConfig::default(),
            split: SplitConfig::default(),
            dev: DevConfig::default(),
            root: root.into(),
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.profiles.is_empty() {
            return Err(Error::config("at least one build profile must be defined").into());
        }

        for (profile_name, profile) in &self.profiles {
            if profile.pages.is_empty() {
                return Err(Error::config(format!(
                    "profile '{}' declares no pages",
                    profile_name
                ))
                .into());
            }

            let mut seen = HashSet::new();
            for page in &profile.pages {
                if !seen.insert(page.name.as_str()) {
                    return Err(Error::config(format!(
                        "profile '{}' declares page '{}' twice",
                        profile_name, page.name
                    ))
                    .into());
                }

                if page.template.is_none() && profile.template.is_none() {
                    return Err(Error::config(format!(
                        "page '{}' in profile '{}' has no HTML template",
                        page.name, profile_name
                    ))
                    .into());
                }
            }
        }

        Ok(())
    }

    /// Look up a profile by name
    pub fn profile(&self, name: &str) -> Result<&ProfileConfig> {
        self.profiles.get(name).ok_or_else(|| {
            Error::config(format!(
                "unknown build profile '{}' (available: {})",
                name,
                self.profiles
                    .keys()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
            .into()
        })
    }

    /// Get the absolute output directory path
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.output.dir)
    }

    /// Absolute entry module path for a page
    pub fn entry_path(&self, page: &PageConfig) -> PathBuf {
        self.root.join(&page.entry)
    }

    /// Absolute template path for a page, falling back to the profile-wide
    /// template.
    pub fn template_path(&self, profile: &ProfileConfig, page: &PageConfig) -> Result<PathBuf> {
        let template = page
            .template
            .as_ref()
            .or(profile.template.as_ref())
            .ok_or_else(|| Error::config(format!("page '{}' has no HTML template", page.name)))?;
        Ok(self.root.join(template))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles_present() {
        let config = Config::default_config(".");
        assert!(config.profiles.contains_key("single"));
        assert!(config.profiles.contains_key("multi"));

        let single = config.profile("single").unwrap();
        let names: Vec<&str> = single.pages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["index", "login"]);

        let multi = config.profile("multi").unwrap();
        let names: Vec<&str> = multi.pages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["home", "login"]);
    }

    #[test]
    fn test_unknown_profile_is_rejected() {
        let config = Config::default_config(".");
        let err = config.profile("staging").unwrap_err();
        assert!(err.to_string().contains("unknown build profile"));
    }

    #[test]
    fn test_split_defaults_match_policy() {
        let split = SplitConfig::default();
        assert_eq!(split.min_shared_size, 30 * 1024);
        assert_eq!(split.delimiter, "_");
        let names: Vec<&str> = split.vendor.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["jquery", "lodash-es"]);
    }

    #[test]
    fn test_duplicate_page_name_fails_validation() {
        let mut config = Config::default_config(".");
        let profile = config.profiles.get_mut("single").unwrap();
        let mut dup = profile.pages[0].clone();
        dup.entry = "src/other.js".to_string();
        profile.pages.push(dup);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("twice"));
    }
}
