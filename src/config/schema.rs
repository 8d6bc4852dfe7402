//! Configuration schema definitions

use serde::{Deserialize, Serialize};

/// Project metadata configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory, reset completely before every build
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "dist".to_string()
}

/// One logical page: an independently loadable unit with its own entry
/// module and output HTML document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    /// Page name, unique within a profile; used for output filenames
    pub name: String,

    /// Entry module path, relative to the project root
    pub entry: String,

    /// HTML template for this page; falls back to the profile template
    #[serde(default)]
    pub template: Option<String>,
}

/// A named build profile: a fixed set of pages plus emit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Pages in declaration order; ordering is semantic (chunk and page
    /// emission follow it)
    pub pages: Vec<PageConfig>,

    /// Default HTML template shared by pages without their own
    #[serde(default)]
    pub template: Option<String>,

    /// Directory copied verbatim into `img/` in the output
    #[serde(default)]
    pub static_dir: Option<String>,
}

/// Asset classification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Images at or below this many bytes are inlined as base64 data URLs;
    /// larger ones are emitted as hashed files
    #[serde(default = "default_inline_threshold")]
    pub inline_threshold: u64,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            inline_threshold: default_inline_threshold(),
        }
    }
}

fn default_inline_threshold() -> u64 {
    8 * 1024
}

/// A vendor cache group: modules whose identifier matches `pattern` are
/// forced into a dedicated chunk named `name`, regardless of size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorGroupConfig {
    /// Chunk name
    pub name: String,

    /// Substring tested against the module identifier
    pub pattern: String,
}

/// Code-splitting policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Minimum pre-compression size for a shared chunk; smaller shared
    /// module groups are duplicated into their owners' own bundles
    #[serde(default = "default_min_shared_size")]
    pub min_shared_size: u64,

    /// Delimiter joining owner page names in shared chunk names
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Vendor groups in declaration order; the first matching group wins
    #[serde(default = "default_vendor_groups")]
    pub vendor: Vec<VendorGroupConfig>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            min_shared_size: default_min_shared_size(),
            delimiter: default_delimiter(),
            vendor: default_vendor_groups(),
        }
    }
}

fn default_min_shared_size() -> u64 {
    30 * 1024
}

fn default_delimiter() -> String {
    "_".to_string()
}

fn default_vendor_groups() -> Vec<VendorGroupConfig> {
    vec![
        VendorGroupConfig {
            name: "jquery".to_string(),
            pattern: "jquery".to_string(),
        },
        VendorGroupConfig {
            name: "lodash-es".to_string(),
            pattern: "lodash-es".to_string(),
        },
    ]
}

/// Development server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevConfig {
    /// Port to run dev server on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Enable the live-reload channel
    #[serde(default = "default_true")]
    pub reload: bool,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            reload: true,
        }
    }
}

fn default_port() -> u16 {
    9000
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_true() -> bool {
    true
}
