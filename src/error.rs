//! Typed build errors
//!
//! Most of the pipeline propagates `anyhow::Result`, but the failures a
//! caller may want to inspect get typed variants here: configuration and
//! asset-rule problems, and import resolution failures that must name the
//! specifier, the importing module, and the page whose graph was being built.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration, template, or asset rule
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An import could not be resolved while walking a page's module graph
    #[error("cannot resolve import '{specifier}' in {importer} (page '{page}')")]
    Resolution {
        specifier: String,
        importer: String,
        page: String,
    },
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }
}
