//! mpack library
//!
//! Core functionality for the mpack multi-page build pipeline.

pub mod assets;
pub mod bundler;
pub mod cli;
pub mod config;
pub mod emit;
pub mod error;
pub mod resolver;
pub mod router;
pub mod server;
pub mod utils;

pub use bundler::Bundler;
pub use cli::Cli;
pub use config::Config;
pub use router::Router;
