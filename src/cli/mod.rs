//! Command-line interface for mpack
//!
//! Provides the main CLI structure using clap with subcommands for:
//! - `build`: run the pipeline and write the output directory
//! - `dev`: development server with live reload

mod build;
mod dev;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

pub use build::BuildCommand;
pub use dev::DevCommand;

/// mpack - a multi-page application build pipeline
#[derive(Parser, Debug)]
#[command(name = "mpack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to mpack.toml config file
    #[arg(short, long, global = true, default_value = "mpack.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a profile for production
    Build(BuildCommand),

    /// Start the development server with live reload
    Dev(DevCommand),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        print_banner();

        match &self.command {
            Commands::Build(cmd) => cmd.execute(&self.config).await,
            Commands::Dev(cmd) => cmd.execute(&self.config).await,
        }
    }
}

/// Print the mpack banner
fn print_banner() {
    eprintln!(
        "\n{} {} {}\n",
        "⚡".cyan(),
        "mpack".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
