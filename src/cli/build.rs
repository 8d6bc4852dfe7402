//! Build command implementation

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tracing::info;

use crate::bundler::Bundler;
use crate::config::Config;
use crate::utils::{format_duration, format_size};

/// Build a profile for production
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Build profile to run
    #[arg(short, long, default_value = "multi")]
    pub profile: String,
}

impl BuildCommand {
    pub async fn execute(&self, config_path: &str) -> Result<()> {
        let start = Instant::now();

        info!("Loading configuration from {}", config_path);
        let config = Config::load(config_path)?;

        eprintln!(
            "{} Building profile '{}'...",
            "→".blue(),
            self.profile.cyan()
        );

        let bundler = Bundler::new(Arc::new(config), self.profile.clone());
        let report = bundler.build()?;

        eprintln!(
            "\n{} Emitted {} artifact(s) in {}\n",
            "✓".green().bold(),
            report.artifacts.len(),
            format_duration(start.elapsed())
        );

        for (path, size) in &report.artifacts {
            eprintln!(
                "  {} {} {}",
                "•".dimmed(),
                path.cyan(),
                format_size(*size).dimmed()
            );
        }

        eprintln!();

        Ok(())
    }
}
