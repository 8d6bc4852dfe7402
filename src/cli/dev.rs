//! Development server command implementation

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tracing::info;

use crate::config::Config;
use crate::server::{DevServer, DevServerOptions};

/// Start the development server with live reload
#[derive(Args, Debug)]
pub struct DevCommand {
    /// Build profile to serve
    #[arg(short, long, default_value = "multi")]
    pub profile: String,

    /// Port to run the dev server on
    #[arg(long)]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Disable live reload
    #[arg(long)]
    pub no_reload: bool,
}

impl DevCommand {
    pub async fn execute(&self, config_path: &str) -> Result<()> {
        info!("Loading configuration from {}", config_path);
        let config = Config::load(config_path)?;

        let host = self.host.clone().unwrap_or_else(|| config.dev.host.clone());
        let port = self.port.unwrap_or(config.dev.port);
        let reload = !self.no_reload && config.dev.reload;
        let addr = format!("{}:{}", host, port);

        eprintln!(
            "{} Serving profile '{}' at {}\n",
            "→".blue(),
            self.profile.cyan(),
            format!("http://{}", addr).cyan().underline()
        );

        if reload {
            eprintln!("  {} Live reload {}", "•".dimmed(), "enabled".green());
        }

        eprintln!("  {} Press {} to stop\n", "•".dimmed(), "Ctrl+C".yellow());

        let server = DevServer::new(
            Arc::new(config),
            DevServerOptions {
                host,
                port,
                profile: self.profile.clone(),
                reload,
            },
        )?;

        server.start().await
    }
}
