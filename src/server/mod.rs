//! Development server
//!
//! Serves the current build's artifact set over HTTP with live reload. The
//! artifact set lives in memory behind an `ArcSwap`: a rebuild produces a
//! complete new set and swaps it in one atomic store, so a request never
//! sees a half-written artifact tree. A failed rebuild keeps the previous
//! set in place and serves it untouched.

mod reload;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use colored::Colorize;
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::bundler::Bundler;
use crate::config::Config;
use crate::emit::ArtifactSet;

pub use reload::ReloadMessage;

/// Development server options
#[derive(Debug, Clone)]
pub struct DevServerOptions {
    pub host: String,
    pub port: u16,
    pub profile: String,
    pub reload: bool,
}

/// Shared server state
pub(crate) struct ServerState {
    /// Currently served artifact set, swapped atomically on rebuild
    artifacts: ArcSwap<ArtifactSet>,

    /// Reload broadcast channel
    reload_tx: broadcast::Sender<ReloadMessage>,

    /// Whether the reload client is injected into served HTML
    reload_enabled: bool,

    /// Document served for `/`
    default_page: String,
}

/// Development server
pub struct DevServer {
    config: Arc<Config>,
    options: DevServerOptions,
}

impl DevServer {
    pub fn new(config: Arc<Config>, options: DevServerOptions) -> Result<Self> {
        Ok(Self { config, options })
    }

    /// Run the initial build and start serving. Fails outright if the first
    /// build fails; there is nothing to fall back to yet.
    pub async fn start(&self) -> Result<()> {
        let bundler = Bundler::new(self.config.clone(), self.options.profile.clone());
        let artifacts = bundler.build_artifacts()?;

        let profile = self.config.profile(&self.options.profile)?;
        let default_page = format!("{}.html", profile.pages[0].name);

        let (reload_tx, _) = broadcast::channel::<ReloadMessage>(100);

        let state = Arc::new(ServerState {
            artifacts: ArcSwap::from_pointee(artifacts),
            reload_tx,
            reload_enabled: self.options.reload,
            default_page,
        });

        if self.options.reload {
            self.spawn_watcher(state.clone())?;
        }

        let app = Router::new()
            .route("/", get(serve_default))
            .route("/*path", get(serve_artifact))
            .route("/__mpack_reload", get(reload::reload_websocket))
            .layer(CorsLayer::permissive())
            .with_state(state);

        let listener =
            tokio::net::TcpListener::bind((self.options.host.as_str(), self.options.port)).await?;
        info!("Server listening on http://{}", listener.local_addr()?);

        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Watch the project for source changes and rebuild. The debouncer is
    /// moved into a thread to keep it alive for the server's lifetime.
    fn spawn_watcher(&self, state: Arc<ServerState>) -> Result<()> {
        let root = self.config.root.clone();
        let output_dir = self.config.output_dir();
        let config = self.config.clone();
        let profile = self.options.profile.clone();

        let (tx, rx) = std::sync::mpsc::channel();

        let mut debouncer = new_debouncer(std::time::Duration::from_millis(100), tx)?;
        debouncer.watcher().watch(&root, RecursiveMode::Recursive)?;

        std::thread::spawn(move || {
            let _debouncer = debouncer;

            loop {
                match rx.recv() {
                    Ok(Ok(events)) => {
                        let changed: Vec<PathBuf> = events
                            .into_iter()
                            .map(|e| e.path)
                            .filter(|p| is_source_change(p, &output_dir))
                            .collect();
                        if changed.is_empty() {
                            continue;
                        }
                        for path in &changed {
                            eprintln!(
                                "  {} File changed: {}",
                                "↻".yellow(),
                                path.display().to_string().dimmed()
                            );
                        }
                        rebuild(&config, &profile, &state, &changed[0]);
                    }
                    Ok(Err(e)) => {
                        error!("Watch error: {:?}", e);
                    }
                    Err(_) => {
                        // Channel closed, exit
                        break;
                    }
                }
            }
        });

        Ok(())
    }
}

/// Rebuild and atomically swap the served artifacts. A failed build keeps
/// the previous set serving.
fn rebuild(config: &Arc<Config>, profile: &str, state: &Arc<ServerState>, trigger: &Path) {
    let bundler = Bundler::new(config.clone(), profile);
    match bundler.build_artifacts() {
        Ok(artifacts) => {
            state.artifacts.store(Arc::new(artifacts));
            let _ = state.reload_tx.send(ReloadMessage::Reload {
                reason: format!("File changed: {}", trigger.display()),
            });
        }
        Err(e) => {
            error!("Rebuild failed, keeping previous artifacts: {:#}", e);
        }
    }
}

/// Only source file changes outside the output directory trigger a rebuild.
fn is_source_change(path: &Path, output_dir: &Path) -> bool {
    if path.starts_with(output_dir) {
        return false;
    }
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    matches!(
        extension,
        "js" | "css" | "ejs" | "html" | "png" | "svg" | "jpg" | "jpeg" | "gif" | "toml"
    )
}

/// Serve the default page for `/`
async fn serve_default(State(state): State<Arc<ServerState>>) -> Response {
    let page = state.default_page.clone();
    serve_path(&state, &page)
}

/// Serve an artifact by output-relative path
async fn serve_artifact(
    State(state): State<Arc<ServerState>>,
    axum::extract::Path(path): axum::extract::Path<String>,
) -> Response {
    serve_path(&state, &path)
}

fn serve_path(state: &ServerState, path: &str) -> Response {
    let artifacts = state.artifacts.load();

    // Extensionless paths fall back to their page document, so /home serves
    // home.html.
    let bytes = artifacts.get(path).or_else(|| {
        if Path::new(path).extension().is_none() {
            artifacts.get(&format!("{}.html", path.trim_end_matches('/')))
        } else {
            None
        }
    });

    let Some(bytes) = bytes else {
        return (StatusCode::NOT_FOUND, format!("Not found: /{}", path)).into_response();
    };

    let content_type = content_type_for(path);
    if content_type.starts_with("text/html") && state.reload_enabled {
        let html = String::from_utf8_lossy(bytes);
        return Html(inject_reload_client(&html)).into_response();
    }

    let mut response = bytes.to_vec().into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type.parse().unwrap());
    response
}

/// Content type for a served artifact
fn content_type_for(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("html");

    match extension {
        "html" | "htm" => "text/html; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "json" => "application/json; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Inject the reload client script into HTML
fn inject_reload_client(html: &str) -> String {
    let script = r#"
<script>
// mpack live-reload client
(function() {
  var ws = new WebSocket("ws://" + location.host + "/__mpack_reload");
  ws.onmessage = function(event) {
    var message = JSON.parse(event.data);
    if (message.type === "reload") {
      console.log("[mpack] reload:", message.reason);
      location.reload();
    } else if (message.type === "connected") {
      console.log("[mpack] live reload connected");
    }
  };
  ws.onclose = function() {
    console.log("[mpack] live reload disconnected, retrying...");
    setTimeout(function() { location.reload(); }, 1000);
  };
})();
</script>
"#;

    if let Some(pos) = html.rfind("</body>") {
        let mut result = html.to_string();
        result.insert_str(pos, script);
        result
    } else {
        format!("{}{}", html, script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("home.html"), "text/html; charset=utf-8");
        assert_eq!(
            content_type_for("js/home.js"),
            "application/javascript; charset=utf-8"
        );
        assert_eq!(content_type_for("css/home.css"), "text/css; charset=utf-8");
        assert_eq!(content_type_for("images/a.1b2c3d.png"), "image/png");
    }

    #[test]
    fn test_source_change_filter() {
        let out = Path::new("/proj/dist");
        assert!(is_source_change(Path::new("/proj/src/index.js"), out));
        assert!(is_source_change(Path::new("/proj/src/css/a.css"), out));
        assert!(!is_source_change(Path::new("/proj/dist/js/home.js"), out));
        assert!(!is_source_change(Path::new("/proj/notes.txt"), out));
    }

    #[test]
    fn test_reload_client_injection() {
        let html = inject_reload_client("<html><body></body></html>");
        let script = html.find("__mpack_reload").unwrap();
        let body_end = html.rfind("</body>").unwrap();
        assert!(script < body_end);
    }
}
