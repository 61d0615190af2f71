//! `kiln dev` command implementation.
//!
//! Development server over the in-memory artifact set:
//!
//! ```text
//! initial build -> serve artifacts from memory
//!   watch src/ + public/ -> debounce -> rebuild
//!     success -> swap artifact map, broadcast {"type":"reload"}
//!     failure -> keep serving last good build, broadcast {"type":"error"}
//! ```
//!
//! Unknown extensionless paths fall back to `index.html` so client-side
//! routing keeps working.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use kiln_core::pipeline::{BuildArtifacts, Pipeline};
use kiln_core::plugins::WS_PATH;
use kiln_core::{profile, ProjectPaths};
use miette::{miette, Result};
use notify::{RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tower_http::cors::CorsLayer;

/// Dev server action.
#[derive(Debug, Clone)]
pub struct DevAction {
    /// Project directory.
    pub cwd: PathBuf,
    /// Port to listen on.
    pub port: u16,
    /// Host to bind to.
    pub host: String,
}

/// Shared server state.
struct DevState {
    /// URL path → file contents, swapped wholesale on rebuild.
    files: RwLock<HashMap<String, Vec<u8>>>,
    /// Broadcast channel for reload/error events.
    reload_tx: broadcast::Sender<String>,
    /// Serve `index.html` for unknown extensionless paths.
    history_fallback: bool,
}

/// Run the dev server.
pub async fn run(action: DevAction) -> Result<()> {
    let root = action
        .cwd
        .canonicalize()
        .map_err(|e| miette!("cannot resolve project directory: {e}"))?;
    let paths = ProjectPaths::from_root(&root);
    let dev_profile = profile::development(&paths);
    let server_options = dev_profile
        .server
        .clone()
        .expect("development profile always has server options");

    let pipeline = Arc::new(Pipeline::new(dev_profile, paths.clone()));

    // Initial build must succeed; later rebuilds may fail and keep the
    // last good artifact set being served
    let artifacts = pipeline.run().map_err(|e| miette!("{e}"))?;
    tracing::info!(modules = artifacts.module_sizes.len(), "initial build done");

    let (reload_tx, _) = broadcast::channel(16);
    let state = Arc::new(DevState {
        files: RwLock::new(serve_map(&artifacts)),
        reload_tx,
        history_fallback: server_options.history_fallback,
    });

    // Filesystem watcher feeding the rebuild loop
    let (fs_tx, fs_rx) = tokio::sync::mpsc::unbounded_channel::<()>();
    let mut watcher =
        notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
            if res.is_ok() {
                let _ = fs_tx.send(());
            }
        })
        .map_err(|e| miette!("cannot start file watcher: {e}"))?;
    watcher
        .watch(&paths.src, RecursiveMode::Recursive)
        .map_err(|e| miette!("cannot watch {}: {e}", paths.src.display()))?;
    if paths.public.is_dir() {
        watcher
            .watch(&paths.public, RecursiveMode::Recursive)
            .map_err(|e| miette!("cannot watch {}: {e}", paths.public.display()))?;
    }

    tokio::spawn(rebuild_loop(fs_rx, pipeline.clone(), state.clone()));

    let app = Router::new()
        .route(WS_PATH, get(ws_handler))
        .fallback(get(serve_file))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind((action.host.as_str(), action.port))
        .await
        .map_err(|e| miette!("cannot bind {}:{}: {e}", action.host, action.port))?;

    println!(
        "  dev server running at http://{}:{}/ (hot reload {})",
        action.host,
        action.port,
        if server_options.hot { "on" } else { "off" }
    );

    axum::serve(listener, app)
        .await
        .map_err(|e| miette!("server error: {e}"))?;

    // Watcher lives as long as the server
    drop(watcher);
    Ok(())
}

/// Rebuild on watcher events (debounced), swap the artifact map, and
/// notify connected clients.
async fn rebuild_loop(
    mut fs_rx: tokio::sync::mpsc::UnboundedReceiver<()>,
    pipeline: Arc<Pipeline>,
    state: Arc<DevState>,
) {
    while fs_rx.recv().await.is_some() {
        // Debounce: absorb the event burst before rebuilding
        while let Ok(Some(())) =
            tokio::time::timeout(Duration::from_millis(100), fs_rx.recv()).await
        {}

        let p = pipeline.clone();
        let result = tokio::task::spawn_blocking(move || p.run()).await;

        match result {
            Ok(Ok(artifacts)) => {
                tracing::info!(modules = artifacts.module_sizes.len(), "rebuilt");
                *state.files.write().await = serve_map(&artifacts);
                let _ = state.reload_tx.send(r#"{"type":"reload"}"#.to_string());
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "rebuild failed");
                let msg = serde_json::json!({
                    "type": "error",
                    "message": e.to_string(),
                })
                .to_string();
                let _ = state.reload_tx.send(msg);
            }
            Err(e) => {
                tracing::error!(error = %e, "rebuild task panicked");
                break;
            }
        }
    }
}

/// Map the artifact set to URL paths.
fn serve_map(artifacts: &BuildArtifacts) -> HashMap<String, Vec<u8>> {
    artifacts
        .files
        .iter()
        .map(|f| (format!("/{}", f.path), f.contents.clone()))
        .collect()
}

async fn serve_file(State(state): State<Arc<DevState>>, uri: Uri) -> impl IntoResponse {
    let path = uri.path().to_string();
    let lookup = if path == "/" { "/index.html" } else { path.as_str() };

    let files = state.files.read().await;

    if let Some(contents) = files.get(lookup) {
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, mime_for(lookup))],
            contents.clone(),
        )
            .into_response();
    }

    // History fallback: client-side routes resolve to the shell
    if state.history_fallback && !lookup.rsplit('/').next().unwrap_or("").contains('.') {
        if let Some(contents) = files.get("/index.html") {
            return (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                contents.clone(),
            )
                .into_response();
        }
    }

    (StatusCode::NOT_FOUND, "not found").into_response()
}

async fn ws_handler(State(state): State<Arc<DevState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<DevState>) {
    if socket
        .send(Message::Text(r#"{"type":"connected"}"#.to_string()))
        .await
        .is_err()
    {
        return;
    }

    let mut rx = state.reload_tx.subscribe();
    while let Ok(msg) = rx.recv().await {
        if socket.send(Message::Text(msg)).await.is_err() {
            break;
        }
    }
}

fn mime_for(path: &str) -> &'static str {
    match path.rsplit('.').next().unwrap_or("") {
        "html" => "text/html; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "json" | "map" => "application/json; charset=utf-8",
        "png" => "image/png",
        "gif" => "image/gif",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::pipeline::OutputFile;

    #[test]
    fn test_serve_map_prefixes_paths() {
        let mut artifacts = BuildArtifacts::default();
        artifacts.files.push(OutputFile {
            path: "js/bundle.js".to_string(),
            contents: b"code".to_vec(),
        });

        let map = serve_map(&artifacts);
        assert!(map.contains_key("/js/bundle.js"));
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(mime_for("/index.html"), "text/html; charset=utf-8");
        assert_eq!(mime_for("/js/bundle.js"), "application/javascript; charset=utf-8");
        assert_eq!(mime_for("/css/main.css"), "text/css; charset=utf-8");
        assert_eq!(mime_for("/font.woff2"), "font/woff2");
        assert_eq!(mime_for("/blob"), "application/octet-stream");
    }
}
