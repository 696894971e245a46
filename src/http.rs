//! HTTP Server
//!
//! Serves the UI page, static assets and a few JSON status endpoints.

use crate::bridge::Controller;
use crate::system::{SystemMonitor, SystemSnapshot};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

const FALLBACK_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>JARVIS</title></head>
<body>
<h1>JARVIS</h1>
<p id="status">Connecting...</p>
<ul id="log"></ul>
<script>
const ws = new WebSocket(`ws://${location.hostname}:__WS_PORT__`);
const log = (text) => {
  const li = document.createElement("li");
  li.textContent = text;
  document.getElementById("log").appendChild(li);
};
ws.onmessage = (e) => {
  const msg = JSON.parse(e.data);
  if (msg.type === "connection" || msg.type === "status") {
    document.getElementById("status").textContent = msg.message;
  } else {
    log(`${msg.type}: ${msg.text || msg.result || msg.message || ""}`);
  }
};
ws.onopen = () => ws.send(JSON.stringify({action: "start_listening"}));
</script>
</body>
</html>
"#;

/// Shared state for HTTP handlers
pub struct HttpState {
    pub controller: Arc<Controller>,
    pub monitor: Arc<SystemMonitor>,
    pub index_path: PathBuf,
    pub ws_port: u16,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub cpu: f32,
    pub memory: f32,
    pub status: &'static str,
    pub voice_enabled: bool,
    pub clients: usize,
    pub uptime_secs: u64,
}

pub fn router(state: Arc<HttpState>, static_dir: PathBuf) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/status", get(status_handler))
        .route("/api/system", get(system_handler))
        .route("/api/tools", get(tools_handler))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn index_handler(State(state): State<Arc<HttpState>>) -> Html<String> {
    match tokio::fs::read_to_string(&state.index_path).await {
        Ok(page) => Html(page),
        Err(e) => {
            debug!("No UI page at {:?} ({}), serving built-in page", state.index_path, e);
            Html(FALLBACK_PAGE.replace("__WS_PORT__", &state.ws_port.to_string()))
        }
    }
}

async fn status_handler(State(state): State<Arc<HttpState>>) -> Json<StatusReport> {
    let (cpu, memory) = state.monitor.usage();
    Json(StatusReport {
        cpu,
        memory,
        status: "online",
        voice_enabled: state.controller.voice_enabled(),
        clients: state.controller.hub().count().await,
        uptime_secs: state.monitor.uptime().as_secs(),
    })
}

async fn system_handler(State(state): State<Arc<HttpState>>) -> Response {
    let monitor = Arc::clone(&state.monitor);
    match tokio::task::spawn_blocking(move || monitor.snapshot()).await {
        Ok(snapshot) => Json::<SystemSnapshot>(snapshot).into_response(),
        Err(e) => {
            warn!("❌ System snapshot failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "System snapshot failed" })),
            )
                .into_response()
        }
    }
}

async fn tools_handler(State(state): State<Arc<HttpState>>) -> Json<serde_json::Value> {
    let tools: Vec<_> = state
        .controller
        .tools()
        .descriptions()
        .into_iter()
        .map(|(name, description)| json!({ "name": name, "description": description }))
        .collect();
    Json(json!({ "tools": tools }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_page_points_at_ws_port() {
        let page = FALLBACK_PAGE.replace("__WS_PORT__", "8765");
        assert!(page.contains(":8765`"));
        assert!(!page.contains("__WS_PORT__"));
    }

    #[test]
    fn test_status_report_shape() {
        let report = StatusReport {
            cpu: 12.5,
            memory: 40.0,
            status: "online",
            voice_enabled: false,
            clients: 2,
            uptime_secs: 9,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "online");
        assert_eq!(value["clients"], 2);
        assert_eq!(value["voice_enabled"], false);
    }
}
