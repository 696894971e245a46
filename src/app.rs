//! Application wiring
//!
//! Builds the hub, event queue, tools, agent and controller, then serves the
//! HTTP page and the WebSocket bridge until asked to stop.

use crate::agent::{self, VoiceAgent};
use crate::bridge::{self, BridgeState, ClientHub, Controller};
use crate::config::Config;
use crate::error::{BridgeError, BridgeResult};
use crate::http::{self, HttpState};
use crate::system::SystemMonitor;
use crate::tools::{ToolContext, ToolRegistry};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const SOUNDS_DIR: &str = "sounds";

/// Options coming from the command line
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub force_demo: bool,
    pub open_browser: bool,
}

/// A bridge serving on both ports
pub struct RunningBridge {
    pub http_addr: SocketAddr,
    pub ws_addr: SocketAddr,
    pub controller: Arc<Controller>,
    shutdown: watch::Sender<bool>,
    servers: Vec<JoinHandle<()>>,
    dispatcher: JoinHandle<()>,
}

impl RunningBridge {
    /// Stop the agent session and both servers
    pub async fn shutdown(self) {
        self.controller.shutdown().await;
        let _ = self.shutdown.send(true);
        for server in self.servers {
            if tokio::time::timeout(Duration::from_secs(5), server).await.is_err() {
                warn!("⚠️ Server did not shut down in time");
            }
        }
        self.dispatcher.abort();
        info!("👋 Jarvis bridge stopped");
    }
}

/// Create the folders the tools and UI write into
pub fn prepare_workspace(config: &Config) -> BridgeResult<()> {
    let workspace = config.workspace();
    let dirs: [PathBuf; 5] = [
        PathBuf::from(&config.ui_dir),
        workspace.join(&config.images_dir),
        workspace.join(&config.pages_dir),
        workspace.join(&config.notes_dir),
        workspace.join(SOUNDS_DIR),
    ];
    for dir in &dirs {
        std::fs::create_dir_all(dir)?;
        debug!("📁 Ready: {:?}", dir);
    }
    Ok(())
}

/// Start serving with the agent chosen from `config`
pub async fn start(config: &Config, options: &RunOptions) -> BridgeResult<RunningBridge> {
    let tools = Arc::new(ToolRegistry::with_defaults(ToolContext::from_config(config)?));
    let agent = agent::create_agent(config, Arc::clone(&tools), options.force_demo)?;
    start_with(config, agent, tools).await
}

/// Start serving with a caller-provided agent
pub async fn start_with(
    config: &Config,
    agent: Arc<dyn VoiceAgent>,
    tools: Arc<ToolRegistry>,
) -> BridgeResult<RunningBridge> {
    config.validate()?;
    prepare_workspace(config)?;

    let hub = Arc::new(ClientHub::new());
    let (sink, queue) = bridge::queue::channel(config.event_queue_capacity);
    let dispatcher = queue.spawn(Arc::clone(&hub));

    let controller = Arc::new(Controller::new(
        agent,
        tools,
        hub,
        sink,
        Duration::from_millis(config.demo_delay_ms),
    ));

    let ws_listener = bind(&config.ws_host, config.ws_port).await?;
    let http_listener = bind(&config.http_host, config.http_port).await?;
    let ws_addr = ws_listener.local_addr()?;
    let http_addr = http_listener.local_addr()?;

    let ws_router = bridge::router(Arc::new(BridgeState::new(
        Arc::clone(&controller),
        config.client_buffer,
    )));
    let http_router = http::router(
        Arc::new(HttpState {
            controller: Arc::clone(&controller),
            monitor: Arc::new(SystemMonitor::new()),
            index_path: config.index_path(),
            ws_port: ws_addr.port(),
        }),
        PathBuf::from(&config.static_dir),
    );

    let (shutdown, _) = watch::channel(false);
    let servers = vec![
        serve("WebSocket", ws_listener, ws_router, shutdown.subscribe()),
        serve("HTTP", http_listener, http_router, shutdown.subscribe()),
    ];

    info!("🌐 HTTP server: http://{}", http_addr);
    info!("🔌 WebSocket server: ws://{}", ws_addr);

    Ok(RunningBridge {
        http_addr,
        ws_addr,
        controller,
        shutdown,
        servers,
        dispatcher,
    })
}

/// Run until Ctrl-C
pub async fn run(config: Config, options: RunOptions) -> BridgeResult<()> {
    info!("🤖 Jarvis bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let bridge = start(&config, &options).await?;
    if bridge.controller.voice_enabled() {
        info!("🎤 Voice agent ready");
    } else {
        info!("🎭 Demo mode: set AGENT_ID and ELEVENLABS_API_KEY for voice");
    }

    if options.open_browser {
        open_browser(&format!("http://{}", bridge.http_addr));
    }

    info!("✅ Jarvis bridge ready - press Ctrl+C to stop");
    wait_for_shutdown().await;
    bridge.shutdown().await;
    Ok(())
}

async fn bind(host: &str, port: u16) -> BridgeResult<TcpListener> {
    TcpListener::bind((host, port))
        .await
        .map_err(|e| BridgeError::Server(format!("Cannot bind {}:{}: {}", host, port, e)))
}

fn serve(
    name: &'static str,
    listener: TcpListener,
    router: axum::Router,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            })
            .await;
        match result {
            Ok(()) => debug!("{} server stopped", name),
            Err(e) => error!("❌ {} server failed: {}", name, e),
        }
    })
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("❌ Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("⚠️ Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 Shutdown signal received");
}

fn open_browser(url: &str) {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    };

    match std::process::Command::new(opener).arg(url).spawn() {
        Ok(_) => info!("🌍 Opened {} in the browser", url),
        Err(e) => warn!("⚠️ Could not open browser ({}): {}", opener, e),
    }
}
