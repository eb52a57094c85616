//! Supervisor: binds both services, runs them side by side and stops them
//! together.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::config::Config;
use crate::core::{bind_with_fallback, BindError, ContentStore};
use crate::server::editor::EditorService;
use crate::server::handler;
use crate::server::preview::PreviewService;

/// Lifecycle of the two services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    BindingEditor,
    BindingPreview,
    Serving,
    ShuttingDown,
    Stopped,
}

struct Running {
    editor_addr: SocketAddr,
    preview_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    tasks: JoinSet<(&'static str, std::io::Result<()>)>,
}

pub struct Supervisor {
    config: Config,
    store: Arc<ContentStore>,
    has_custom_template: bool,
    phase: Phase,
    running: Option<Running>,
}

impl Supervisor {
    pub fn new(config: Config, store: Arc<ContentStore>, has_custom_template: bool) -> Self {
        Self {
            config,
            store,
            has_custom_template,
            phase: Phase::Idle,
            running: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn editor_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.editor_addr)
    }

    pub fn preview_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.preview_addr)
    }

    fn transition(&mut self, next: Phase) {
        log::debug!("Supervisor {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    /// Bind editor then preview and start serving both.
    ///
    /// If either bind fails nothing is left listening.
    pub async fn start(&mut self) -> Result<(), BindError> {
        let host = self.config.bind_address;

        self.transition(Phase::BindingEditor);
        let editor = match bind_with_fallback(
            host,
            self.config.editor_port,
            self.config.port_attempts,
        )
        .await
        {
            Ok(binding) => binding,
            Err(e) => {
                self.transition(Phase::Stopped);
                return Err(e);
            }
        };

        self.transition(Phase::BindingPreview);
        let preview = match bind_with_fallback(
            host,
            self.config.preview_port,
            self.config.preview_attempts(),
        )
        .await
        {
            Ok(binding) => binding,
            Err(e) => {
                self.transition(Phase::Stopped);
                return Err(e);
            }
        };

        let editor_addr = editor.local_addr();
        let preview_addr = preview.local_addr();

        let editor_service = Arc::new(EditorService::new(
            Arc::clone(&self.store),
            preview.port(),
            self.has_custom_template,
            self.config.default_filename.clone(),
        ));
        let preview_service = Arc::new(PreviewService::new(Arc::clone(&self.store)));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = JoinSet::new();

        let editor_shutdown = shutdown_rx.clone();
        tasks.spawn(async move {
            let result = handler::serve(editor, editor_service, editor_shutdown).await;
            ("editor", result)
        });
        tasks.spawn(async move {
            let result = handler::serve(preview, preview_service, shutdown_rx).await;
            ("preview", result)
        });

        self.running = Some(Running {
            editor_addr,
            preview_addr,
            shutdown_tx,
            tasks,
        });
        self.transition(Phase::Serving);
        Ok(())
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(&mut self) {
        let Some(mut running) = self.running.take() else {
            self.transition(Phase::Stopped);
            return;
        };

        self.transition(Phase::ShuttingDown);
        let _ = running.shutdown_tx.send(true);

        while let Some(joined) = running.tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((name, Err(e))) => log::error!("{} server failed: {}", name, e),
                Err(e) => log::error!("Server task ended abnormally: {}", e),
            }
        }

        self.transition(Phase::Stopped);
    }

    /// Start, open the editor in a browser, and serve until Ctrl-C.
    pub async fn run_until_interrupted(mut self) -> Result<()> {
        self.start().await.context("could not start servers")?;

        let (Some(editor_addr), Some(preview_addr)) = (self.editor_addr(), self.preview_addr())
        else {
            anyhow::bail!("servers not running after startup");
        };
        let editor_url = browse_url(editor_addr);

        println!("Editor server started at {}", editor_url);
        println!("Preview server started at {}", browse_url(preview_addr));

        if self.config.open_browser {
            println!("Opening browser...");
            if let Err(e) = open::that_detached(&editor_url) {
                log::warn!("Failed to open browser: {}", e);
            }
        }
        println!("Press Ctrl+C to stop");

        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for interrupt: {}", e);
        }

        println!("\nShutting down...");
        self.shutdown().await;
        Ok(())
    }
}

/// URL a local browser can reach `addr` on
pub fn browse_url(addr: SocketAddr) -> String {
    let ip = addr.ip();
    if ip.is_loopback() || ip.is_unspecified() {
        format!("http://localhost:{}/", addr.port())
    } else {
        format!("http://{}/", addr)
    }
}
