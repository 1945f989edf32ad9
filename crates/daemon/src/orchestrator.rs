//! Share orchestrator for wiring together all components.
//!
//! This module provides the `ShareOrchestrator` that opens the shared folder,
//! binds the HTTP listener, runs the server until shutdown and reports what
//! happens through a broadcast channel.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use protocol::DeviceRecord;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::devices::DeviceRegistry;
use crate::server::{self, AppState};

/// Capacity of the event channel.
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    /// Initial state, not started.
    Stopped,
    /// Binding the listener.
    Starting,
    /// Serving requests.
    Running,
    /// Draining in-flight requests.
    ShuttingDown,
}

/// Events emitted by the orchestrator.
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    /// Orchestrator state changed.
    StateChanged(OrchestratorState),
    /// The listener is bound.
    Listening { addr: SocketAddr },
    /// A device was seen for the first time.
    DeviceConnected(DeviceRecord),
    /// An upload request finished saving files.
    FilesUploaded { names: Vec<String> },
    /// Error occurred.
    Error { message: String },
}

/// Runs the HTTP server for one shared folder.
pub struct ShareOrchestrator {
    /// Configuration.
    config: Config,
    /// Current state.
    state: Arc<RwLock<OrchestratorState>>,
    /// Devices seen since the orchestrator was created.
    registry: Arc<DeviceRegistry>,
    /// Cancellation token for graceful shutdown.
    shutdown_token: CancellationToken,
    /// Event sender.
    event_tx: broadcast::Sender<OrchestratorEvent>,
    /// Bound address while running.
    local_addr: Option<SocketAddr>,
    /// Server task while running.
    server_task: Option<JoinHandle<()>>,
}

impl ShareOrchestrator {
    /// Creates a new orchestrator. Nothing is bound until [`start`](Self::start).
    pub fn new(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        match &config.share.root {
            Some(root) => info!("Sharing folder {}", root.display()),
            None => warn!("No folder selected for sharing"),
        }

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config,
            state: Arc::new(RwLock::new(OrchestratorState::Stopped)),
            registry: Arc::new(DeviceRegistry::new()),
            shutdown_token: CancellationToken::new(),
            event_tx,
            local_addr: None,
            server_task: None,
        })
    }

    /// Returns the current state.
    pub async fn state(&self) -> OrchestratorState {
        *self.state.read().await
    }

    /// Returns a receiver for orchestrator events.
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.event_tx.subscribe()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the device registry.
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Address the listener is bound to, while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Returns the shutdown token for external tasks to observe shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Bind the listener and start serving. Returns the bound address.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        {
            let mut state = self.state.write().await;
            if *state != OrchestratorState::Stopped {
                anyhow::bail!("Orchestrator is already running");
            }
            *state = OrchestratorState::Starting;
        }
        self.emit_event(OrchestratorEvent::StateChanged(OrchestratorState::Starting));

        match self.bind_and_spawn().await {
            Ok(addr) => {
                *self.state.write().await = OrchestratorState::Running;
                self.emit_event(OrchestratorEvent::StateChanged(OrchestratorState::Running));
                Ok(addr)
            }
            Err(e) => {
                *self.state.write().await = OrchestratorState::Stopped;
                self.emit_event(OrchestratorEvent::Error {
                    message: format!("{:#}", e),
                });
                self.emit_event(OrchestratorEvent::StateChanged(OrchestratorState::Stopped));
                Err(e)
            }
        }
    }

    async fn bind_and_spawn(&mut self) -> Result<SocketAddr> {
        let app_state = AppState::new(&self.config, Arc::clone(&self.registry), self.event_tx.clone())
            .context("Failed to open shared folder")?;
        let app = server::router(Arc::new(app_state), self.config.share.max_upload_size);

        let ip: IpAddr = self
            .config
            .server
            .bind_addr
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.config.server.bind_addr))?;
        let listener = TcpListener::bind(SocketAddr::new(ip, self.config.server.port))
            .await
            .with_context(|| {
                format!(
                    "Failed to bind {}:{}",
                    self.config.server.bind_addr, self.config.server.port
                )
            })?;
        let addr = listener.local_addr()?;

        // A previous run cancelled the old token.
        if self.shutdown_token.is_cancelled() {
            self.shutdown_token = CancellationToken::new();
        }
        let shutdown = self.shutdown_token.clone();
        let event_tx = self.event_tx.clone();

        self.server_task = Some(tokio::spawn(async move {
            let result = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await;

            if let Err(e) = result {
                error!("HTTP server error: {}", e);
                let _ = event_tx.send(OrchestratorEvent::Error {
                    message: e.to_string(),
                });
            }
        }));

        self.local_addr = Some(addr);
        info!("Listening on {}", addr);
        self.emit_event(OrchestratorEvent::Listening { addr });
        Ok(addr)
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn stop(&mut self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if *state == OrchestratorState::Stopped {
                return Ok(());
            }
            if *state == OrchestratorState::ShuttingDown {
                anyhow::bail!("Orchestrator is already shutting down");
            }
            *state = OrchestratorState::ShuttingDown;
        }
        self.emit_event(OrchestratorEvent::StateChanged(OrchestratorState::ShuttingDown));

        info!("Stopping fileshare server...");
        self.shutdown_token.cancel();

        if let Some(task) = self.server_task.take() {
            if let Err(e) = task.await {
                warn!("Server task ended abnormally: {}", e);
            }
        }
        self.local_addr = None;

        *self.state.write().await = OrchestratorState::Stopped;
        self.emit_event(OrchestratorEvent::StateChanged(OrchestratorState::Stopped));

        info!("Fileshare server stopped");
        Ok(())
    }

    /// Emits an orchestrator event.
    fn emit_event(&self, event: OrchestratorEvent) {
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config(temp_dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.server.bind_addr = "127.0.0.1".to_string();
        config.server.port = 0;
        config.share.root = Some(temp_dir.path().to_path_buf());
        config
    }

    #[tokio::test]
    async fn test_orchestrator_creation() {
        let temp_dir = TempDir::new().unwrap();
        let orchestrator = ShareOrchestrator::new(create_test_config(&temp_dir)).unwrap();

        assert_eq!(orchestrator.state().await, OrchestratorState::Stopped);
        assert!(orchestrator.local_addr().is_none());
        assert!(orchestrator.registry().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = create_test_config(&temp_dir);
        config.share.root = Some(temp_dir.path().join("missing"));

        assert!(ShareOrchestrator::new(config).is_err());
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let temp_dir = TempDir::new().unwrap();
        let mut orchestrator = ShareOrchestrator::new(create_test_config(&temp_dir)).unwrap();
        let mut events = orchestrator.subscribe();

        let addr = orchestrator.start().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(orchestrator.state().await, OrchestratorState::Running);
        assert_eq!(orchestrator.local_addr(), Some(addr));

        // Second start is refused while running.
        assert!(orchestrator.start().await.is_err());

        orchestrator.stop().await.unwrap();
        assert_eq!(orchestrator.state().await, OrchestratorState::Stopped);
        assert!(orchestrator.local_addr().is_none());
        assert!(orchestrator.shutdown_token().is_cancelled());

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert!(seen
            .iter()
            .any(|e| matches!(e, OrchestratorEvent::Listening { addr: a } if *a == addr)));
        assert!(matches!(
            seen.last(),
            Some(OrchestratorEvent::StateChanged(OrchestratorState::Stopped))
        ));
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let temp_dir = TempDir::new().unwrap();
        let mut orchestrator = ShareOrchestrator::new(create_test_config(&temp_dir)).unwrap();

        orchestrator.start().await.unwrap();
        orchestrator.stop().await.unwrap();

        orchestrator.start().await.unwrap();
        assert!(!orchestrator.shutdown_token().is_cancelled());
        orchestrator.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_when_stopped_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let mut orchestrator = ShareOrchestrator::new(create_test_config(&temp_dir)).unwrap();

        orchestrator.stop().await.unwrap();
        assert_eq!(orchestrator.state().await, OrchestratorState::Stopped);
    }

    #[tokio::test]
    async fn test_bind_failure_returns_to_stopped() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut config = create_test_config(&temp_dir);
        config.server.port = blocker.local_addr().unwrap().port();

        let mut orchestrator = ShareOrchestrator::new(config).unwrap();
        let mut events = orchestrator.subscribe();

        assert!(orchestrator.start().await.is_err());
        assert_eq!(orchestrator.state().await, OrchestratorState::Stopped);

        let mut saw_error = false;
        while let Ok(event) = events.try_recv() {
            saw_error |= matches!(event, OrchestratorEvent::Error { .. });
        }
        assert!(saw_error);
    }

    #[tokio::test]
    async fn test_runs_without_shared_folder() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = create_test_config(&temp_dir);
        config.share.root = None;

        let mut orchestrator = ShareOrchestrator::new(config).unwrap();
        orchestrator.start().await.unwrap();
        orchestrator.stop().await.unwrap();
    }
}
