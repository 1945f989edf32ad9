//! HTTP server for the shared folder.
//!
//! Routes:
//! - `GET /` and `GET /<subpath>`: listing with search and thumbnails
//! - `POST /upload`: multipart upload into the shared root
//! - `GET /download/<path>`: file download
//! - `POST /connect`, `GET /connected_devices`: device tracking

pub mod error;
pub mod handlers;
pub mod pages;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderMap};
use axum::routing::{get, post};
use axum::Router;
use tokio::sync::{broadcast, Semaphore};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::devices::DeviceRegistry;
use crate::files::{BrowserError, DirectoryBrowser, FileTransfer, ThumbnailGenerator};
use crate::orchestrator::OrchestratorEvent;

pub use error::{ApiError, NO_SHARED_FOLDER};

/// Filesystem access for the shared folder.
#[derive(Debug)]
pub struct Share {
    pub browser: Arc<DirectoryBrowser>,
    pub transfer: FileTransfer,
}

impl Share {
    /// Open the share described by `config`, if a root is configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, BrowserError> {
        let Some(root) = &config.share.root else {
            return Ok(None);
        };

        let mut browser = DirectoryBrowser::new(root)?.show_hidden(config.share.show_hidden);
        if config.thumbnail.enabled {
            browser = browser.with_thumbnails(ThumbnailGenerator::from_config(&config.thumbnail));
        }

        let browser = Arc::new(browser);
        Ok(Some(Self {
            transfer: FileTransfer::new(Arc::clone(&browser)),
            browser,
        }))
    }
}

/// State shared by all handlers.
pub struct AppState {
    /// `None` when no folder is shared.
    pub share: Option<Share>,
    /// Devices seen so far.
    pub registry: Arc<DeviceRegistry>,
    /// Bounds concurrent listing jobs, which decode thumbnails.
    pub listing_permits: Arc<Semaphore>,
    /// Event channel of the owning orchestrator.
    events: broadcast::Sender<OrchestratorEvent>,
}

impl AppState {
    /// Build handler state from the configuration.
    pub fn new(
        config: &Config,
        registry: Arc<DeviceRegistry>,
        events: broadcast::Sender<OrchestratorEvent>,
    ) -> Result<Self, BrowserError> {
        Ok(Self {
            share: Share::from_config(config)?,
            registry,
            listing_permits: Arc::new(Semaphore::new(config.thumbnail.workers.max(1))),
            events,
        })
    }

    /// The active share, or the "no folder" response.
    pub fn share(&self) -> Result<&Share, ApiError> {
        self.share.as_ref().ok_or(ApiError::NoSharedFolder)
    }

    /// Register the client behind a request.
    pub fn register_visit(&self, addr: SocketAddr, headers: &HeaderMap) {
        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok());
        let address = addr.ip().to_canonical().to_string();

        if let Some(record) = self.registry.register(&address, user_agent) {
            self.emit(OrchestratorEvent::DeviceConnected(record));
        }
    }

    pub(crate) fn emit(&self, event: OrchestratorEvent) {
        let _ = self.events.send(event);
    }
}

/// Build the router. `max_upload_size` of 0 disables the body limit.
pub fn router(state: Arc<AppState>, max_upload_size: u64) -> Router {
    let body_limit = if max_upload_size == 0 {
        DefaultBodyLimit::disable()
    } else {
        DefaultBodyLimit::max(usize::try_from(max_upload_size).unwrap_or(usize::MAX))
    };

    Router::new()
        .route("/", get(handlers::index))
        .route("/upload", post(handlers::upload))
        .route("/download/*path", get(handlers::download))
        .route("/connect", post(handlers::connect))
        .route("/connected_devices", get(handlers::connected_devices))
        .fallback(handlers::browse)
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
