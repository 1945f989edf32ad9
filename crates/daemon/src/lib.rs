//! # fileshare Daemon Library
//!
//! This crate serves one folder over HTTP to every device on the local
//! network: browsers can list, search, download and upload files without
//! installing anything.
//!
//! ## Overview
//!
//! - **Listing**: Directory pages with search and thumbnails for images and videos
//! - **Transfer**: Streamed downloads and multipart uploads into the shared root
//! - **Devices**: Every visiting browser is recorded with its OS and browser
//! - **User Interface**: Terminal QR code with the share URL
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  Share Orchestrator                  │
//! ├──────────────────────────────────────────────────────┤
//! │  ┌────────────────────────────────────────────────┐  │
//! │  │              HTTP server (axum)                │  │
//! │  └────────────────────────────────────────────────┘  │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────┐  │
//! │  │  Directory   │  │     File     │  │  Device   │  │
//! │  │   Browser    │  │   Transfer   │  │ Registry  │  │
//! │  └──────────────┘  └──────────────┘  └───────────┘  │
//! │  ┌──────────────────────────────┐                    │
//! │  │     Thumbnail Generator      │                    │
//! │  └──────────────────────────────┘                    │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use daemon::{Config, ShareOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::load_default()?;
//!     config.share.root = Some("/srv/share".into());
//!
//!     let mut orchestrator = ShareOrchestrator::new(config)?;
//!     let addr = orchestrator.start().await?;
//!     println!("Serving on {}", addr);
//!
//!     tokio::signal::ctrl_c().await?;
//!     orchestrator.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`devices`]: Device registry and user-agent parsing
//! - [`files`]: Directory listing, thumbnails and transfers
//! - [`logging`]: Tracing subscriber setup
//! - [`network`]: LAN address discovery
//! - [`server`]: HTTP routes, handlers and pages
//! - [`ui`]: QR code generation
//! - [`orchestrator`]: Server lifecycle

pub mod config;
pub mod devices;
pub mod files;
pub mod logging;
pub mod network;
pub mod orchestrator;
pub mod server;
pub mod ui;

// Re-export protocol for convenience
pub use protocol;

// Re-export config types for convenience
pub use config::Config;

// Re-export device types for convenience
pub use devices::{ClientInfo, DeviceRegistry};

// Re-export files types for convenience
pub use files::{DirectoryBrowser, DirectoryEntry, FileTransfer, Thumbnail, ThumbnailGenerator};

// Re-export server types for convenience
pub use server::{router, ApiError, AppState};

// Re-export UI types for convenience
pub use ui::{generate_png_qr, generate_terminal_qr, ShareCode};

// Re-export orchestrator types for convenience
pub use orchestrator::{OrchestratorEvent, OrchestratorState, ShareOrchestrator};
