//! # fileshare Protocol Library
//!
//! This crate holds the types exchanged between the fileshare daemon and
//! the browsers (or scripts) that talk to it over HTTP.
//!
//! ## Overview
//!
//! - **Message Definitions**: JSON bodies of `/connect` and
//!   `/connected_devices`, and the device record they carry
//! - **Entry Kinds**: file/directory classification used by listings
//! - **Size Labels**: base-1024 human-readable byte counts
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{format_size, ConnectedDevicesResponse, DeviceRecord};
//!
//! let device = DeviceRecord::new("192.168.1.20", "Firefox 121.0", "Linux");
//! let body = ConnectedDevicesResponse::new(vec![device]);
//! let json = serde_json::to_string(&body).unwrap();
//! assert!(json.contains("\"connected_devices\""));
//!
//! assert_eq!(format_size(1536), "1.50 KB");
//! ```
//!
//! ## Modules
//!
//! - [`messages`]: JSON message definitions
//! - [`size`]: byte count formatting

pub mod messages;
pub mod size;

pub use messages::{ConnectResponse, ConnectedDevicesResponse, DeviceRecord, EntryKind};
pub use size::{format_size, SIZE_UNITS};
