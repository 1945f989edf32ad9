//! Terminal output for the fileshare daemon.
//!
//! Currently this is the QR code printed at startup so phones can open the
//! share URL without typing it.

pub mod qr;

pub use qr::{generate_png_qr, generate_png_qr_bytes, generate_terminal_qr, ShareCode};
