//! vhostd: a multi-protocol virtual-host reverse proxy
//!
//! Accepts inbound HTTP/1.1, HTTPS, and HTTP/3 connections on operator-
//! defined listener endpoints, dispatches each request to an upstream
//! origin selected by host and URL path, and serves a management HTTP API
//! that mutates routing configuration while traffic continues to flow.
//!
//! # Example
//!
//! ```no_run
//! use vhostd::config;
//! use vhostd::state::App;
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> vhostd::common::Result<()> {
//!     let path = PathBuf::from("vhostd.yaml");
//!     let cfg = config::loader::load(&path).await?;
//!     let app = App::new(path, cfg).await?;
//!     tokio::signal::ctrl_c().await?;
//!     app.cancel.cancel();
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod cert;
pub mod common;
pub mod config;
pub mod listener;
pub mod proxy;
pub mod router;
pub mod routing;
pub mod state;

pub use common::{ProxyError, Result};

/// Application name, used for the default log-level env var prefix.
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
