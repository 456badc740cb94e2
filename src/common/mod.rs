//! Common module
//!
//! Shared error types and utility functions used throughout the crate.

pub mod error;
pub mod fs;
pub mod log;

pub use error::{ProxyError, Result};
pub use fs::read_file;
pub use log::init_logger;
