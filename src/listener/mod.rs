//! Listener lifecycle
//!
//! Three protocol-specific listener implementations (plain HTTP, TLS-
//! terminated HTTP, and HTTP/3) plus the supervisor that starts and stops
//! them as the configured endpoint sets change on reload.

pub mod http;
pub mod http3;
pub mod https;
pub mod supervisor;
