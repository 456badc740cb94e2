//! Management HTTP API
//!
//! A JSON/REST surface over the in-memory `Config`: reload/save, the
//! listen-set and api-config endpoints, CRUD over http/https/http3 vhosts
//! keyed by domain, and CRUD over certs keyed by name. Gated by an optional
//! single-credential HTTP Basic auth.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;
pub mod types;

pub use error::{AdminError, AdminResult};
pub use server::run;
