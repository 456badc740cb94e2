//! Reverse proxy engine
//!
//! Turns routing decisions into responses and owns the upstream transport
//! pools (HTTP/1.1+h2 via hyper, HTTP/3 via h3-quinn).

mod engine;
mod h3_client;

pub use engine::{BoxBody, Engine};
