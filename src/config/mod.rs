//! Configuration model
//!
//! Typed schema ([`types`]), validation invariants ([`validator`]), and the
//! YAML file round-trip ([`loader`]) that together implement the config
//! model and validator component.

pub mod defaults;
pub mod error;
pub mod loader;
pub mod types;
pub mod validator;

pub use error::{ConfigError, Result};
pub use types::{
    ApiConfig, AuthConfig, CertConfig, CertInfo, Config, HttpSectionConfig, MappingConfig,
    Protocol, VhostConfig,
};
pub use validator::validate;
