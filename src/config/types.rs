//! Configuration schema
//!
//! Typed mirror of the YAML document described in the configuration file
//! contract: an optional `api` section, one optional section per listener
//! protocol (`http`, `https`, `http3`), and an ordered list of certificates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which listener protocol a vhost or section belongs to.
///
/// `http` vhosts carry no certificate; `https` and `http3` vhosts require one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Http,
    Https,
    Http3,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Http3 => "http3",
        }
    }

    pub fn requires_cert(&self) -> bool {
        matches!(self, Protocol::Https | Protocol::Http3)
    }
}

/// Root configuration aggregate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpSectionConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub https: Option<HttpSectionConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http3: Option<HttpSectionConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cert: Vec<CertConfig>,
}

impl Config {
    /// Normalizes nil-vs-empty collections to empty collections so that
    /// `decode(encode(autofill(c))) == autofill(c)` for every valid `c`.
    pub fn autofill(&mut self) {
        if let Some(http) = &mut self.http {
            http.autofill();
        }
        if let Some(https) = &mut self.https {
            https.autofill();
        }
        if let Some(http3) = &mut self.http3 {
            http3.autofill();
        }
    }

    /// Returns the section for a given protocol, if configured.
    pub fn section(&self, protocol: Protocol) -> Option<&HttpSectionConfig> {
        match protocol {
            Protocol::Http => self.http.as_ref(),
            Protocol::Https => self.https.as_ref(),
            Protocol::Http3 => self.http3.as_ref(),
        }
    }

    pub fn section_mut(&mut self, protocol: Protocol) -> &mut Option<HttpSectionConfig> {
        match protocol {
            Protocol::Http => &mut self.http,
            Protocol::Https => &mut self.https,
            Protocol::Http3 => &mut self.http3,
        }
    }

    pub fn cert_by_name(&self, name: &str) -> Option<&CertConfig> {
        self.cert.iter().find(|c| c.name == name)
    }
}

/// Management API listener section: `{ listen, auth?, public? }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub listen: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub public: Option<PathBuf>,
}

/// Single operator credential pair gating the management API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

/// Shared shape of the `http`, `https`, and `http3` top-level sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpSectionConfig {
    #[serde(default)]
    pub listen: Vec<String>,

    #[serde(default)]
    pub vhost: Vec<VhostConfig>,
}

impl HttpSectionConfig {
    fn autofill(&mut self) {
        for vhost in &mut self.vhost {
            vhost.autofill();
        }
    }

    pub fn vhost_by_domain(&self, domain: &str) -> Option<&VhostConfig> {
        self.vhost.iter().find(|v| v.domain.eq_ignore_ascii_case(domain))
    }
}

/// A named routing entry keyed by one domain.
///
/// `cert` is required for https/http3 vhosts and absent for http vhosts;
/// enforced by [`super::validator::validate`], not by the type itself,
/// since the same struct is reused across all three sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VhostConfig {
    pub name: String,
    pub domain: String,

    #[serde(default)]
    pub mapping: Vec<MappingConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
}

impl VhostConfig {
    fn autofill(&mut self) {
        for mapping in &mut self.mapping {
            mapping.autofill();
        }
    }
}

/// A prefix-to-target rule describing how one URL-path subtree is proxied
/// or redirected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingConfig {
    pub path: String,
    pub target: String,

    #[serde(default)]
    pub add_header: Vec<String>,

    #[serde(default)]
    pub basic_auth: Vec<String>,

    #[serde(default)]
    pub proxy_header: bool,

    #[serde(default)]
    pub redirect: bool,
}

impl MappingConfig {
    fn autofill(&mut self) {
        // Vecs are already empty-by-default via serde(default); nothing to
        // normalize beyond that, but kept as an explicit hook so Autofill's
        // contract stays visible at every level of the tree.
    }
}

/// `{ name, content }` where `content` is a PEM bundle: one leaf certificate,
/// an optional chain, and exactly one private key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CertConfig {
    pub name: String,
    pub content: String,
}

/// Derived, non-secret metadata about a parsed certificate, returned by the
/// management API instead of raw PEM content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertInfo {
    pub name: String,
    pub domain: Vec<String>,
    pub issuer: String,
    pub valid_start: String,
    pub valid_stop: String,
}
