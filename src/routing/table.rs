//! Compiled per-protocol routing table
//!
//! Built from a validated [`HttpSectionConfig`]; mappings are kept in
//! declared order and matched by first-match-wins prefix, never sorted.

use std::collections::{HashMap, HashSet};

use base64::Engine;
use url::Url;

use crate::config::{HttpSectionConfig, MappingConfig};

/// One mapping, pre-compiled: parsed target, multi-map headers, and a
/// base64-encoded basic-auth allow-list.
#[derive(Debug, Clone)]
pub struct CompiledMapping {
    pub path: String,
    pub target: Url,
    pub add_header: Vec<(String, String)>,
    pub basic_auth: HashSet<String>,
    pub proxy_header: bool,
    pub redirect: bool,
}

impl CompiledMapping {
    fn compile(cfg: &MappingConfig) -> Result<CompiledMapping, String> {
        let target = Url::parse(&cfg.target).map_err(|e| e.to_string())?;

        let mut add_header = Vec::with_capacity(cfg.add_header.len());
        for h in &cfg.add_header {
            let (k, v) = h.split_once(':').ok_or_else(|| "malformed add_header".to_string())?;
            add_header.push((k.trim().to_string(), v.trim().to_string()));
        }

        let basic_auth: HashSet<String> = cfg
            .basic_auth
            .iter()
            .map(|credential| base64::engine::general_purpose::STANDARD.encode(credential))
            .collect();

        Ok(CompiledMapping {
            path: cfg.path.clone(),
            target,
            add_header,
            basic_auth,
            proxy_header: cfg.proxy_header,
            redirect: cfg.redirect,
        })
    }

    pub fn requires_auth(&self) -> bool {
        !self.basic_auth.is_empty()
    }

    pub fn authorized(&self, basic_credential_b64: &str) -> bool {
        self.basic_auth.contains(basic_credential_b64)
    }
}

/// Domain → ordered mapping list, for one protocol.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    by_domain: HashMap<String, Vec<CompiledMapping>>,
}

impl RoutingTable {
    pub fn build(section: &HttpSectionConfig) -> Result<RoutingTable, String> {
        let mut by_domain = HashMap::with_capacity(section.vhost.len());
        for vhost in &section.vhost {
            let mut mappings = Vec::with_capacity(vhost.mapping.len());
            for mapping in &vhost.mapping {
                mappings.push(CompiledMapping::compile(mapping)?);
            }
            by_domain.insert(vhost.domain.to_ascii_lowercase(), mappings);
        }
        Ok(RoutingTable { by_domain })
    }

    /// Looks up the routing table for a request's host key (already
    /// stripped of `:port` and lowercased by the caller).
    pub fn mappings_for(&self, host_key: &str) -> Option<&[CompiledMapping]> {
        self.by_domain.get(host_key).map(|v| v.as_slice())
    }

    /// First entry whose `path` is a prefix of `request_path`.
    pub fn match_mapping<'a>(
        mappings: &'a [CompiledMapping],
        request_path: &str,
    ) -> Option<&'a CompiledMapping> {
        mappings.iter().find(|m| request_path.starts_with(m.path.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_domain.len()
    }
}

/// Strips a trailing `:port` (scanning from the right for the last `:`) and
/// lowercases, matching the router's host-key derivation.
pub fn host_key(host_header: &str) -> String {
    let host = match host_header.rfind(':') {
        Some(idx) => &host_header[..idx],
        None => host_header,
    };
    host.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VhostConfig;

    fn section() -> HttpSectionConfig {
        HttpSectionConfig {
            listen: vec![":80".into()],
            vhost: vec![VhostConfig {
                name: "a".into(),
                domain: "A.Example".into(),
                mapping: vec![
                    MappingConfig {
                        path: "/api/v2".into(),
                        target: "http://u:9/v2".into(),
                        ..Default::default()
                    },
                    MappingConfig {
                        path: "/api".into(),
                        target: "http://u:9".into(),
                        ..Default::default()
                    },
                ],
                cert: None,
            }],
        }
    }

    #[test]
    fn host_key_strips_port_and_lowercases() {
        assert_eq!(host_key("A.Example:8080"), "a.example");
        assert_eq!(host_key("A.Example"), "a.example");
    }

    #[test]
    fn first_match_wins_in_declared_order() {
        let table = RoutingTable::build(&section()).unwrap();
        let mappings = table.mappings_for("a.example").unwrap();

        let m = RoutingTable::match_mapping(mappings, "/api/v2/x").unwrap();
        assert_eq!(m.path, "/api/v2");

        let m = RoutingTable::match_mapping(mappings, "/api/other").unwrap();
        assert_eq!(m.path, "/api");
    }

    #[test]
    fn domain_lookup_is_case_insensitive() {
        let table = RoutingTable::build(&section()).unwrap();
        assert!(table.mappings_for("a.example").is_some());
    }

    #[test]
    fn basic_auth_is_base64_encoded_and_deduplicated() {
        let cfg = MappingConfig {
            path: "/".into(),
            target: "http://u:9".into(),
            basic_auth: vec!["user:pass".into(), "user:pass".into()],
            ..Default::default()
        };
        let compiled = CompiledMapping::compile(&cfg).unwrap();
        assert_eq!(compiled.basic_auth.len(), 1);
        assert!(compiled.authorized("dXNlcjpwYXNz"));
    }
}
