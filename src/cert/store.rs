//! SNI → certificate index
//!
//! `CertStore` holds every parsed cert keyed by name; [`CertIndex`] maps a
//! lowercased domain to the cert a given protocol should present, built from
//! the `https`/`http3` vhost declarations that reference certs by name.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{Config, Protocol};

use super::error::CertError;
use super::parse;
use super::types::ParsedCert;

/// Every configured cert, parsed once, keyed by name.
#[derive(Default)]
pub struct CertStore {
    by_name: HashMap<String, Arc<ParsedCert>>,
}

impl CertStore {
    pub fn build(cfg: &Config) -> Result<CertStore, CertError> {
        let mut by_name = HashMap::with_capacity(cfg.cert.len());
        for cert in &cfg.cert {
            let parsed = parse::parse(&cert.name, &cert.content)?;
            by_name.insert(cert.name.clone(), Arc::new(parsed));
        }
        Ok(CertStore { by_name })
    }

    pub fn get(&self, name: &str) -> Option<Arc<ParsedCert>> {
        self.by_name.get(name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ParsedCert>> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }
}

/// Per-protocol SNI lookup table, derived from a [`CertStore`] and a
/// [`Config`]'s https/http3 vhost declarations.
#[derive(Default, Clone)]
pub struct CertIndex {
    by_domain: HashMap<String, Arc<ParsedCert>>,
}

impl CertIndex {
    pub fn build(store: &CertStore, cfg: &Config, protocol: Protocol) -> Result<CertIndex, CertError> {
        let section = cfg.section(protocol);
        let mut by_domain = HashMap::new();
        if let Some(section) = section {
            for vhost in &section.vhost {
                let cert_name = vhost.cert.as_deref().unwrap_or("");
                let cert = store
                    .get(cert_name)
                    .ok_or_else(|| CertError::NotFound(cert_name.to_string()))?;
                by_domain.insert(vhost.domain.to_ascii_lowercase(), cert);
            }
        }
        Ok(CertIndex { by_domain })
    }

    /// Exact match on the lowercased server name; no wildcard matching.
    pub fn get_for_sni(&self, sni: &str) -> Option<Arc<ParsedCert>> {
        self.by_domain.get(&sni.to_ascii_lowercase()).cloned()
    }

    pub fn len(&self) -> usize {
        self.by_domain.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CertConfig, HttpSectionConfig, MappingConfig, VhostConfig};

    const TEST_CERT_PEM: &str = include_str!("../../tests/fixtures/test_cert.pem");

    fn sample_config() -> Config {
        Config {
            https: Some(HttpSectionConfig {
                listen: vec![":443".into()],
                vhost: vec![VhostConfig {
                    name: "a".into(),
                    domain: "A.Example".into(),
                    mapping: vec![MappingConfig {
                        path: "/".into(),
                        target: "http://u:9".into(),
                        ..Default::default()
                    }],
                    cert: Some("a".into()),
                }],
            }),
            cert: vec![CertConfig { name: "a".into(), content: TEST_CERT_PEM.into() }],
            ..Default::default()
        }
    }

    #[test]
    fn looks_up_by_lowercased_domain() {
        let cfg = sample_config();
        let store = CertStore::build(&cfg).unwrap();
        let index = CertIndex::build(&store, &cfg, Protocol::Https).unwrap();

        assert!(index.get_for_sni("a.example").is_some());
        assert!(index.get_for_sni("A.EXAMPLE").is_some());
        assert!(index.get_for_sni("unknown").is_none());
    }

    #[test]
    fn missing_cert_reference_is_an_error() {
        let mut cfg = sample_config();
        cfg.https.as_mut().unwrap().vhost[0].cert = Some("missing".into());
        let store = CertStore::build(&cfg).unwrap();
        assert!(CertIndex::build(&store, &cfg, Protocol::Https).is_err());
    }
}
