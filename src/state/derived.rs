//! Derived views over an installed [`Config`]: routing tables and
//! certificate indices, one set per protocol, each independently swappable.

use arc_swap::ArcSwap;

use crate::cert::{CertIndex, CertStore};
use crate::config::{Config, Protocol};
use crate::routing::RoutingTable;

/// Builds a fresh [`CertStore`] and the routing tables / cert indices
/// derived from it and the given config. Pure; the caller decides when to
/// install the result.
pub struct Derived {
    pub cert_store: CertStore,
    pub http: RoutingTable,
    pub https: RoutingTable,
    pub http3: RoutingTable,
    pub https_certs: CertIndex,
    pub http3_certs: CertIndex,
}

impl Derived {
    pub fn build(cfg: &Config) -> Result<Derived, crate::common::ProxyError> {
        let cert_store = CertStore::build(cfg)?;
        let http = cfg
            .http
            .as_ref()
            .map(RoutingTable::build)
            .transpose()
            .map_err(crate::common::ProxyError::Config)?
            .unwrap_or_default();
        let https = cfg
            .https
            .as_ref()
            .map(RoutingTable::build)
            .transpose()
            .map_err(crate::common::ProxyError::Config)?
            .unwrap_or_default();
        let http3 = cfg
            .http3
            .as_ref()
            .map(RoutingTable::build)
            .transpose()
            .map_err(crate::common::ProxyError::Config)?
            .unwrap_or_default();
        let https_certs = CertIndex::build(&cert_store, cfg, Protocol::Https)?;
        let http3_certs = CertIndex::build(&cert_store, cfg, Protocol::Http3)?;

        Ok(Derived { cert_store, http, https, http3, https_certs, http3_certs })
    }
}

/// Holds the currently installed derived views, each behind its own atomic
/// swap so unrelated protocols never contend on reload.
pub struct DerivedViews {
    pub cert_store: ArcSwap<CertStore>,
    pub http: ArcSwap<RoutingTable>,
    pub https: ArcSwap<RoutingTable>,
    pub http3: ArcSwap<RoutingTable>,
    pub https_certs: ArcSwap<CertIndex>,
    pub http3_certs: ArcSwap<CertIndex>,
}

impl DerivedViews {
    pub fn new(derived: Derived) -> DerivedViews {
        DerivedViews {
            cert_store: ArcSwap::from_pointee(derived.cert_store),
            http: ArcSwap::from_pointee(derived.http),
            https: ArcSwap::from_pointee(derived.https),
            http3: ArcSwap::from_pointee(derived.http3),
            https_certs: ArcSwap::from_pointee(derived.https_certs),
            http3_certs: ArcSwap::from_pointee(derived.http3_certs),
        }
    }

    pub fn install(&self, derived: Derived) {
        self.cert_store.store(std::sync::Arc::new(derived.cert_store));
        self.http.store(std::sync::Arc::new(derived.http));
        self.https.store(std::sync::Arc::new(derived.https));
        self.http3.store(std::sync::Arc::new(derived.http3));
        self.https_certs.store(std::sync::Arc::new(derived.https_certs));
        self.http3_certs.store(std::sync::Arc::new(derived.http3_certs));
    }
}
