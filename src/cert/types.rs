//! Parsed certificate representation

use std::sync::RwLock;

use openssl::pkey::{PKey, Private};
use openssl::x509::X509;

use crate::config::CertInfo;

/// A certificate configured under the `cert` section, fully parsed: leaf,
/// chain, private key, and a mutable OCSP staple slot the background
/// refresher writes into.
pub struct ParsedCert {
    pub name: String,
    pub leaf: X509,
    /// Chain beyond the leaf, in order; `chain[0]` is the issuer when present.
    pub chain: Vec<X509>,
    pub key: PKey<Private>,
    pub ocsp_responders: Vec<String>,
    pub staple: RwLock<Option<Vec<u8>>>,
    pub info: CertInfo,
}

impl ParsedCert {
    /// Certificate chain length including the leaf, matching the Go
    /// original's `len(cert.Certificate)` check used to gate OCSP eligibility.
    pub fn chain_len(&self) -> usize {
        1 + self.chain.len()
    }

    pub fn issuer(&self) -> Option<&X509> {
        self.chain.first()
    }

    pub fn current_staple(&self) -> Option<Vec<u8>> {
        self.staple.read().expect("staple lock poisoned").clone()
    }

    pub fn set_staple(&self, der: Vec<u8>) {
        *self.staple.write().expect("staple lock poisoned") = Some(der);
    }
}

impl std::fmt::Debug for ParsedCert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedCert")
            .field("name", &self.name)
            .field("chain_len", &self.chain_len())
            .field("domains", &self.info.domain)
            .finish()
    }
}
