//! PEM decoding for configured certificates
//!
//! A cert's `content` is a PEM bundle carrying one leaf certificate, an
//! optional chain, and exactly one private key in PKCS#1 (RSA), PKCS#8, or
//! SEC1 (EC) form.

use std::sync::RwLock;

use openssl::ec::EcKey;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::x509::X509;

use crate::config::CertInfo;

use super::error::CertError;
use super::types::ParsedCert;

pub fn parse(name: &str, content: &str) -> Result<ParsedCert, CertError> {
    let blocks = X509::stack_from_pem(content.as_bytes())
        .map_err(|e| CertError::ParseFailed(name.to_string(), e.to_string()))?;
    let mut blocks = blocks.into_iter();
    let leaf = blocks.next().ok_or_else(|| CertError::Empty(name.to_string()))?;
    let chain: Vec<X509> = blocks.collect();

    let key = parse_private_key(content)
        .ok_or_else(|| CertError::MissingKey(name.to_string()))?;

    let info = cert_info(name, &leaf)
        .map_err(|e| CertError::ParseFailed(name.to_string(), e.to_string()))?;
    let ocsp_responders = leaf
        .ocsp_responders()
        .map(|stack| stack.iter().map(|s| s.to_string()).collect())
        .unwrap_or_default();

    Ok(ParsedCert {
        name: name.to_string(),
        leaf,
        chain,
        key,
        ocsp_responders,
        staple: RwLock::new(None),
        info,
    })
}

fn parse_private_key(pem: &str) -> Option<PKey<openssl::pkey::Private>> {
    let bytes = pem.as_bytes();
    if let Ok(key) = PKey::private_key_from_pem(bytes) {
        return Some(key);
    }
    if let Ok(rsa) = Rsa::private_key_from_pem(bytes) {
        if let Ok(key) = PKey::from_rsa(rsa) {
            return Some(key);
        }
    }
    if let Ok(ec) = EcKey::private_key_from_pem(bytes) {
        if let Ok(key) = PKey::from_ec_key(ec) {
            return Some(key);
        }
    }
    None
}

fn cert_info(name: &str, leaf: &X509) -> Result<CertInfo, openssl::error::ErrorStack> {
    let domain = leaf
        .subject_alt_names()
        .map(|sans| {
            sans.iter()
                .filter_map(|san| san.dnsname().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();
    let issuer = format!("{:?}", leaf.issuer_name());
    let valid_start = leaf.not_before().to_string();
    let valid_stop = leaf.not_after().to_string();

    Ok(CertInfo {
        name: name.to_string(),
        domain,
        issuer,
        valid_start,
        valid_stop,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_CERT_PEM: &str = include_str!("../../tests/fixtures/test_cert.pem");

    #[test]
    fn parses_leaf_without_chain() {
        let parsed = parse("a", TEST_CERT_PEM).expect("parse should succeed");
        assert_eq!(parsed.chain_len(), 1);
        assert!(parsed.chain.is_empty());
    }

    #[test]
    fn rejects_empty_pem() {
        assert!(parse("a", "").is_err());
    }
}
