//! Certificate errors

use thiserror::Error;

/// Errors raised while parsing a configured certificate or looking one up
/// for a TLS handshake.
#[derive(Error, Debug)]
pub enum CertError {
    #[error("cert {0} not found")]
    NotFound(String),

    #[error("cert {0}: no certificate found")]
    Empty(String),

    #[error("cert {0}: {1}")]
    ParseFailed(String, String),

    #[error("cert {0}: no private key found")]
    MissingKey(String),
}

impl From<CertError> for crate::common::ProxyError {
    fn from(err: CertError) -> Self {
        crate::common::ProxyError::Certificate(err.to_string())
    }
}
