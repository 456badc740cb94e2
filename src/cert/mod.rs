//! Certificate store
//!
//! PEM decoding, the SNI→cert index per protocol, and the background OCSP
//! stapling refresher.

pub mod error;
pub mod ocsp;
pub mod parse;
pub mod store;
pub mod types;

pub use error::CertError;
pub use store::{CertIndex, CertStore};
pub use types::ParsedCert;
