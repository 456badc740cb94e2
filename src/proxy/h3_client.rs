//! HTTP/3 upstream transport
//!
//! Targets declared with an `h3://` scheme are dialed over QUIC via `h3` +
//! `h3-quinn` instead of the hyper client, since hyper has no QUIC support.
//! One `quinn::Connection` is cached per `host:port` authority and reused
//! across requests, mirroring the pooling the HTTP/1.1+h2 client gets for
//! free from `hyper_util`.

use std::collections::HashMap;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, Bytes};
use h3::client::SendRequest;
use h3_quinn::quinn;
use hyper::{Request, Response};
use tokio::sync::Mutex;

use crate::config::defaults::UPSTREAM_DIAL_TIMEOUT_SECS;

use super::engine::BoxBody;

/// A verifier that accepts any server certificate, matching the engine's
/// "upstream TLS verification is disabled by design" contract for h3 too.
#[derive(Debug)]
struct NoVerify;

impl rustls::client::danger::ServerCertVerifier for NoVerify {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

fn client_crypto() -> rustls::ClientConfig {
    let mut cfg = rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(NoVerify))
        .with_no_client_auth();
    cfg.alpn_protocols = vec![b"h3".to_vec()];
    cfg
}

/// Cache of live QUIC+h3 connections, keyed by `host:port` authority.
#[derive(Clone)]
pub struct Http3Client {
    endpoint: quinn::Endpoint,
    connections: Arc<Mutex<HashMap<String, SendRequest<h3_quinn::OpenStreams, Bytes>>>>,
}

impl Http3Client {
    pub fn new() -> Http3Client {
        let mut endpoint = quinn::Endpoint::client("0.0.0.0:0".parse().unwrap())
            .expect("bind outbound quic endpoint");
        let crypto = quinn::crypto::rustls::QuicClientConfig::try_from(client_crypto())
            .expect("quic-compatible rustls client config");
        endpoint.set_default_client_config(quinn::ClientConfig::new(Arc::new(crypto)));
        Http3Client { endpoint, connections: Arc::new(Mutex::new(HashMap::new())) }
    }

    async fn connect(&self, authority: &str) -> Result<SendRequest<h3_quinn::OpenStreams, Bytes>, String> {
        let host = authority.split(':').next().unwrap_or(authority);
        let addr = authority
            .to_socket_addrs()
            .map_err(|e| e.to_string())?
            .next()
            .ok_or_else(|| "no address resolved".to_string())?;

        let connecting = self.endpoint.connect(addr, host).map_err(|e| e.to_string())?;
        let quinn_conn = tokio::time::timeout(Duration::from_secs(UPSTREAM_DIAL_TIMEOUT_SECS), connecting)
            .await
            .map_err(|_| "quic handshake timed out".to_string())?
            .map_err(|e| e.to_string())?;

        let (mut driver, send_request) =
            h3::client::new(h3_quinn::Connection::new(quinn_conn)).await.map_err(|e| e.to_string())?;
        tokio::spawn(async move {
            let _ = std::future::poll_fn(|cx| driver.poll_close(cx)).await;
        });
        Ok(send_request)
    }

    async fn get_or_connect(&self, authority: &str) -> Result<SendRequest<h3_quinn::OpenStreams, Bytes>, String> {
        let mut guard = self.connections.lock().await;
        if let Some(existing) = guard.get(authority) {
            return Ok(existing.clone());
        }
        let send_request = self.connect(authority).await?;
        guard.insert(authority.to_string(), send_request.clone());
        Ok(send_request)
    }

    pub async fn send(&self, req: Request<BoxBody>) -> Result<Response<BoxBody>, String> {
        let authority = req
            .uri()
            .authority()
            .map(|a| a.as_str().to_string())
            .ok_or_else(|| "h3 target missing authority".to_string())?;

        let mut send_request = self.get_or_connect(&authority).await?;

        let (parts, body) = req.into_parts();
        let body_bytes = http_body_util::BodyExt::collect(body)
            .await
            .map_err(|e| e.to_string())?
            .to_bytes();
        let out_req = Request::from_parts(parts, ());

        let mut stream = send_request.send_request(out_req).await.map_err(|e| e.to_string())?;
        if !body_bytes.is_empty() {
            stream.send_data(body_bytes).await.map_err(|e| e.to_string())?;
        }
        stream.finish().await.map_err(|e| e.to_string())?;

        let resp = stream.recv_response().await.map_err(|e| e.to_string())?;
        let mut collected = Vec::new();
        while let Some(mut chunk) = stream.recv_data().await.map_err(|e| e.to_string())? {
            let mut buf = vec![0u8; chunk.remaining()];
            chunk.copy_to_slice(&mut buf);
            collected.extend_from_slice(&buf);
        }

        let (parts, _) = resp.into_parts();
        let body = http_body_util::Full::from(Bytes::from(collected)).map_err(|never: std::convert::Infallible| match never {});
        Ok(Response::from_parts(parts, http_body_util::BodyExt::boxed(body)))
    }
}

impl Default for Http3Client {
    fn default() -> Self {
        Http3Client::new()
    }
}
