//! HTTP/3 (QUIC) listener
//!
//! A `quinn::Endpoint` terminates QUIC and ALPN-negotiates h3; the server
//! side of the `h3` crate turns each QUIC stream into a request, dispatched
//! through the same routing state machine as the other two listeners.
//! Certificate selection reuses the openssl-parsed material from the
//! certificate store, re-encoded into a `rustls::sign::CertifiedKey` per
//! connection since `rustls` (not `openssl`) drives the QUIC TLS stack.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use h3_quinn::quinn;
use log::debug;
use tokio_util::sync::CancellationToken;

use crate::cert::CertIndex;
use crate::common::{ProxyError, Result};
use crate::router;
use crate::state::App;

/// Resolves the certificate registered for `server_name` and converts it
/// into the DER form `rustls` needs, deferring ALPN/SNI selection to the
/// `rustls::server::ResolvesServerCert` trait.
struct CertResolver {
    app: Arc<App>,
}

impl std::fmt::Debug for CertResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertResolver").finish()
    }
}

impl rustls::server::ResolvesServerCert for CertResolver {
    fn resolve(&self, client_hello: rustls::server::ClientHello) -> Option<Arc<rustls::sign::CertifiedKey>> {
        let sni = client_hello.server_name()?;
        let index: Arc<CertIndex> = self.app.views.http3_certs.load_full();
        let cert = index.get_for_sni(sni)?;

        let mut chain = vec![rustls::pki_types::CertificateDer::from(cert.leaf.to_der().ok()?)];
        for issuer in &cert.chain {
            chain.push(rustls::pki_types::CertificateDer::from(issuer.to_der().ok()?));
        }
        let key_der = cert.key.private_key_to_der().ok()?;
        let signing_key = rustls::crypto::ring::sign::any_supported_type(
            &rustls::pki_types::PrivateKeyDer::Pkcs8(key_der.into()),
        )
        .ok()?;
        Some(Arc::new(rustls::sign::CertifiedKey::new(chain, signing_key)))
    }
}

fn build_quic_server_config(app: Arc<App>) -> Result<quinn::ServerConfig> {
    let mut tls_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_cert_resolver(Arc::new(CertResolver { app }));
    tls_config.alpn_protocols = vec![b"h3".to_vec()];

    let quic_crypto = quinn::crypto::rustls::QuicServerConfig::try_from(tls_config)
        .map_err(|e| ProxyError::TlsHandshake(e.to_string()))?;
    Ok(quinn::ServerConfig::with_crypto(Arc::new(quic_crypto)))
}

/// Runs an HTTP/3 listener on `addr` until `cancel` fires.
pub async fn run(addr: SocketAddr, app: Arc<App>, cancel: CancellationToken) -> Result<()> {
    let server_config = build_quic_server_config(app.clone())?;
    let endpoint = quinn::Endpoint::server(server_config, addr)?;
    debug!("http3 listener bound to {addr}");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                endpoint.close(0u32.into(), b"shutdown");
                return Ok(());
            }
            incoming = endpoint.accept() => {
                let Some(incoming) = incoming else { return Ok(()) };
                let app = app.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(app, incoming).await {
                        debug!("http3 connection ended: {e}");
                    }
                });
            }
        }
    }
}

async fn handle_connection(app: Arc<App>, incoming: quinn::Incoming) -> Result<()> {
    let connection = incoming.await.map_err(|e| ProxyError::TlsHandshake(e.to_string()))?;
    let mut h3_conn = h3::server::Connection::<_, Bytes>::new(h3_quinn::Connection::new(connection))
        .await
        .map_err(|e| ProxyError::Network(e.to_string()))?;

    loop {
        match h3_conn.accept().await {
            Ok(Some((req, mut stream))) => {
                let app = app.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_request(app, req, &mut stream).await {
                        debug!("http3 request failed: {e}");
                    }
                });
            }
            Ok(None) => return Ok(()),
            Err(e) => return Err(ProxyError::Network(e.to_string())),
        }
    }
}

async fn handle_request<T>(
    app: Arc<App>,
    req: http::Request<()>,
    stream: &mut h3::server::RequestStream<T, Bytes>,
) -> Result<()>
where
    T: h3::quic::BidiStream<Bytes>,
{
    let table = app.views.http3.load_full();
    let ctx = route_context_from_h3(&req);
    let outcome = router::route(&table, &ctx);

    let mut body = Vec::new();
    while let Some(mut chunk) = stream.recv_data().await.map_err(|e| ProxyError::Network(e.to_string()))? {
        let mut buf = vec![0u8; bytes::Buf::remaining(&chunk)];
        bytes::Buf::copy_to_slice(&mut chunk, &mut buf);
        body.extend_from_slice(&buf);
    }

    let (parts, _) = req.into_parts();
    let response = app
        .engine()
        .respond_with_body(outcome, parts.method, parts.headers, Bytes::from(body))
        .await;
    let (resp_parts, resp_body) = response.into_parts();
    let resp = http::Response::from_parts(resp_parts, ());
    stream.send_response(resp).await.map_err(|e| ProxyError::Network(e.to_string()))?;

    let body_bytes = http_body_util::BodyExt::collect(resp_body)
        .await
        .map_err(|e| ProxyError::Network(e.to_string()))?
        .to_bytes();
    if !body_bytes.is_empty() {
        stream.send_data(body_bytes).await.map_err(|e| ProxyError::Network(e.to_string()))?;
    }
    stream.finish().await.map_err(|e| ProxyError::Network(e.to_string()))?;
    Ok(())
}

fn route_context_from_h3<T>(req: &http::Request<T>) -> router::RouteContext<'_> {
    router::RouteContext {
        host_header: req.headers().get(http::header::HOST).and_then(|v| v.to_str().ok()).unwrap_or(""),
        path: req.uri().path(),
        query: req.uri().query(),
        inbound_x_forwarded_proto: req.headers().get("x-forwarded-proto").and_then(|v| v.to_str().ok()),
        inbound_is_secure: true,
        authorization: req.headers().get(http::header::AUTHORIZATION).and_then(|v| v.to_str().ok()),
        existing_x_forwarded_for: req.headers().get("x-forwarded-for").and_then(|v| v.to_str().ok()),
    }
}
