//! TLS-terminating HTTP listener
//!
//! Wraps accepted sockets in an OpenSSL server stream, selecting the
//! certificate to present via SNI (`servername_callback`) against the
//! installed [`CertIndex`](crate::cert::CertIndex), then serves HTTP/1.1+h2
//! the same way the plain listener does.

use std::net::SocketAddr;
use std::sync::Arc;

use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use log::{debug, warn};
use openssl::ssl::{NameType, Ssl, SslAcceptor, SslContext, SslMethod, SslRef};
use tokio::net::TcpListener;
use tokio_openssl::SslStream;
use tokio_util::sync::CancellationToken;

use crate::cert::CertIndex;
use crate::common::Result;
use crate::state::App;

use super::http::dispatch_fn;

/// Builds a base `SslAcceptor` whose only job is to run the SNI callback;
/// the callback swaps in the right leaf cert/key/chain per connection via
/// `SslRef::set_ssl_context`, so no certificate is configured here.
fn build_acceptor(app: Arc<App>, cert_index_of: fn(&App) -> Arc<CertIndex>) -> Result<SslAcceptor> {
    let mut builder = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls())?;
    builder.set_servername_callback(move |ssl: &mut SslRef, _alert| {
        let Some(sni) = ssl.servername(NameType::HOST_NAME) else {
            return Ok(());
        };
        let index = cert_index_of(&app);
        let Some(cert) = index.get_for_sni(sni) else {
            return Ok(());
        };
        let mut ctx_builder = match SslContext::builder(SslMethod::tls()) {
            Ok(b) => b,
            Err(_) => return Err(openssl::ssl::SniError::ALERT_FATAL),
        };
        if ctx_builder.set_certificate(&cert.leaf).is_err() {
            return Err(openssl::ssl::SniError::ALERT_FATAL);
        }
        for issuer in &cert.chain {
            let _ = ctx_builder.add_extra_chain_cert(issuer.clone());
        }
        if ctx_builder.set_private_key(&cert.key).is_err() {
            return Err(openssl::ssl::SniError::ALERT_FATAL);
        }
        if let Some(staple) = cert.current_staple() {
            let _ = ssl.set_ocsp_status(&staple);
        }
        let ctx = ctx_builder.build();
        if ssl.set_ssl_context(&ctx).is_err() {
            return Err(openssl::ssl::SniError::ALERT_FATAL);
        }
        Ok(())
    });
    builder.set_alpn_select_callback(|_ssl, protos| {
        openssl::ssl::select_next_proto(b"\x02h2\x08http/1.1", protos).ok_or(openssl::ssl::AlpnError::NOACK)
    });
    Ok(builder.build())
}

/// Runs a TLS-terminating HTTP listener on `addr` until `cancel` fires.
pub async fn run(addr: SocketAddr, app: Arc<App>, cancel: CancellationToken) -> Result<()> {
    let acceptor = Arc::new(build_acceptor(app.clone(), |app| app.views.https_certs.load_full())?);
    let listener = TcpListener::bind(addr).await?;
    debug!("https listener bound to {addr}");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => { warn!("https accept error: {e}"); continue; }
                };
                let app = app.clone();
                let acceptor = acceptor.clone();
                let conn_cancel = cancel.clone();
                tokio::spawn(async move {
                    let ssl = match Ssl::new(acceptor.context()) {
                        Ok(ssl) => ssl,
                        Err(e) => { warn!("ssl session setup failed for {peer}: {e}"); return; }
                    };
                    let mut tls_stream = match SslStream::new(ssl, stream) {
                        Ok(s) => s,
                        Err(e) => { warn!("tls stream setup failed for {peer}: {e}"); return; }
                    };
                    if let Err(e) = std::pin::Pin::new(&mut tls_stream).accept().await {
                        debug!("tls handshake failed for {peer}: {e}");
                        return;
                    }

                    let table = app.views.https.load_full();
                    let io = TokioIo::new(tls_stream);
                    let service = hyper::service::service_fn(move |req| {
                        dispatch_fn(app.clone(), table.clone(), true, req)
                    });
                    let conn = Builder::new(TokioExecutor::new()).serve_connection_with_upgrades(io, service);
                    tokio::select! {
                        result = conn => {
                            if let Err(e) = result {
                                debug!("https connection from {peer} ended: {e}");
                            }
                        }
                        _ = conn_cancel.cancelled() => {}
                    }
                });
            }
        }
    }
}
