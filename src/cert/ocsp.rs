//! Background OCSP-stapling refresher
//!
//! A cooperative task wakes every minute, decides which certs need a fresh
//! staple, fetches them with bounded concurrency, and installs whichever
//! responses come back `Good`. Failures are silent and retried next tick.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use http_body_util::{BodyExt, Empty};
use bytes::Bytes;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use log::{debug, warn};
use openssl::hash::MessageDigest;
use openssl::ocsp::{OcspCertId, OcspRequest, OcspResponse};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::defaults::{
    OCSP_MAX_CONCURRENCY, OCSP_REFRESH_INTERVAL_SECS, OCSP_REQUEST_TIMEOUT_SECS,
    OCSP_STALE_WINDOW_SECS,
};

use super::store::CertStore;
use super::types::ParsedCert;
use crate::state::App;

/// Runs the stapler loop until `cancel` fires. Intended to be spawned as one
/// long-lived task per `App`. Re-reads `app.views.cert_store` every tick so
/// certs added or changed via the admin API + `/reload` get picked up
/// without restarting the task.
pub async fn run(app: Arc<App>, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(Duration::from_secs(OCSP_REFRESH_INTERVAL_SECS));
    let client: Client<HttpConnector, Empty<Bytes>> =
        Client::builder(TokioExecutor::new()).build(HttpConnector::new());

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                let store = app.views.cert_store.load_full();
                refresh_due_certs(&store, &client).await;
            }
        }
    }
}

async fn refresh_due_certs(store: &CertStore, client: &Client<HttpConnector, Empty<Bytes>>) {
    let due: Vec<Arc<ParsedCert>> = store.iter().filter(|c| needs_refresh(c)).cloned().collect();
    if due.is_empty() {
        return;
    }

    let semaphore = Arc::new(Semaphore::new(OCSP_MAX_CONCURRENCY));
    let mut tasks = Vec::with_capacity(due.len());
    for cert in due {
        let semaphore = semaphore.clone();
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            refresh_one(&cert, &client).await;
        }));
    }
    for task in tasks {
        let _ = task.await;
    }
}

fn needs_refresh(cert: &ParsedCert) -> bool {
    if cert.chain_len() < 2 || cert.ocsp_responders.is_empty() {
        return false;
    }
    let Some(issuer) = cert.issuer() else { return false };

    match cert.current_staple() {
        None => true,
        Some(der) => match parse_staple(&der, cert, issuer) {
            None => true,
            Some((status_good, next_update_secs)) => {
                !status_good || next_update_secs < OCSP_STALE_WINDOW_SECS
            }
        },
    }
}

/// Returns `(status_is_good, seconds_until_next_update)` if the staple
/// parses against the issuer, `None` otherwise.
fn parse_staple(der: &[u8], cert: &ParsedCert, issuer: &openssl::x509::X509) -> Option<(bool, i64)> {
    let response = OcspResponse::from_der(der).ok()?;
    let basic = response.basic().ok()?;
    let cert_id = OcspCertId::from_cert(MessageDigest::sha1(), &cert.leaf, issuer).ok()?;
    let status = basic.find_status(&cert_id)?;
    let now = openssl::asn1::Asn1Time::days_from_now(0).ok()?;
    let next_update_secs = status
        .next_update
        .map(|t| diff_seconds(&now, t))
        .unwrap_or(i64::MAX);
    let is_good = status.status == openssl::ocsp::OcspCertStatus::GOOD;
    Some((is_good, next_update_secs))
}

fn diff_seconds(from: &openssl::asn1::Asn1TimeRef, to: &openssl::asn1::Asn1TimeRef) -> i64 {
    from.diff(to).map(|d| d.days as i64 * 86400 + d.secs as i64).unwrap_or(0)
}

async fn refresh_one(cert: &ParsedCert, client: &Client<HttpConnector, Empty<Bytes>>) {
    let Some(issuer) = cert.issuer() else { return };
    let Some(responder) = cert.ocsp_responders.first() else { return };

    let der = match build_request(cert, issuer) {
        Ok(der) => der,
        Err(e) => {
            debug!("ocsp request build failed for {}: {}", cert.name, e);
            return;
        }
    };
    let encoded = base64::engine::general_purpose::STANDARD.encode(&der);
    let uri = format!("{}/{}", responder.trim_end_matches('/'), encoded);

    let request = match hyper::Request::get(uri.as_str())
        .header("Content-Language", "application/ocsp-request")
        .header("Accept", "application/ocsp-response")
        .body(Empty::<Bytes>::new())
    {
        Ok(req) => req,
        Err(e) => {
            warn!("ocsp request malformed for {}: {}", cert.name, e);
            return;
        }
    };

    let result = tokio::time::timeout(
        Duration::from_secs(OCSP_REQUEST_TIMEOUT_SECS),
        client.request(request),
    )
    .await;

    let response = match result {
        Ok(Ok(resp)) => resp,
        Ok(Err(e)) => {
            debug!("ocsp request failed for {}: {}", cert.name, e);
            return;
        }
        Err(_) => {
            debug!("ocsp request timed out for {}", cert.name);
            return;
        }
    };

    let body = match response.into_body().collect().await {
        Ok(body) => body.to_bytes(),
        Err(e) => {
            debug!("ocsp response body read failed for {}: {}", cert.name, e);
            return;
        }
    };

    let Ok(parsed) = OcspResponse::from_der(&body) else { return };
    let Ok(basic) = parsed.basic() else { return };
    let Ok(cert_id) = OcspCertId::from_cert(MessageDigest::sha1(), &cert.leaf, issuer) else { return };
    let Some(status) = basic.find_status(&cert_id) else { return };

    if status.status == openssl::ocsp::OcspCertStatus::GOOD {
        cert.set_staple(body.to_vec());
        debug!("installed refreshed OCSP staple for {}", cert.name);
    }
}

fn build_request(
    cert: &ParsedCert,
    issuer: &openssl::x509::X509,
) -> Result<Vec<u8>, openssl::error::ErrorStack> {
    let cert_id = OcspCertId::from_cert(MessageDigest::sha1(), &cert.leaf, issuer)?;
    let mut request = OcspRequest::new()?;
    request.add_id(cert_id)?;
    request.to_der()
}
