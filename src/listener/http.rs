//! Plain HTTP/1.1 (+ h2c) listener
//!
//! Accepts TCP connections, serves them with `hyper_util`'s auto-detecting
//! connection builder, and dispatches every request through the shared
//! routing state machine and proxy engine.

use std::net::SocketAddr;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use log::{debug, warn};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::common::Result;
use crate::proxy::BoxBody;
use crate::router::{self, RouteContext};
use crate::routing::RoutingTable;
use crate::state::App;

/// Parses a Go-style listen address (`":80"`, `"0.0.0.0:8080"`, `"[::]:443"`)
/// into a `SocketAddr`, defaulting a bare `:port` to all interfaces.
pub fn parse_listen(endpoint: &str) -> Result<SocketAddr> {
    let normalized = if let Some(port) = endpoint.strip_prefix(':') {
        format!("0.0.0.0:{port}")
    } else {
        endpoint.to_string()
    };
    normalized
        .parse::<SocketAddr>()
        .map_err(|e| crate::common::ProxyError::Config(format!("invalid listen address {endpoint}: {e}")))
}

/// Builds the `RouteContext` shared by every protocol's request dispatch.
pub fn route_context<'a>(req: &'a Request<Incoming>, is_secure: bool) -> RouteContext<'a> {
    RouteContext {
        host_header: req
            .headers()
            .get(http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(""),
        path: req.uri().path(),
        query: req.uri().query(),
        inbound_x_forwarded_proto: req
            .headers()
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok()),
        inbound_is_secure: is_secure,
        authorization: req
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok()),
        existing_x_forwarded_for: req
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok()),
    }
}

pub(crate) async fn dispatch_fn(
    app: Arc<App>,
    table: Arc<RoutingTable>,
    is_secure: bool,
    req: Request<Incoming>,
) -> Result<hyper::Response<BoxBody>, hyper::Error> {
    let ctx = route_context(&req, is_secure);
    let outcome = router::route(&table, &ctx);
    Ok(app.engine().respond(outcome, req).await)
}

/// Runs a plain HTTP listener on `addr` until `cancel` fires.
pub async fn run(addr: SocketAddr, app: Arc<App>, cancel: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    debug!("http listener bound to {addr}");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => { warn!("http accept error: {e}"); continue; }
                };
                let app = app.clone();
                let conn_cancel = cancel.clone();
                tokio::spawn(async move {
                    let table = app.views.http.load_full();
                    let io = TokioIo::new(stream);
                    let service = hyper::service::service_fn(move |req| {
                        dispatch_fn(app.clone(), table.clone(), false, req)
                    });
                    let conn = Builder::new(TokioExecutor::new()).serve_connection_with_upgrades(io, service);
                    tokio::select! {
                        result = conn => {
                            if let Err(e) = result {
                                debug!("http connection from {peer} ended: {e}");
                            }
                        }
                        _ = conn_cancel.cancelled() => {}
                    }
                });
            }
        }
    }
}
