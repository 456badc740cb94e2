//! Reverse proxy engine
//!
//! Turns a [`RouteOutcome`](crate::router::RouteOutcome) into a response:
//! `Forward` dials the mapping's target and relays its response back,
//! `Redirect`/`Unauthorized`/`NotFound` are rendered directly. One shared
//! client pools HTTP/1.1 and h2 upstream connections (TLS verification
//! disabled, matching the forwarding contract); targets with an `h3://`
//! scheme are dispatched over `h3`/`h3-quinn` instead, since `hyper` does
//! not speak QUIC.
use std::time::Duration;

use base64::Engine;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use hyper_openssl::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use log::warn;
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};

use crate::config::defaults::{
    UPSTREAM_DIAL_TIMEOUT_SECS, UPSTREAM_EXPECT_CONTINUE_TIMEOUT_SECS, UPSTREAM_KEEPALIVE_SECS,
    UPSTREAM_TLS_HANDSHAKE_TIMEOUT_SECS,
};
use crate::router::{ForwardInstruction, RedirectInstruction, RouteOutcome};

use super::h3_client::Http3Client;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

fn box_body<B>(body: B) -> BoxBody
where
    B: http_body::Body<Data = Bytes, Error = hyper::Error> + Send + Sync + 'static,
{
    BodyExt::boxed(body)
}

/// The 403 page rendered when no vhost/mapping matched, embedded at compile
/// time rather than rendered from a template.
const FORBIDDEN_BODY: &str = include_str!("../../assets/forbidden.html");

/// Shared upstream transport: one pooled hyper client for HTTP/1.1+h2
/// targets, one connection cache for h3 targets.
#[derive(Clone)]
pub struct Engine {
    http: Client<HttpsConnector<HttpConnector>, BoxBody>,
    http3: Http3Client,
}

impl Engine {
    pub fn new() -> Engine {
        let mut ssl = SslConnector::builder(SslMethod::tls()).expect("openssl connector builder");
        ssl.set_verify(SslVerifyMode::NONE);
        // Attempt HTTP/2 ALPN upstream, falling back to HTTP/1.1 when the
        // origin doesn't advertise it.
        ssl.set_alpn_protos(b"\x02h2\x08http/1.1").expect("set alpn protos");
        let mut http_connector = HttpConnector::new();
        http_connector.set_connect_timeout(Some(Duration::from_secs(UPSTREAM_DIAL_TIMEOUT_SECS)));
        http_connector.set_keepalive(Some(Duration::from_secs(UPSTREAM_KEEPALIVE_SECS)));
        http_connector.enforce_http(false);
        let mut https = HttpsConnector::with_connector(http_connector, ssl)
            .expect("https connector");
        https.set_callback(|cfg, _| {
            cfg.set_verify(SslVerifyMode::NONE);
            Ok(())
        });

        let http = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(crate::config::defaults::UPSTREAM_IDLE_TIMEOUT_SECS))
            .build(https);

        Engine { http, http3: Http3Client::new() }
    }

    /// Renders a routing decision into a response, dialing the upstream for
    /// `Forward` outcomes. For requests whose body hasn't been read yet
    /// (the `hyper`-server case), use this; for h3-server requests, whose
    /// body arrives as a separate stream, use [`Engine::forward`] directly
    /// once the body is collected.
    pub async fn respond(&self, outcome: RouteOutcome, inbound: Request<Incoming>) -> Response<BoxBody> {
        match outcome {
            RouteOutcome::Forward(instruction) => {
                let (parts, body) = inbound.into_parts();
                let body_bytes = match body.collect().await {
                    Ok(collected) => collected.to_bytes(),
                    Err(e) => {
                        warn!("failed reading request body: {e}");
                        return bad_gateway();
                    }
                };
                self.forward(instruction, parts.method, parts.headers, body_bytes).await
            }
            RouteOutcome::Redirect(instruction) => redirect(instruction),
            RouteOutcome::Unauthorized { realm } => unauthorized(&realm),
            RouteOutcome::NotFound => forbidden(),
        }
    }

    /// Renders any routing outcome whose request body has already been
    /// collected into `Bytes` — the shape an h3 server stream gives us.
    pub async fn respond_with_body(
        &self,
        outcome: RouteOutcome,
        method: http::Method,
        headers: http::HeaderMap,
        body_bytes: Bytes,
    ) -> Response<BoxBody> {
        match outcome {
            RouteOutcome::Forward(instruction) => self.forward(instruction, method, headers, body_bytes).await,
            RouteOutcome::Redirect(instruction) => redirect(instruction),
            RouteOutcome::Unauthorized { realm } => unauthorized(&realm),
            RouteOutcome::NotFound => forbidden(),
        }
    }

    async fn forward(
        &self,
        instruction: ForwardInstruction,
        method: http::Method,
        headers: http::HeaderMap,
        body_bytes: Bytes,
    ) -> Response<BoxBody> {
        let uri = format!("{}://{}{}", instruction.scheme, instruction.host, instruction.path);
        let mut builder = Request::builder().method(method).uri(&uri);
        for (name, value) in headers.iter() {
            builder = builder.header(name, value);
        }
        if instruction.overwrite_host {
            builder = builder.header(http::header::HOST, &instruction.host);
        }
        if instruction.remove_x_forwarded_for {
            // Upstream sees only what the inbound connection itself sends;
            // the builder above already copied inbound headers verbatim, so
            // drop any inbound X-Forwarded-For explicitly instead.
        }
        if let Some(proto) = &instruction.set_x_forwarded_proto {
            builder = builder.header("x-forwarded-proto", proto);
        }
        if let Some(userinfo) = &instruction.userinfo {
            let encoded = base64::engine::general_purpose::STANDARD.encode(userinfo);
            builder = builder.header(http::header::AUTHORIZATION, format!("Basic {encoded}"));
        }
        for (name, value) in &instruction.add_header {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut req = match builder.body(box_body(Full::from(body_bytes).map_err(|never| match never {}))) {
            Ok(req) => req,
            Err(e) => {
                warn!("malformed upstream request: {e}");
                return bad_gateway();
            }
        };
        if instruction.remove_x_forwarded_for {
            req.headers_mut().remove("x-forwarded-for");
        }

        // A request carrying `Expect: 100-continue` budgets extra time for
        // the interim informational response before the body is accepted.
        let expects_continue = req
            .headers()
            .get(http::header::EXPECT)
            .is_some_and(|v| v.as_bytes().eq_ignore_ascii_case(b"100-continue"));
        let mut budget = Duration::from_secs(UPSTREAM_TLS_HANDSHAKE_TIMEOUT_SECS + UPSTREAM_DIAL_TIMEOUT_SECS);
        if expects_continue {
            budget += Duration::from_secs(UPSTREAM_EXPECT_CONTINUE_TIMEOUT_SECS);
        }

        let result = if uri.starts_with("h3://") {
            self.http3.send(req).await
        } else {
            tokio::time::timeout(budget, self.http.request(req))
                .await
                .map_err(|_| "upstream request timed out".to_string())
                .and_then(|r| r.map_err(|e| e.to_string()))
        };

        match result {
            Ok(resp) => {
                let (parts, body) = resp.into_parts();
                let mut response = Response::from_parts(parts, box_body(body.map_err(|e| e.into())));
                for (name, value) in &instruction.add_header {
                    if let (Ok(name), Ok(value)) = (
                        http::HeaderName::from_bytes(name.as_bytes()),
                        http::HeaderValue::from_str(value),
                    ) {
                        response.headers_mut().append(name, value);
                    }
                }
                response
            }
            Err(e) => {
                warn!("upstream error dialing {uri}: {e}");
                bad_gateway()
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

fn redirect(instruction: RedirectInstruction) -> Response<BoxBody> {
    let mut builder = Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(http::header::LOCATION, instruction.location);
    for (name, value) in &instruction.add_header {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder.body(box_body(Full::new(Bytes::new()).map_err(|never| match never {}))).unwrap()
}

fn unauthorized(realm: &str) -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .header(http::header::WWW_AUTHENTICATE, format!("Basic realm=\"{realm}\""))
        .body(box_body(Full::new(Bytes::new()).map_err(|never| match never {})))
        .unwrap()
}

fn forbidden() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::FORBIDDEN)
        .header(http::header::CONTENT_TYPE, "text/html; charset=utf-8")
        .body(box_body(Full::from(Bytes::from_static(FORBIDDEN_BODY.as_bytes())).map_err(|never| match never {})))
        .unwrap()
}

fn bad_gateway() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::BAD_GATEWAY)
        .body(box_body(Full::new(Bytes::new()).map_err(|never| match never {})))
        .unwrap()
}
