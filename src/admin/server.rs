//! Management API HTTP server
//!
//! Wires every endpoint from the CRUD table onto an axum `Router`, gated by
//! the single-credential Basic auth middleware, and serves it with
//! `axum::serve` until the listener's cancellation token fires.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{delete, get, patch, post};
use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use crate::common::Result;
use crate::state::App;

use super::auth::auth_middleware;
use super::handlers;

fn build_router(app: Arc<App>) -> Router {
    let protected = Router::new()
        .route("/reload", get(handlers::reload))
        .route("/save", get(handlers::save).post(handlers::save))
        .route("/vhost-listen", get(handlers::get_vhost_listen).post(handlers::set_vhost_listen))
        .route("/api-config", get(handlers::get_api_config).post(handlers::set_api_config))
        .route("/http-config", get(handlers::get_http_config))
        .route("/https-config", get(handlers::get_https_config))
        .route("/http3-config", get(handlers::get_http3_config))
        .route(
            "/http-vhost/",
            get(handlers::list_http_vhosts).post(handlers::add_http_vhost).patch(handlers::mod_http_vhost),
        )
        .route("/http-vhost/:domain", get(handlers::get_http_vhost).delete(handlers::del_http_vhost))
        .route(
            "/https-vhost/",
            get(handlers::list_https_vhosts).post(handlers::add_https_vhost).patch(handlers::mod_https_vhost),
        )
        .route("/https-vhost/:domain", get(handlers::get_https_vhost).delete(handlers::del_https_vhost))
        .route(
            "/http3-vhost/",
            get(handlers::list_http3_vhosts).post(handlers::add_http3_vhost).patch(handlers::mod_http3_vhost),
        )
        .route("/http3-vhost/:domain", get(handlers::get_http3_vhost).delete(handlers::del_http3_vhost))
        .route(
            "/cert/",
            get(handlers::list_certs).post(handlers::add_cert).patch(handlers::mod_cert),
        )
        .route("/cert/:name", get(handlers::get_cert).delete(handlers::del_cert))
        .layer(middleware::from_fn_with_state(app.clone(), auth_middleware));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1", protected)
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

/// Runs the management API on `addr` until `cancel` fires.
pub async fn run(addr: SocketAddr, app: Arc<App>, cancel: tokio_util::sync::CancellationToken) -> Result<()> {
    let router = build_router(app);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("admin api listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}
