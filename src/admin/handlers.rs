//! Management API request handlers
//!
//! Thin axum handlers that translate each endpoint into a read/modify/write
//! cycle on `App`'s in-memory config, per spec's CRUD table: api config,
//! vhost listen set, http/https/http3 config, http/https/http3 vhosts keyed
//! by domain, certs keyed by name.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crate::cert::CertStore;
use crate::config::{ApiConfig, CertConfig, CertInfo, Config, HttpSectionConfig, Protocol, VhostConfig};
use crate::state::App;

use super::error::{AdminError, AdminResult};
use super::types::{ApiResponse, VhostListenDto};

pub async fn reload(State(app): State<Arc<App>>) -> AdminResult<Json<ApiResponse<()>>> {
    app.reload().await?;
    Ok(Json(ApiResponse::ok_empty()))
}

pub async fn save(State(app): State<Arc<App>>) -> AdminResult<Json<ApiResponse<()>>> {
    app.save().await?;
    Ok(Json(ApiResponse::ok_empty()))
}

pub async fn get_vhost_listen(State(app): State<Arc<App>>) -> Json<ApiResponse<VhostListenDto>> {
    let cfg = app.snapshot().await;
    Json(ApiResponse::ok(VhostListenDto {
        http: cfg.http.as_ref().map(|s| s.listen.clone()).unwrap_or_default(),
        https: cfg.https.as_ref().map(|s| s.listen.clone()).unwrap_or_default(),
        http3: cfg.http3.as_ref().map(|s| s.listen.clone()).unwrap_or_default(),
    }))
}

pub async fn set_vhost_listen(
    State(app): State<Arc<App>>,
    Json(body): Json<VhostListenDto>,
) -> AdminResult<Json<ApiResponse<()>>> {
    app.mutate(|cfg| {
        section_mut_or_insert(cfg, Protocol::Http).listen = body.http;
        section_mut_or_insert(cfg, Protocol::Https).listen = body.https;
        section_mut_or_insert(cfg, Protocol::Http3).listen = body.http3;
    })
    .await?;
    Ok(Json(ApiResponse::ok_empty()))
}

pub async fn get_api_config(State(app): State<Arc<App>>) -> Json<ApiResponse<ApiConfig>> {
    let cfg = app.snapshot().await;
    Json(ApiResponse::ok(cfg.api.unwrap_or_default()))
}

pub async fn set_api_config(
    State(app): State<Arc<App>>,
    Json(body): Json<ApiConfig>,
) -> AdminResult<Json<ApiResponse<()>>> {
    app.mutate(|cfg| cfg.api = Some(body)).await?;
    Ok(Json(ApiResponse::ok_empty()))
}

fn section_mut_or_insert(cfg: &mut Config, protocol: Protocol) -> &mut HttpSectionConfig {
    cfg.section_mut(protocol).get_or_insert_with(HttpSectionConfig::default)
}

/// Each of `http`/`https`/`http3` gets its own literal route
/// (`/http-config`, `/https-vhost/`, ...) rather than one route with a
/// `{protocol}` path parameter, since a path segment can't mix a capture
/// with adjoining literal text. These thin per-protocol handlers just
/// plug in the `Protocol` the route name implies.
pub async fn get_http_config(state: State<Arc<App>>) -> Json<ApiResponse<HttpSectionConfig>> {
    get_section(state, Protocol::Http).await
}
pub async fn get_https_config(state: State<Arc<App>>) -> Json<ApiResponse<HttpSectionConfig>> {
    get_section(state, Protocol::Https).await
}
pub async fn get_http3_config(state: State<Arc<App>>) -> Json<ApiResponse<HttpSectionConfig>> {
    get_section(state, Protocol::Http3).await
}

async fn get_section(State(app): State<Arc<App>>, protocol: Protocol) -> Json<ApiResponse<HttpSectionConfig>> {
    let cfg = app.snapshot().await;
    Json(ApiResponse::ok(cfg.section(protocol).cloned().unwrap_or_default()))
}

pub async fn list_http_vhosts(state: State<Arc<App>>) -> Json<ApiResponse<Vec<VhostConfig>>> {
    list_vhosts(state, Protocol::Http).await
}
pub async fn list_https_vhosts(state: State<Arc<App>>) -> Json<ApiResponse<Vec<VhostConfig>>> {
    list_vhosts(state, Protocol::Https).await
}
pub async fn list_http3_vhosts(state: State<Arc<App>>) -> Json<ApiResponse<Vec<VhostConfig>>> {
    list_vhosts(state, Protocol::Http3).await
}

async fn list_vhosts(State(app): State<Arc<App>>, protocol: Protocol) -> Json<ApiResponse<Vec<VhostConfig>>> {
    let cfg = app.snapshot().await;
    Json(ApiResponse::ok(cfg.section(protocol).map(|s| s.vhost.clone()).unwrap_or_default()))
}

pub async fn get_http_vhost(state: State<Arc<App>>, domain: Path<String>) -> AdminResult<Json<ApiResponse<VhostConfig>>> {
    get_vhost(state, domain, Protocol::Http).await
}
pub async fn get_https_vhost(state: State<Arc<App>>, domain: Path<String>) -> AdminResult<Json<ApiResponse<VhostConfig>>> {
    get_vhost(state, domain, Protocol::Https).await
}
pub async fn get_http3_vhost(state: State<Arc<App>>, domain: Path<String>) -> AdminResult<Json<ApiResponse<VhostConfig>>> {
    get_vhost(state, domain, Protocol::Http3).await
}

async fn get_vhost(
    State(app): State<Arc<App>>,
    Path(domain): Path<String>,
    protocol: Protocol,
) -> AdminResult<Json<ApiResponse<VhostConfig>>> {
    let cfg = app.snapshot().await;
    let vhost = cfg
        .section(protocol)
        .and_then(|s| s.vhost_by_domain(&domain))
        .cloned()
        .ok_or_else(|| AdminError::NotFound(format!("vhost {domain}")))?;
    Ok(Json(ApiResponse::ok(vhost)))
}

pub async fn add_http_vhost(state: State<Arc<App>>, body: Json<VhostConfig>) -> AdminResult<Json<ApiResponse<()>>> {
    add_vhost(state, body, Protocol::Http).await
}
pub async fn add_https_vhost(state: State<Arc<App>>, body: Json<VhostConfig>) -> AdminResult<Json<ApiResponse<()>>> {
    add_vhost(state, body, Protocol::Https).await
}
pub async fn add_http3_vhost(state: State<Arc<App>>, body: Json<VhostConfig>) -> AdminResult<Json<ApiResponse<()>>> {
    add_vhost(state, body, Protocol::Http3).await
}

async fn add_vhost(
    State(app): State<Arc<App>>,
    Json(body): Json<VhostConfig>,
    protocol: Protocol,
) -> AdminResult<Json<ApiResponse<()>>> {
    app.mutate(|cfg| section_mut_or_insert(cfg, protocol).vhost.push(body)).await?;
    Ok(Json(ApiResponse::ok_empty()))
}

pub async fn mod_http_vhost(state: State<Arc<App>>, body: Json<VhostConfig>) -> AdminResult<Json<ApiResponse<()>>> {
    mod_vhost(state, body, Protocol::Http).await
}
pub async fn mod_https_vhost(state: State<Arc<App>>, body: Json<VhostConfig>) -> AdminResult<Json<ApiResponse<()>>> {
    mod_vhost(state, body, Protocol::Https).await
}
pub async fn mod_http3_vhost(state: State<Arc<App>>, body: Json<VhostConfig>) -> AdminResult<Json<ApiResponse<()>>> {
    mod_vhost(state, body, Protocol::Http3).await
}

async fn mod_vhost(
    State(app): State<Arc<App>>,
    Json(body): Json<VhostConfig>,
    protocol: Protocol,
) -> AdminResult<Json<ApiResponse<()>>> {
    let domain = body.domain.clone();
    app.mutate(|cfg| {
        let section = section_mut_or_insert(cfg, protocol);
        if let Some(existing) = section.vhost.iter_mut().find(|v| v.domain.eq_ignore_ascii_case(&domain)) {
            *existing = body;
        } else {
            section.vhost.push(body);
        }
    })
    .await?;
    Ok(Json(ApiResponse::ok_empty()))
}

pub async fn del_http_vhost(state: State<Arc<App>>, domain: Path<String>) -> AdminResult<Json<ApiResponse<()>>> {
    del_vhost(state, domain, Protocol::Http).await
}
pub async fn del_https_vhost(state: State<Arc<App>>, domain: Path<String>) -> AdminResult<Json<ApiResponse<()>>> {
    del_vhost(state, domain, Protocol::Https).await
}
pub async fn del_http3_vhost(state: State<Arc<App>>, domain: Path<String>) -> AdminResult<Json<ApiResponse<()>>> {
    del_vhost(state, domain, Protocol::Http3).await
}

async fn del_vhost(
    State(app): State<Arc<App>>,
    Path(domain): Path<String>,
    protocol: Protocol,
) -> AdminResult<Json<ApiResponse<()>>> {
    app.mutate(|cfg| {
        if let Some(section) = cfg.section_mut(protocol) {
            section.vhost.retain(|v| !v.domain.eq_ignore_ascii_case(&domain));
        }
    })
    .await?;
    Ok(Json(ApiResponse::ok_empty()))
}

pub async fn list_certs(State(app): State<Arc<App>>) -> Json<ApiResponse<Vec<CertInfo>>> {
    let store = app.cert_store();
    Json(ApiResponse::ok(store.iter().map(|c| c.info.clone()).collect()))
}

pub async fn get_cert(
    State(app): State<Arc<App>>,
    Path(name): Path<String>,
) -> AdminResult<Json<ApiResponse<CertInfo>>> {
    let store = app.cert_store();
    let cert = store.get(&name).ok_or_else(|| AdminError::NotFound(format!("cert {name}")))?;
    Ok(Json(ApiResponse::ok(cert.info.clone())))
}

pub async fn add_cert(
    State(app): State<Arc<App>>,
    Json(body): Json<CertConfig>,
) -> AdminResult<Json<ApiResponse<()>>> {
    app.mutate(|cfg| cfg.cert.push(body)).await?;
    Ok(Json(ApiResponse::ok_empty()))
}

pub async fn mod_cert(
    State(app): State<Arc<App>>,
    Json(body): Json<CertConfig>,
) -> AdminResult<Json<ApiResponse<()>>> {
    let name = body.name.clone();
    app.mutate(|cfg| {
        if let Some(existing) = cfg.cert.iter_mut().find(|c| c.name == name) {
            *existing = body;
        } else {
            cfg.cert.push(body);
        }
    })
    .await?;
    Ok(Json(ApiResponse::ok_empty()))
}

pub async fn del_cert(State(app): State<Arc<App>>, Path(name): Path<String>) -> AdminResult<Json<ApiResponse<()>>> {
    let cfg = app.snapshot().await;
    if cert_in_use(&cfg, &name) {
        return Err(AdminError::CertInUse);
    }
    app.mutate(|cfg| cfg.cert.retain(|c| c.name != name)).await?;
    Ok(Json(ApiResponse::ok_empty()))
}

fn cert_in_use(cfg: &Config, name: &str) -> bool {
    [&cfg.https, &cfg.http3]
        .into_iter()
        .flatten()
        .any(|section| section.vhost.iter().any(|v| v.cert.as_deref() == Some(name)))
}

pub async fn health(State(app): State<Arc<App>>) -> Json<ApiResponse<&'static str>> {
    let _: std::sync::Arc<CertStore> = app.cert_store();
    Json(ApiResponse::ok("ok"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MappingConfig;

    fn cfg_with_https_cert(name: &str) -> Config {
        Config {
            https: Some(HttpSectionConfig {
                listen: vec![":443".into()],
                vhost: vec![VhostConfig {
                    name: "a".into(),
                    domain: "a.example".into(),
                    mapping: vec![MappingConfig { path: "/".into(), target: "http://u:9".into(), ..Default::default() }],
                    cert: Some(name.into()),
                }],
            }),
            ..Default::default()
        }
    }

    #[test]
    fn cert_in_use_detects_https_reference() {
        assert!(cert_in_use(&cfg_with_https_cert("a"), "a"));
        assert!(!cert_in_use(&cfg_with_https_cert("a"), "b"));
    }
}
