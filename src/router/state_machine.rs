//! Per-request routing state machine
//!
//! `RESOLVE_HOST → RESOLVE_MAPPING → {AUTH?} → DECIDE → {REWRITE|REDIRECT|FAIL}`,
//! expressed as a pure function so the HTTP and HTTP/3 handlers share
//! identical behavior.

use crate::config::defaults::DEFAULT_REALM;
use crate::routing::{host_key, RoutingTable};

/// Snapshot of the inbound request the state machine needs. Built once per
/// request at `RESOLVE_HOST` time from a routing-table snapshot; never
/// re-read mid-request.
pub struct RouteContext<'a> {
    pub host_header: &'a str,
    pub path: &'a str,
    pub query: Option<&'a str>,
    /// Value of the inbound `X-Forwarded-Proto` header, if any, verbatim.
    pub inbound_x_forwarded_proto: Option<&'a str>,
    /// Whether the connection the request arrived on was TLS- or
    /// QUIC-terminated (https/http3 listeners set this `true`).
    pub inbound_is_secure: bool,
    /// Value of the inbound `Authorization` header, if any, verbatim.
    pub authorization: Option<&'a str>,
    pub existing_x_forwarded_for: Option<&'a str>,
}

/// What the caller (C5's proxy engine, or an HTTP/3 handler) should do next.
#[derive(Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    Forward(ForwardInstruction),
    Redirect(RedirectInstruction),
    Unauthorized { realm: String },
    NotFound,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ForwardInstruction {
    pub scheme: String,
    pub userinfo: Option<String>,
    pub host: String,
    pub path: String,
    /// `Some(proto)` to set `X-Forwarded-Proto`; `None` to leave it untouched.
    pub set_x_forwarded_proto: Option<String>,
    /// When the mapping opted out of proxy semantics, the outbound `Host`
    /// header is overwritten and any inbound `X-Forwarded-For` is dropped.
    pub overwrite_host: bool,
    pub remove_x_forwarded_for: bool,
    pub add_header: Vec<(String, String)>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RedirectInstruction {
    pub location: String,
    pub add_header: Vec<(String, String)>,
}

/// Runs the state machine for one request against a single protocol's
/// routing table snapshot.
pub fn route(table: &RoutingTable, ctx: &RouteContext) -> RouteOutcome {
    // RESOLVE_HOST
    let key = host_key(ctx.host_header);
    let Some(mappings) = table.mappings_for(&key) else {
        return RouteOutcome::NotFound;
    };

    // RESOLVE_MAPPING
    let Some(mapping) = RoutingTable::match_mapping(mappings, ctx.path) else {
        return RouteOutcome::NotFound;
    };

    // AUTH
    if mapping.requires_auth() {
        let authorized = ctx
            .authorization
            .and_then(|h| h.strip_prefix("Basic "))
            .map(|b64| mapping.authorized(b64))
            .unwrap_or(false);
        if !authorized {
            return RouteOutcome::Unauthorized { realm: DEFAULT_REALM.to_string() };
        }
    }

    // DECIDE
    let target_path = mapping.target.path();
    let final_path = if target_path.is_empty() {
        ctx.path.to_string()
    } else {
        format!("{}{}", target_path, &ctx.path[mapping.path.len()..])
    };
    let full_path = match ctx.query {
        Some(q) if !q.is_empty() => format!("{}?{}", final_path, q),
        _ => final_path,
    };

    if mapping.redirect {
        let location = format!(
            "{}://{}{}",
            mapping.target.scheme(),
            mapping.target.host_str().unwrap_or_default(),
            full_path
        );
        return RouteOutcome::Redirect(RedirectInstruction {
            location,
            add_header: mapping.add_header.clone(),
        });
    }

    let set_x_forwarded_proto = if mapping.proxy_header {
        Some(derive_scheme(ctx))
    } else {
        None
    };

    RouteOutcome::Forward(ForwardInstruction {
        scheme: mapping.target.scheme().to_string(),
        userinfo: non_empty(mapping.target.username()).map(|u| match mapping.target.password() {
            Some(p) => format!("{}:{}", u, p),
            None => u.to_string(),
        }),
        host: mapping.target.host_str().unwrap_or_default().to_string(),
        path: full_path,
        set_x_forwarded_proto,
        overwrite_host: !mapping.proxy_header,
        remove_x_forwarded_for: !mapping.proxy_header,
        add_header: mapping.add_header.clone(),
    })
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Inspects `X-Forwarded-Proto` first; falls back to whether the inbound
/// connection was TLS/QUIC-terminated.
fn derive_scheme(ctx: &RouteContext) -> String {
    if let Some(proto) = ctx.inbound_x_forwarded_proto {
        let lower = proto.to_ascii_lowercase();
        if lower == "http" || lower == "https" {
            return lower;
        }
    }
    if ctx.inbound_is_secure {
        "https".to_string()
    } else {
        "http".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HttpSectionConfig, MappingConfig, VhostConfig};

    fn table_with(mapping: MappingConfig) -> RoutingTable {
        let section = HttpSectionConfig {
            listen: vec![":80".into()],
            vhost: vec![VhostConfig {
                name: "a".into(),
                domain: "a.example".into(),
                mapping: vec![mapping],
                cert: None,
            }],
        };
        RoutingTable::build(&section).unwrap()
    }

    fn ctx<'a>(host: &'a str, path: &'a str) -> RouteContext<'a> {
        RouteContext {
            host_header: host,
            path,
            query: None,
            inbound_x_forwarded_proto: None,
            inbound_is_secure: false,
            authorization: None,
            existing_x_forwarded_for: None,
        }
    }

    #[test]
    fn prefix_rewrite() {
        let table = table_with(MappingConfig {
            path: "/api".into(),
            target: "http://u:9/v2".into(),
            proxy_header: false,
            ..Default::default()
        });
        let mut c = ctx("a.example", "/api/x");
        c.query = Some("q=1");

        match route(&table, &c) {
            RouteOutcome::Forward(f) => {
                assert_eq!(f.host, "u:9");
                assert_eq!(f.path, "/v2/x?q=1");
                assert!(f.overwrite_host);
                assert!(f.remove_x_forwarded_for);
                assert!(f.set_x_forwarded_proto.is_none());
            }
            other => panic!("expected Forward, got {:?}", other),
        }
    }

    #[test]
    fn pass_through_with_proxy_headers() {
        let table = table_with(MappingConfig {
            path: "/".into(),
            target: "http://u:9".into(),
            proxy_header: true,
            ..Default::default()
        });
        let mut c = ctx("a.example", "/foo");
        c.inbound_is_secure = true;

        match route(&table, &c) {
            RouteOutcome::Forward(f) => {
                assert_eq!(f.path, "/foo");
                assert!(!f.overwrite_host);
                assert_eq!(f.set_x_forwarded_proto, Some("https".to_string()));
            }
            other => panic!("expected Forward, got {:?}", other),
        }
    }

    #[test]
    fn redirect_with_extra_headers() {
        let table = table_with(MappingConfig {
            path: "/old".into(),
            target: "https://new/here".into(),
            redirect: true,
            add_header: vec!["X-R: 1".into()],
            ..Default::default()
        });
        let mut c = ctx("a.example", "/old/page");
        c.query = Some("x=y");

        match route(&table, &c) {
            RouteOutcome::Redirect(r) => {
                assert_eq!(r.location, "https://new/here/page?x=y");
                assert_eq!(r.add_header, vec![("X-R".to_string(), "1".to_string())]);
            }
            other => panic!("expected Redirect, got {:?}", other),
        }
    }

    #[test]
    fn missing_basic_auth_is_unauthorized() {
        let table = table_with(MappingConfig {
            path: "/".into(),
            target: "http://u:9".into(),
            basic_auth: vec!["user:pass".into()],
            ..Default::default()
        });
        let c = ctx("a.example", "/");
        assert!(matches!(route(&table, &c), RouteOutcome::Unauthorized { .. }));
    }

    #[test]
    fn correct_basic_auth_is_forwarded() {
        let table = table_with(MappingConfig {
            path: "/".into(),
            target: "http://u:9".into(),
            basic_auth: vec!["user:pass".into()],
            ..Default::default()
        });
        let mut c = ctx("a.example", "/");
        c.authorization = Some("Basic dXNlcjpwYXNz");
        assert!(matches!(route(&table, &c), RouteOutcome::Forward(_)));
    }

    #[test]
    fn unknown_host_is_not_found() {
        let table = table_with(MappingConfig {
            path: "/".into(),
            target: "http://u:9".into(),
            ..Default::default()
        });
        let c = ctx("unknown.example", "/");
        assert_eq!(route(&table, &c), RouteOutcome::NotFound);
    }
}
