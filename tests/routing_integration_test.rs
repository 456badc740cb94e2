//! Exercises the full `Config -> RoutingTable -> router::route` pipeline
//! across two vhosts sharing a protocol, rather than a single compiled
//! mapping in isolation.

use vhostd::config::{HttpSectionConfig, MappingConfig, VhostConfig};
use vhostd::router::{route, RouteContext, RouteOutcome};
use vhostd::routing::RoutingTable;

fn section() -> HttpSectionConfig {
    HttpSectionConfig {
        listen: vec![":80".into()],
        vhost: vec![
            VhostConfig {
                name: "blog".into(),
                domain: "blog.example".into(),
                mapping: vec![
                    MappingConfig {
                        path: "/admin".into(),
                        target: "http://10.0.0.1:9000".into(),
                        basic_auth: vec!["root:toor".into()],
                        ..Default::default()
                    },
                    MappingConfig {
                        path: "/".into(),
                        target: "http://10.0.0.1:9001".into(),
                        ..Default::default()
                    },
                ],
                cert: None,
            },
            VhostConfig {
                name: "legacy".into(),
                domain: "legacy.example".into(),
                mapping: vec![MappingConfig {
                    path: "/".into(),
                    target: "https://new.example/start".into(),
                    redirect: true,
                    ..Default::default()
                }],
                cert: None,
            },
        ],
    }
}

fn ctx<'a>(host: &'a str, path: &'a str, authorization: Option<&'a str>) -> RouteContext<'a> {
    RouteContext {
        host_header: host,
        path,
        query: None,
        inbound_x_forwarded_proto: None,
        inbound_is_secure: false,
        authorization,
        existing_x_forwarded_for: None,
    }
}

#[test]
fn unknown_host_is_not_found() {
    let table = RoutingTable::build(&section()).unwrap();
    let outcome = route(&table, &ctx("nowhere.example", "/", None));
    assert_eq!(outcome, RouteOutcome::NotFound);
}

#[test]
fn second_vhost_on_the_same_table_redirects() {
    let table = RoutingTable::build(&section()).unwrap();
    match route(&table, &ctx("legacy.example", "/page", None)) {
        RouteOutcome::Redirect(r) => assert_eq!(r.location, "https://new.example/start/page"),
        other => panic!("expected Redirect, got {other:?}"),
    }
}

#[test]
fn protected_prefix_requires_basic_auth_while_root_does_not() {
    let table = RoutingTable::build(&section()).unwrap();

    let denied = route(&table, &ctx("blog.example", "/admin/dashboard", None));
    assert!(matches!(denied, RouteOutcome::Unauthorized { .. }));

    let authorized = route(
        &table,
        &ctx("blog.example", "/admin/dashboard", Some("Basic cm9vdDp0b29y")),
    );
    match authorized {
        RouteOutcome::Forward(f) => assert_eq!(f.host, "10.0.0.1:9000"),
        other => panic!("expected Forward, got {other:?}"),
    }

    match route(&table, &ctx("blog.example", "/posts/1", None)) {
        RouteOutcome::Forward(f) => assert_eq!(f.host, "10.0.0.1:9001"),
        other => panic!("expected Forward, got {other:?}"),
    }
}
