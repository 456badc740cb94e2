//! End-to-end test of the management API: spins up a real `App` (with its
//! listener supervisor) against an ephemeral port and drives it with an
//! HTTP client, exercising reload/vhost-listen/vhost CRUD and Basic auth.

use std::path::PathBuf;

use vhostd::config::{ApiConfig, AuthConfig, Config, HttpSectionConfig, MappingConfig, VhostConfig};
use vhostd::state::App;

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

async fn wait_until_listening(port: u16) {
    for _ in 0..50 {
        if tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("admin api never started listening on port {port}");
}

#[tokio::test]
async fn reload_and_vhost_listen_round_trip_without_auth() {
    let port = free_port();
    let cfg = Config {
        api: Some(ApiConfig { listen: vec![format!(":{port}")], ..Default::default() }),
        ..Default::default()
    };
    let app = App::new(PathBuf::from("unused.yaml"), cfg).await.unwrap();
    wait_until_listening(port).await;

    let client = reqwest::Client::new();
    let base = format!("http://127.0.0.1:{port}/api/v1");

    let health: serde_json::Value =
        client.get(format!("http://127.0.0.1:{port}/health")).send().await.unwrap().json().await.unwrap();
    assert_eq!(health["errno"], 0);

    let reload = client.get(format!("{base}/reload")).send().await.unwrap();
    assert_eq!(reload.status(), 200);

    let listen: serde_json::Value =
        client.get(format!("{base}/vhost-listen")).send().await.unwrap().json().await.unwrap();
    assert_eq!(listen["errno"], 0);
    assert!(listen["data"]["http"].as_array().unwrap().is_empty());

    let set_resp = client
        .post(format!("{base}/vhost-listen"))
        .json(&serde_json::json!({"http": [":8080"], "https": [], "http3": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(set_resp.status(), 200);

    let listen_after: serde_json::Value =
        client.get(format!("{base}/vhost-listen")).send().await.unwrap().json().await.unwrap();
    assert_eq!(listen_after["data"]["http"], serde_json::json!([":8080"]));

    app.cancel.cancel();
}

#[tokio::test]
async fn vhost_crud_round_trips_through_the_http_config_endpoints() {
    let port = free_port();
    let cfg = Config {
        api: Some(ApiConfig { listen: vec![format!(":{port}")], ..Default::default() }),
        ..Default::default()
    };
    let app = App::new(PathBuf::from("unused.yaml"), cfg).await.unwrap();
    wait_until_listening(port).await;

    let client = reqwest::Client::new();
    let base = format!("http://127.0.0.1:{port}/api/v1");

    let vhost = VhostConfig {
        name: "blog".into(),
        domain: "blog.example".into(),
        mapping: vec![MappingConfig { path: "/".into(), target: "http://127.0.0.1:9001".into(), ..Default::default() }],
        cert: None,
    };
    let add_resp = client.post(format!("{base}/http-vhost/")).json(&vhost).send().await.unwrap();
    assert_eq!(add_resp.status(), 200);

    let vhosts: serde_json::Value = client.get(format!("{base}/http-vhost/")).send().await.unwrap().json().await.unwrap();
    assert_eq!(vhosts["data"].as_array().unwrap().len(), 1);

    let fetched: serde_json::Value =
        client.get(format!("{base}/http-vhost/blog.example")).send().await.unwrap().json().await.unwrap();
    assert_eq!(fetched["data"]["name"], "blog");

    let del_resp = client.delete(format!("{base}/http-vhost/blog.example")).send().await.unwrap();
    assert_eq!(del_resp.status(), 200);

    let after: serde_json::Value = client.get(format!("{base}/http-vhost/")).send().await.unwrap().json().await.unwrap();
    assert!(after["data"].as_array().unwrap().is_empty());

    app.cancel.cancel();
}

#[tokio::test]
async fn basic_auth_gates_protected_endpoints_but_not_health() {
    let port = free_port();
    let cfg = Config {
        api: Some(ApiConfig {
            listen: vec![format!(":{port}")],
            auth: Some(AuthConfig { username: "admin".into(), password: "hunter2".into() }),
            public: None,
        }),
        ..Default::default()
    };
    let app = App::new(PathBuf::from("unused.yaml"), cfg).await.unwrap();
    wait_until_listening(port).await;

    let client = reqwest::Client::new();

    let unauthenticated = client.get(format!("http://127.0.0.1:{port}/api/v1/reload")).send().await.unwrap();
    assert_eq!(unauthenticated.status(), 401);
    assert!(unauthenticated.headers().get("www-authenticate").is_some());

    let health = client.get(format!("http://127.0.0.1:{port}/health")).send().await.unwrap();
    assert_eq!(health.status(), 200);

    let authenticated = client
        .get(format!("http://127.0.0.1:{port}/api/v1/reload"))
        .basic_auth("admin", Some("hunter2"))
        .send()
        .await
        .unwrap();
    assert_eq!(authenticated.status(), 200);

    let wrong_password = client
        .get(format!("http://127.0.0.1:{port}/api/v1/reload"))
        .basic_auth("admin", Some("nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_password.status(), 401);

    app.cancel.cancel();
}
