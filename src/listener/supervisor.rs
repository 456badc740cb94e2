//! Listener supervisor
//!
//! Holds four keyed sets of running listeners (api, http, https, http3) and
//! reconciles them against a new [`Config`] by diff-and-retain: an endpoint
//! already running keeps its socket and in-flight connections; an endpoint
//! that disappeared is shut down; a new endpoint gets a fresh listener. A
//! reload never touches a listener whose desired endpoint set didn't change.

use std::collections::HashMap;

use log::{info, warn};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::state::App;
use std::sync::Arc;

/// A single running listener task, stoppable via its own cancellation token.
struct RunningListener {
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

impl RunningListener {
    fn stop(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

#[derive(Default)]
struct ListenerSet {
    by_endpoint: HashMap<String, RunningListener>,
}

impl ListenerSet {
    /// Stops every endpoint not in `desired`, returning the endpoints that
    /// still need to be started.
    fn retain_and_diff(&mut self, desired: &[String]) -> Vec<String> {
        let desired_set: std::collections::HashSet<&str> = desired.iter().map(String::as_str).collect();
        let stale: Vec<String> = self
            .by_endpoint
            .keys()
            .filter(|ep| !desired_set.contains(ep.as_str()))
            .cloned()
            .collect();
        for endpoint in stale {
            if let Some(listener) = self.by_endpoint.remove(&endpoint) {
                info!("stopping listener on {endpoint}");
                listener.stop();
            }
        }
        desired
            .iter()
            .filter(|ep| !self.by_endpoint.contains_key(ep.as_str()))
            .cloned()
            .collect()
    }

    fn insert(&mut self, endpoint: String, cancel: CancellationToken, handle: tokio::task::JoinHandle<()>) {
        self.by_endpoint.insert(endpoint, RunningListener { cancel, handle });
    }
}

/// Owns the four keyed listener sets and reconciles them on every reload.
#[derive(Default)]
pub struct ListenerSupervisor {
    api: Mutex<ListenerSet>,
    http: Mutex<ListenerSet>,
    https: Mutex<ListenerSet>,
    http3: Mutex<ListenerSet>,
}

impl ListenerSupervisor {
    pub fn new() -> ListenerSupervisor {
        ListenerSupervisor::default()
    }

    /// Brings each listener set up to date with `cfg`'s desired endpoints.
    pub async fn reconcile(&self, app: &Arc<App>, cfg: &Config) {
        let api_listen = cfg.api.as_ref().map(|a| a.listen.clone()).unwrap_or_default();
        let http_listen = cfg.http.as_ref().map(|s| s.listen.clone()).unwrap_or_default();
        let https_listen = cfg.https.as_ref().map(|s| s.listen.clone()).unwrap_or_default();
        let http3_listen = cfg.http3.as_ref().map(|s| s.listen.clone()).unwrap_or_default();

        {
            let mut set = self.api.lock().await;
            for endpoint in set.retain_and_diff(&api_listen) {
                self.start_api(&mut set, app.clone(), endpoint).await;
            }
        }
        {
            let mut set = self.http.lock().await;
            for endpoint in set.retain_and_diff(&http_listen) {
                self.start_http(&mut set, app.clone(), endpoint).await;
            }
        }
        {
            let mut set = self.https.lock().await;
            for endpoint in set.retain_and_diff(&https_listen) {
                self.start_https(&mut set, app.clone(), endpoint).await;
            }
        }
        {
            let mut set = self.http3.lock().await;
            for endpoint in set.retain_and_diff(&http3_listen) {
                self.start_http3(&mut set, app.clone(), endpoint).await;
            }
        }
    }

    async fn start_http(&self, set: &mut ListenerSet, app: Arc<App>, endpoint: String) {
        let cancel = app.cancel.child_token();
        let task_cancel = cancel.clone();
        let addr = match crate::listener::http::parse_listen(&endpoint) {
            Ok(addr) => addr,
            Err(e) => {
                warn!("skipping http listener {endpoint}: {e}");
                return;
            }
        };
        let handle = tokio::spawn(async move {
            if let Err(e) = crate::listener::http::run(addr, app, task_cancel).await {
                warn!("http listener on {addr} exited: {e}");
            }
        });
        info!("http listener started on {endpoint}");
        set.insert(endpoint, cancel, handle);
    }

    async fn start_https(&self, set: &mut ListenerSet, app: Arc<App>, endpoint: String) {
        let cancel = app.cancel.child_token();
        let task_cancel = cancel.clone();
        let addr = match crate::listener::http::parse_listen(&endpoint) {
            Ok(addr) => addr,
            Err(e) => {
                warn!("skipping https listener {endpoint}: {e}");
                return;
            }
        };
        let handle = tokio::spawn(async move {
            if let Err(e) = crate::listener::https::run(addr, app, task_cancel).await {
                warn!("https listener on {addr} exited: {e}");
            }
        });
        info!("https listener started on {endpoint}");
        set.insert(endpoint, cancel, handle);
    }

    async fn start_http3(&self, set: &mut ListenerSet, app: Arc<App>, endpoint: String) {
        let cancel = app.cancel.child_token();
        let task_cancel = cancel.clone();
        let addr = match crate::listener::http::parse_listen(&endpoint) {
            Ok(addr) => addr,
            Err(e) => {
                warn!("skipping http3 listener {endpoint}: {e}");
                return;
            }
        };
        let handle = tokio::spawn(async move {
            if let Err(e) = crate::listener::http3::run(addr, app, task_cancel).await {
                warn!("http3 listener on {addr} exited: {e}");
            }
        });
        info!("http3 listener started on {endpoint}");
        set.insert(endpoint, cancel, handle);
    }

    async fn start_api(&self, set: &mut ListenerSet, app: Arc<App>, endpoint: String) {
        let cancel = app.cancel.child_token();
        let task_cancel = cancel.clone();
        let addr = match crate::listener::http::parse_listen(&endpoint) {
            Ok(addr) => addr,
            Err(e) => {
                warn!("skipping api listener {endpoint}: {e}");
                return;
            }
        };
        let handle = tokio::spawn(async move {
            if let Err(e) = crate::admin::run(addr, app, task_cancel).await {
                warn!("admin api listener on {addr} exited: {e}");
            }
        });
        info!("admin api listener started on {endpoint}");
        set.insert(endpoint, cancel, handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn retain_and_diff_only_returns_new_endpoints() {
        let mut set = ListenerSet::default();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(async {});
        set.insert(":80".into(), cancel, handle);

        let to_start = set.retain_and_diff(&[":80".into(), ":8080".into()]);
        assert_eq!(to_start, vec![":8080".to_string()]);
        assert!(set.by_endpoint.contains_key(":80"));
    }

    #[tokio::test]
    async fn retain_and_diff_stops_removed_endpoints() {
        let mut set = ListenerSet::default();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(async {});
        set.insert(":80".into(), cancel, handle);

        let to_start = set.retain_and_diff(&[]);
        assert!(to_start.is_empty());
        assert!(set.by_endpoint.is_empty());
    }
}
