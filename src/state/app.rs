//! Shared state & reload orchestrator
//!
//! A single owned `App` value, constructed once in `main` and threaded
//! explicitly into the admin server, the listener supervisor, and the OCSP
//! stapler task — replacing a global singleton with explicit composition.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::common::{ProxyError, Result};
use crate::config::{self, Config};
use crate::listener::supervisor::ListenerSupervisor;
use crate::proxy::Engine;

use super::derived::{Derived, DerivedViews};

/// Owns the in-memory config, its installed derived views, the listener
/// supervisor, and the cancellation token propagated to every background
/// task on shutdown.
pub struct App {
    pub config_path: PathBuf,
    /// Memory-config lock: guards the working copy the admin API edits.
    memory: RwLock<Config>,
    /// File-config lock: serializes "save to file" against concurrent saves.
    file: RwLock<()>,
    pub views: DerivedViews,
    pub supervisor: ListenerSupervisor,
    pub cancel: CancellationToken,
    engine: Engine,
}

impl App {
    /// Validates `initial`, builds its derived views, and returns a
    /// ready-to-run `App`. Does not yet start any listeners; call
    /// [`App::reload`] once to bring the listener supervisor up to date.
    pub async fn new(config_path: PathBuf, initial: Config) -> Result<Arc<App>> {
        config::validate(&initial).map_err(ProxyError::from)?;
        let derived = Derived::build(&initial)?;

        let app = Arc::new(App {
            config_path,
            memory: RwLock::new(initial),
            file: RwLock::new(()),
            views: DerivedViews::new(derived),
            supervisor: ListenerSupervisor::new(),
            cancel: CancellationToken::new(),
            engine: Engine::new(),
        });

        app.reload().await?;
        Ok(app)
    }

    /// A read-only snapshot of the working config, cloned out from under
    /// the memory-config read lock.
    pub async fn snapshot(&self) -> Config {
        self.memory.read().await.clone()
    }

    /// Applies `mutate` to the working config under the memory-config write
    /// lock, validating the result before committing. Add/Mod operations
    /// validate the whole resulting `Config`, matching the management API's
    /// contract.
    pub async fn mutate<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut guard = self.memory.write().await;
        let mut candidate = guard.clone();
        mutate(&mut candidate);
        config::validate(&candidate).map_err(ProxyError::from)?;
        *guard = candidate;
        Ok(())
    }

    /// `reload`: acquires memory-R, validates, rebuilds routing tables and
    /// certificate indices, then asks the supervisor to reconcile listener
    /// endpoints. A reload never closes a listener whose endpoint didn't
    /// change.
    pub async fn reload(self: &Arc<Self>) -> Result<()> {
        let cfg = self.memory.read().await.clone();
        config::validate(&cfg).map_err(ProxyError::from)?;
        let derived = Derived::build(&cfg)?;
        self.views.install(derived);
        self.supervisor.reconcile(self, &cfg).await;
        Ok(())
    }

    /// `save`: acquires memory-R + file-W, persisting the working config to
    /// the configured file path.
    pub async fn save(&self) -> Result<()> {
        let _file_guard = self.file.write().await;
        let cfg = self.memory.read().await;
        config::loader::save(&self.config_path, &cfg).await?;
        Ok(())
    }

    pub fn cert_store(&self) -> Arc<crate::cert::CertStore> {
        self.views.cert_store.load_full()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}
