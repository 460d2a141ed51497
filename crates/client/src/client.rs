//! Wiring of transport, router, session and guard

use crate::auth::{AuthGuard, Navigator};
use crate::config::ClientConfig;
use crate::notify::Notifier;
use crate::router::{Registration, Router};
use crate::session::{FileTokenStore, SessionState, TokenStore};
use crate::transport::{Connector, Transport, TransportHandle, WsConnector};
use crate::views::{self, View, ViewContext};
use airshipui_common::{Error, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// A running client: one connection loop plus the shared pieces views need.
///
/// Must be started inside a tokio runtime.
pub struct Client {
    config: ClientConfig,
    router: Router,
    session: Arc<SessionState>,
    handle: TransportHandle,
    guard: Arc<AuthGuard>,
    notifier: Arc<dyn Notifier>,
    task: JoinHandle<Result<()>>,
    _guard_registration: Registration,
}

impl Client {
    /// Connect to `config.endpoint` with the on-disk token cache.
    pub fn start(
        config: ClientConfig,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        config.validate()?;
        let connector = Arc::new(WsConnector::new(&config.endpoint)?);
        let store = Arc::new(FileTokenStore::new(config.token_store_path.clone()));
        Self::start_with(config, connector, store, notifier, navigator)
    }

    /// Start with explicit connector and token store.
    pub fn start_with(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        store: Arc<dyn TokenStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let session = SessionState::init(store)?;
        let router = Router::new(notifier.clone());
        let (transport, handle) =
            Transport::new(connector, router.clone(), session.clone(), &config);

        let guard = AuthGuard::new(
            Arc::new(handle.clone()),
            session.clone(),
            navigator,
            notifier.clone(),
            config.auth.clone(),
        );
        let guard_registration = router.register(guard.clone());

        info!("Starting airshipUI client for {}", config.endpoint);
        let task = transport.spawn();

        Ok(Self {
            config,
            router,
            session,
            handle,
            guard,
            notifier,
            task,
            _guard_registration: guard_registration,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub fn handle(&self) -> &TransportHandle {
        &self.handle
    }

    pub fn guard(&self) -> &Arc<AuthGuard> {
        &self.guard
    }

    /// Context for building views bound to this client.
    pub fn view_context(&self) -> ViewContext {
        ViewContext::new(Arc::new(self.handle.clone()), self.notifier.clone())
    }

    /// Register `view` and send its initial requests.
    pub fn activate<V: View + 'static>(&self, view: Arc<V>) -> Result<Registration> {
        views::activate(&self.router, view)
    }

    /// Stop the connection loop and wait for it to finish.
    pub async fn shutdown(self) -> Result<()> {
        debug!("Shutting down client");
        self.handle.shutdown();
        let result = self
            .task
            .await
            .map_err(|e| Error::Internal(format!("transport task failed: {}", e)))?;
        self.session.teardown();
        result
    }
}
