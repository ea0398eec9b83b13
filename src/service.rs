//! Service bootstrap
//!
//! [`Service::run`] wires everything together in a fixed order:
//!
//! 1. substitute the default endpoint if none is configured
//! 2. classify the endpoint into a [`ProxyTag`]
//! 3. build the [`Proxy`]
//! 4. if a command is configured, register and start the backend and arm
//!    its teardown
//! 5. attach a [`Router`] to the proxy
//! 6. install the router into the [`Server`]
//! 7. run the server until shutdown
//! 8. tear the backend down, if one was started
//!
//! Failures in steps 2 to 4 abort before anything listens. Once the backend
//! is running its teardown happens on every way out of `run`, including the
//! future being dropped.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{Instrument, info, info_span, warn};

use crate::config::ServiceConfig;
use crate::endpoint::ProxyTag;
use crate::error::BootstrapError;
use crate::proxy::Proxy;
use crate::router::Router;
use crate::runtime::{LocalRuntime, Runtime};
use crate::server::Server;
use crate::supervisor::ProcessSupervisor;

/// A proxying service and, optionally, the backend it fronts.
pub struct Service<R: Runtime = LocalRuntime> {
    config: ServiceConfig,
    supervisor: Arc<ProcessSupervisor<R>>,
    ready: Option<oneshot::Sender<SocketAddr>>,
}

impl Service<LocalRuntime> {
    /// Service whose backend runs as a child of this process.
    pub fn new(config: ServiceConfig) -> Self {
        let runtime = LocalRuntime::new().with_stop_timeout(config.stop_timeout());
        Self::with_runtime(config, runtime)
    }
}

impl<R: Runtime> Service<R> {
    pub fn with_runtime(config: ServiceConfig, runtime: R) -> Self {
        Self {
            config,
            supervisor: Arc::new(ProcessSupervisor::new(runtime)),
            ready: None,
        }
    }

    /// Send the listening address on `tx` once the server is bound.
    pub fn notify_ready(mut self, tx: oneshot::Sender<SocketAddr>) -> Self {
        self.ready = Some(tx);
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Run until `shutdown` resolves or the server fails.
    pub async fn run<F>(self, shutdown: F) -> Result<(), BootstrapError>
    where
        F: Future<Output = ()>,
    {
        let span = info_span!("service", name = %self.config.name);
        self.bootstrap(shutdown).instrument(span).await
    }

    async fn bootstrap<F>(self, shutdown: F) -> Result<(), BootstrapError>
    where
        F: Future<Output = ()>,
    {
        let Service {
            config,
            supervisor,
            ready,
        } = self;

        let endpoint = config.endpoint();
        let tag = ProxyTag::resolve(endpoint);
        let proxy = Arc::new(Proxy::new(tag, &config.proxy_options())?);

        let backend = match config.descriptor() {
            Some(descriptor) => Some(supervisor.launch(descriptor).await?),
            None => None,
        };

        info!(
            proxy = %proxy,
            service = %config.name,
            endpoint,
            "Service [{}] Serving {} at endpoint {}",
            proxy,
            config.name,
            endpoint
        );

        let router = Router::new(config.name.clone(), proxy);

        let mut server = Server::new(config.address());
        server.init(router);
        if let Some(tx) = ready {
            server.notify_ready(tx);
        }

        let result = server.run(shutdown).await;

        if let Some(backend) = backend {
            let name = backend.name().to_string();
            if let Err(e) = backend.teardown().await {
                warn!(service = %name, error = %e, "Backend teardown failed");
            }
        }

        result.map_err(BootstrapError::from)
    }
}
