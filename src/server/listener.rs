use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::error::ServeError;
use crate::router::Router;

/// Pause after an accept failure that is not about a single connection.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// The service's TCP server.
///
/// A router must be installed with [`Server::init`] before [`Server::run`];
/// nothing is bound or accepted until then.
#[derive(Debug)]
pub struct Server {
    address: String,
    router: Option<Arc<Router>>,
    ready: Option<oneshot::Sender<SocketAddr>>,
}

impl Server {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            router: None,
            ready: None,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Install the router every accepted connection is dispatched to.
    pub fn init(&mut self, router: Router) {
        self.router = Some(Arc::new(router));
    }

    pub fn has_router(&self) -> bool {
        self.router.is_some()
    }

    /// Send the bound address on `tx` once the server is listening.
    pub fn notify_ready(&mut self, tx: oneshot::Sender<SocketAddr>) {
        self.ready = Some(tx);
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// A failed accept is logged and retried; only bind failures end the
    /// server early. Open connections are aborted on shutdown.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServeError>
    where
        F: Future<Output = ()>,
    {
        let router = self.router.ok_or(ServeError::NoRouter)?;

        let listener = TcpListener::bind(&self.address)
            .await
            .map_err(|source| ServeError::Bind {
                address: self.address.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ServeError::Bind {
            address: self.address.clone(),
            source,
        })?;
        info!(service = %router.name(), "Listening on {}", local_addr);

        if let Some(tx) = self.ready {
            let _ = tx.send(local_addr);
        }

        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!(service = %router.name(), "Shutdown signal received");
                    break;
                }

                accepted = listener.accept() => {
                    let (socket, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(service = %router.name(), error = %e, "Failed to accept connection");
                            let pause = accept_backoff(&e);
                            if !pause.is_zero() {
                                tokio::time::sleep(pause).await;
                            }
                            continue;
                        }
                    };
                    tracing::debug!("Accepted connection from {}", peer);

                    let router = Arc::clone(&router);
                    connections.spawn(async move {
                        if let Err(e) = router.dispatch(socket, peer).await {
                            tracing::error!("Connection error from {}: {}", peer, e);
                        }
                    });
                }

                // reap finished connection tasks
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        connections.abort_all();
        while connections.join_next().await.is_some() {}

        Ok(())
    }
}

/// How long to wait before accepting again after `error`.
///
/// A connection that died before it was accepted is retried at once. Other
/// failures (descriptor exhaustion, mostly) back off so the loop does not spin.
fn accept_backoff(error: &io::Error) -> Duration {
    match error.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted => Duration::ZERO,
        _ => ACCEPT_BACKOFF,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_connections_retry_immediately() {
        let aborted = io::Error::from(io::ErrorKind::ConnectionAborted);

        assert_eq!(accept_backoff(&aborted), Duration::ZERO);
    }

    #[cfg(unix)]
    #[test]
    fn descriptor_exhaustion_backs_off() {
        let emfile = io::Error::from_raw_os_error(nix::errno::Errno::EMFILE as i32);

        assert_eq!(accept_backoff(&emfile), ACCEPT_BACKOFF);
    }
}
