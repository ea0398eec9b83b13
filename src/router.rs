//! Binds a named proxy into the server's dispatch path.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;

use crate::error::ProxyError;
use crate::proxy::Proxy;

/// Forwards every inbound connection to one proxy, untouched.
#[derive(Debug, Clone)]
pub struct Router {
    name: String,
    proxy: Arc<Proxy>,
}

impl Router {
    pub fn new(name: impl Into<String>, proxy: Arc<Proxy>) -> Self {
        Self {
            name: name.into(),
            proxy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn proxy(&self) -> &Proxy {
        &self.proxy
    }

    pub async fn dispatch(&self, stream: TcpStream, peer: SocketAddr) -> Result<(), ProxyError> {
        tracing::trace!(service = %self.name, peer = %peer, proxy = %self.proxy, "Dispatching connection");
        self.proxy.serve(stream, peer).await
    }
}
