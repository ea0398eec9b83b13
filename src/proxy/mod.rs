//! Protocol proxies
//!
//! A [`Proxy`] fronts a single upstream endpoint. The protocol is chosen by
//! [`ProxyTag`]; construction only captures configuration and never touches
//! the network.

pub mod generic;
pub mod grpc;
pub mod http;
pub mod upstream;

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::endpoint::{ProxyTag, Target};
use crate::error::ProxyError;
use crate::http::parser::MAX_BODY_BYTES;

pub use generic::GenericProxy;
pub use grpc::GrpcProxy;
pub use http::HttpProxy;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Construction options shared by every proxy protocol.
#[derive(Debug, Clone)]
pub struct ProxyOptions {
    /// Upstream the proxy forwards to
    pub endpoint: String,
    pub connect_timeout: Duration,
    /// Bound on a single upstream exchange (HTTP) or on the client
    /// handshake (gRPC)
    pub request_timeout: Duration,
    /// Largest request body the HTTP proxy buffers; larger ones get a 413
    pub max_body_bytes: usize,
}

impl ProxyOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_body_bytes: MAX_BODY_BYTES,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }
}

/// A protocol-specific proxy instance.
#[derive(Debug, Clone)]
pub enum Proxy {
    Grpc(GrpcProxy),
    Http(HttpProxy),
    Generic(GenericProxy),
}

impl Proxy {
    /// Build the proxy for `tag` targeting `options.endpoint`.
    pub fn new(tag: ProxyTag, options: &ProxyOptions) -> Result<Self, ProxyError> {
        Ok(match tag {
            ProxyTag::Grpc => Proxy::Grpc(GrpcProxy::new(options)?),
            ProxyTag::Http => Proxy::Http(HttpProxy::new(options)?),
            ProxyTag::Generic => Proxy::Generic(GenericProxy::new(options)?),
        })
    }

    pub fn tag(&self) -> ProxyTag {
        match self {
            Proxy::Grpc(_) => ProxyTag::Grpc,
            Proxy::Http(_) => ProxyTag::Http,
            Proxy::Generic(_) => ProxyTag::Generic,
        }
    }

    pub fn target(&self) -> &Target {
        match self {
            Proxy::Grpc(p) => p.target(),
            Proxy::Http(p) => p.target(),
            Proxy::Generic(p) => p.target(),
        }
    }

    /// Serve one inbound connection until either side closes it.
    pub async fn serve(&self, stream: TcpStream, peer: SocketAddr) -> Result<(), ProxyError> {
        match self {
            Proxy::Grpc(p) => p.serve(stream, peer).await,
            Proxy::Http(p) => p.serve(stream, peer).await,
            Proxy::Generic(p) => p.serve(stream, peer).await,
        }
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag().as_str())
    }
}
