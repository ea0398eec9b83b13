//! gRPC proxy over cleartext HTTP/2.
//!
//! gRPC multiplexes calls over one HTTP/2 connection, so the proxy works at
//! the connection level: it checks the client speaks HTTP/2, then relays the
//! whole connection to the endpoint.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::endpoint::Target;
use crate::error::ProxyError;
use crate::proxy::ProxyOptions;
use crate::proxy::upstream;

/// Client connection preface every HTTP/2 connection starts with (RFC 9113 §3.4).
pub const HTTP2_PREFACE: &[u8; 24] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// Forwards gRPC (h2c) connections to the endpoint.
#[derive(Debug, Clone)]
pub struct GrpcProxy {
    target: Target,
    connect_timeout: Duration,
    preface_timeout: Duration,
}

impl GrpcProxy {
    pub fn new(options: &ProxyOptions) -> Result<Self, ProxyError> {
        Ok(Self {
            target: Target::parse(&options.endpoint)?,
            connect_timeout: options.connect_timeout,
            preface_timeout: options.request_timeout,
        })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub async fn serve(&self, mut client: TcpStream, peer: SocketAddr) -> Result<(), ProxyError> {
        let mut preface = [0u8; HTTP2_PREFACE.len()];
        timeout(self.preface_timeout, client.read_exact(&mut preface))
            .await
            .map_err(|_| ProxyError::Protocol("timed out waiting for HTTP/2 preface".to_string()))??;

        if &preface != HTTP2_PREFACE {
            tracing::warn!(peer = %peer, "Rejecting non-HTTP/2 client on gRPC proxy");
            return Err(ProxyError::Protocol("client did not send the HTTP/2 preface".to_string()));
        }

        let mut upstream = upstream::connect(&self.target, self.connect_timeout).await?;
        upstream.write_all(&preface).await?;

        let (sent, received) = upstream::relay(&mut client, &mut upstream).await?;

        tracing::debug!(
            peer = %peer,
            upstream = %self.target,
            sent = sent + preface.len() as u64,
            received,
            "gRPC connection finished"
        );
        Ok(())
    }
}
