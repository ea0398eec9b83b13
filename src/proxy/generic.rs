//! Opaque TCP relay to the upstream.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::endpoint::Target;
use crate::error::ProxyError;
use crate::proxy::ProxyOptions;
use crate::proxy::upstream;

/// Relays every inbound connection byte-for-byte to the endpoint.
#[derive(Debug, Clone)]
pub struct GenericProxy {
    target: Target,
    connect_timeout: Duration,
}

impl GenericProxy {
    pub fn new(options: &ProxyOptions) -> Result<Self, ProxyError> {
        Ok(Self {
            target: Target::parse(&options.endpoint)?,
            connect_timeout: options.connect_timeout,
        })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub async fn serve(&self, mut client: TcpStream, peer: SocketAddr) -> Result<(), ProxyError> {
        let mut upstream = upstream::connect(&self.target, self.connect_timeout).await?;
        let (sent, received) = upstream::relay(&mut client, &mut upstream).await?;

        tracing::debug!(
            peer = %peer,
            upstream = %self.target,
            sent,
            received,
            "Relay finished"
        );
        Ok(())
    }
}
