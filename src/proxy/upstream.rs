//! Upstream connection helpers shared by the protocol proxies.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::endpoint::Target;
use crate::error::ProxyError;

/// Connect to the upstream target, bounded by `connect_timeout`.
pub async fn connect(target: &Target, connect_timeout: Duration) -> Result<TcpStream, ProxyError> {
    let addr = target.authority();
    let stream = timeout(connect_timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| ProxyError::ConnectTimeout {
            target: addr.clone(),
        })?
        .map_err(|source| ProxyError::Connect {
            target: addr.clone(),
            source,
        })?;

    stream.set_nodelay(true)?;
    tracing::trace!(upstream = %addr, "Connected to upstream");
    Ok(stream)
}

/// Copy bytes both ways until either side closes.
///
/// Returns the byte counts client→upstream and upstream→client.
pub async fn relay(client: &mut TcpStream, upstream: &mut TcpStream) -> Result<(u64, u64), ProxyError> {
    let (sent, received) = tokio::io::copy_bidirectional(client, upstream).await?;
    Ok((sent, received))
}
