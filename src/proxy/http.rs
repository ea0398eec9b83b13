//! HTTP/1.1 forwarding to the upstream
//!
//! Each inbound request becomes one upstream exchange on a fresh connection
//! (`Connection: close`), so the response body can always be delimited by
//! Content-Length or by the upstream closing the connection.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::endpoint::Target;
use crate::error::ProxyError;
use crate::http::connection::Connection;
use crate::http::{Headers, find_header, is_hop_by_hop};
use crate::http::parser::find_headers_end;
use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::proxy::ProxyOptions;
use crate::proxy::upstream;

/// Default buffer size for streaming
const BUFFER_SIZE: usize = 8192;

/// Largest upstream response head accepted
const MAX_RESPONSE_HEADER_BYTES: usize = 64 * 1024;

/// Forwards HTTP/1.1 requests to the endpoint.
#[derive(Debug, Clone)]
pub struct HttpProxy {
    target: Target,

    /// Connection timeout duration
    connect_timeout: Duration,

    /// Request timeout duration
    request_timeout: Duration,

    max_body_bytes: usize,
}

impl HttpProxy {
    pub fn new(options: &ProxyOptions) -> Result<Self, ProxyError> {
        Ok(Self {
            target: Target::parse(&options.endpoint)?,
            connect_timeout: options.connect_timeout,
            request_timeout: options.request_timeout,
            max_body_bytes: options.max_body_bytes,
        })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Largest request body accepted from a client.
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Serve one client connection until it closes.
    pub async fn serve(&self, client: TcpStream, peer: SocketAddr) -> Result<(), ProxyError> {
        let mut conn = Connection::new(client, self);
        conn.run()
            .await
            .map_err(|e| ProxyError::Protocol(format!("connection from {peer}: {e:#}")))
    }

    /// Forward an HTTP request to the upstream.
    ///
    /// Upstream failures are turned into 502/504 responses rather than errors
    /// so the client always gets an answer.
    pub async fn forward(&self, request: &Request) -> Response {
        tracing::debug!(
            upstream = %self.target,
            method = request.method.as_str(),
            path = %request.path,
            "Forwarding request to upstream"
        );

        match self.exchange(request).await {
            Ok(response) => {
                tracing::info!(
                    upstream = %self.target,
                    status = response.status.as_u16(),
                    method = request.method.as_str(),
                    path = %request.path,
                    "Request forwarded successfully"
                );
                response
            }
            Err(e) => {
                tracing::warn!(
                    upstream = %self.target,
                    error = %e,
                    method = request.method.as_str(),
                    path = %request.path,
                    "Failed to proxy request to upstream"
                );
                Self::error_response(&e)
            }
        }
    }

    async fn exchange(&self, request: &Request) -> Result<Response, ProxyError> {
        let mut stream = upstream::connect(&self.target, self.connect_timeout).await?;

        timeout(self.request_timeout, async {
            let request_bytes = self.build_http_request(request);
            stream.write_all(&request_bytes).await?;
            stream.flush().await?;

            tracing::trace!("Request sent to upstream");

            self.read_http_response(&mut stream, request.method)
                .await
                .map_err(|e| ProxyError::Protocol(format!("{e:#}")))
        })
        .await
        .map_err(|_| ProxyError::RequestTimeout {
            target: self.target.authority(),
        })?
    }

    /// Serialize `request` for the upstream.
    ///
    /// The target path is prefixed with the endpoint's path, `Host` names the
    /// upstream, hop-by-hop headers are dropped and the upstream connection
    /// is closed after one exchange.
    pub fn build_http_request(&self, request: &Request) -> Vec<u8> {
        let mut head = format!(
            "{} {}{} {}\r\n",
            request.method,
            self.target.path,
            request.target(),
            request.version
        );

        for (key, value) in request.end_to_end_headers() {
            head.push_str(&format!("{key}: {value}\r\n"));
        }
        head.push_str(&format!("Host: {}\r\n", self.target.authority()));
        head.push_str("Connection: close\r\n\r\n");

        let mut buffer = head.into_bytes();
        buffer.extend_from_slice(&request.body);
        buffer
    }

    /// Read HTTP response from upstream
    async fn read_http_response(&self, stream: &mut TcpStream, method: Method) -> Result<Response> {
        let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);

        loop {
            if let Some(headers_end) = find_headers_end(&buffer) {
                let headers_bytes = buffer.split_to(headers_end + 4);
                let (status, reason, headers) = parse_response_head(&headers_bytes)?;

                // interim responses precede the real one
                let code = status.as_u16();
                if (100..200).contains(&code) && code != 101 {
                    tracing::trace!(status = code, "Skipping interim response");
                    continue;
                }

                let body = if method == Method::HEAD || status.is_bodiless() {
                    Vec::new()
                } else {
                    read_response_body(stream, &mut buffer, &headers).await?
                };

                let headers: Headers = headers
                    .into_iter()
                    .filter(|(k, _)| !is_hop_by_hop(k))
                    .collect();

                let mut builder = ResponseBuilder::new(status).headers(headers).body(body);
                if !reason.is_empty() {
                    builder = builder.reason(reason);
                }
                return Ok(builder.build());
            }

            // Prevent unbounded header growth
            if buffer.len() > MAX_RESPONSE_HEADER_BYTES {
                anyhow::bail!("Response headers too large");
            }

            if stream.read_buf(&mut buffer).await? == 0 {
                anyhow::bail!("Connection closed before complete response received");
            }
        }
    }

    fn error_response(error: &ProxyError) -> Response {
        match error {
            ProxyError::ConnectTimeout { .. } | ProxyError::RequestTimeout { .. } => {
                Response::gateway_timeout()
            }
            _ => Response::bad_gateway(),
        }
    }
}

/// Parse the status line and headers of an upstream response.
fn parse_response_head(head: &[u8]) -> Result<(StatusCode, String, Headers)> {
    let head = std::str::from_utf8(head).context("Invalid UTF-8 in response headers")?;

    let mut lines = head.split("\r\n");

    let status_line = lines.next().context("Empty response")?;
    let mut parts = status_line.splitn(3, ' ');

    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/1.") {
        anyhow::bail!("Invalid status line: {}", status_line);
    }

    let code: u16 = parts
        .next()
        .context("Missing status code")?
        .parse()
        .context("Invalid status code")?;
    let reason = parts.next().unwrap_or_default().to_string();

    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect();

    Ok((StatusCode::from_u16(code), reason, headers))
}

/// Read the body: by Content-Length if present, otherwise until the upstream closes.
async fn read_response_body(
    stream: &mut TcpStream,
    buffer: &mut BytesMut,
    headers: &[(String, String)],
) -> Result<Vec<u8>> {
    let content_length = find_header(headers, "Content-Length")
        .map(|v| v.parse::<usize>().context("Invalid Content-Length"))
        .transpose()?;

    let Some(content_length) = content_length else {
        let mut body = buffer.split().to_vec();
        stream.read_to_end(&mut body).await?;
        return Ok(body);
    };

    let mut body = Vec::with_capacity(content_length);

    // Use existing buffer data first
    let from_buffer = buffer.len().min(content_length);
    body.extend_from_slice(&buffer[..from_buffer]);
    buffer.advance(from_buffer);

    let mut chunk = [0u8; BUFFER_SIZE];
    while body.len() < content_length {
        let to_read = (content_length - body.len()).min(BUFFER_SIZE);
        let n = stream.read(&mut chunk[..to_read]).await?;

        if n == 0 {
            anyhow::bail!("Connection closed before complete body received");
        }

        body.extend_from_slice(&chunk[..n]);
    }

    Ok(body)
}
