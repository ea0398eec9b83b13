use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::http::parser::{ParseError, awaits_continue, parse_http_request_limited};
use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};
use crate::http::writer::ResponseWriter;
use crate::proxy::http::HttpProxy;

const READ_BUFFER_SIZE: usize = 4096;

const CONTINUE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

/// One inbound client connection served by the HTTP proxy.
pub struct Connection<'a> {
    stream: TcpStream,
    buffer: BytesMut,
    state: ConnectionState,
    proxy: &'a HttpProxy,
    /// `100 Continue` already sent for the request being read
    continued: bool,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing {
        writer: ResponseWriter,
        keep_alive: bool,
    },
    Closed,
}

impl<'a> Connection<'a> {
    pub fn new(stream: TcpStream, proxy: &'a HttpProxy) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_BUFFER_SIZE),
            state: ConnectionState::Reading,
            proxy,
            continued: false,
        }
    }

    /// Drive the connection until the client leaves or asks to close.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            self.state = match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => match self.read_request().await {
                    Ok(Some(request)) => ConnectionState::Processing(request),
                    Ok(None) => ConnectionState::Closed,
                    Err(e) => {
                        tracing::debug!(error = ?e, "Rejecting malformed request");
                        // buffer is out of sync from here on
                        ConnectionState::Writing {
                            writer: ResponseWriter::new(&Self::error_response(&e)),
                            keep_alive: false,
                        }
                    }
                },

                ConnectionState::Processing(request) => {
                    let keep_alive = request.keep_alive();
                    let mut response = self.proxy.forward(&request).await;
                    response.headers.push((
                        "Connection".to_string(),
                        if keep_alive { "keep-alive" } else { "close" }.to_string(),
                    ));

                    ConnectionState::Writing {
                        writer: ResponseWriter::new(&response),
                        keep_alive,
                    }
                }

                ConnectionState::Writing {
                    mut writer,
                    keep_alive,
                } => {
                    writer.write_to_stream(&mut self.stream).await?;
                    if keep_alive {
                        ConnectionState::Reading
                    } else {
                        ConnectionState::Closed
                    }
                }

                ConnectionState::Closed => return Ok(()),
            };
        }
    }

    /// Buffer input until one full request parses.
    ///
    /// `Ok(None)` means the client went away between requests.
    pub async fn read_request(&mut self) -> Result<Option<Request>, ParseError> {
        loop {
            match parse_http_request_limited(&self.buffer, self.proxy.max_body_bytes()) {
                Ok((request, consumed)) => {
                    self.buffer.advance(consumed);
                    self.continued = false;
                    return Ok(Some(request));
                }
                Err(ParseError::Incomplete) => {}
                Err(e) => return Err(e),
            }

            if !self.continued && awaits_continue(&self.buffer) {
                self.continued = true;
                if let Err(e) = self.stream.write_all(CONTINUE).await {
                    tracing::debug!(error = %e, "Client write failed");
                    return Ok(None);
                }
            }

            match self.stream.read_buf(&mut self.buffer).await {
                Ok(0) => return Ok(None),
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "Client read failed");
                    return Ok(None);
                }
            }
        }
    }

    fn error_response(error: &ParseError) -> Response {
        match error {
            ParseError::UnsupportedTransferEncoding => Response::text(
                StatusCode::NotImplemented,
                "501 Not Implemented\r\n\r\nChunked request bodies are not supported.",
            ),
            ParseError::HeadersTooLarge => Response::text(
                StatusCode::HeadersTooLarge,
                "431 Request Header Fields Too Large",
            ),
            ParseError::BodyTooLarge => {
                Response::text(StatusCode::PayloadTooLarge, "413 Payload Too Large")
            }
            ParseError::UnsupportedExpectation => {
                Response::text(StatusCode::ExpectationFailed, "417 Expectation Failed")
            }
            _ => Response::bad_request(),
        }
    }
}
