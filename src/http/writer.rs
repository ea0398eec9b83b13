use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::Response;

/// Encode `resp` as an HTTP/1.1 message: status line, headers, blank line, body.
pub fn serialize_response(resp: &Response) -> Bytes {
    let head_len: usize = resp.headers.iter().map(|(k, v)| k.len() + v.len() + 4).sum();
    let mut buf = BytesMut::with_capacity(32 + head_len + resp.body.len());

    buf.put_slice(
        format!("HTTP/1.1 {} {}\r\n", resp.status.as_u16(), resp.reason_phrase()).as_bytes(),
    );
    for (key, value) in &resp.headers {
        buf.put_slice(key.as_bytes());
        buf.put_slice(b": ");
        buf.put_slice(value.as_bytes());
        buf.put_slice(b"\r\n");
    }
    buf.put_slice(b"\r\n");
    buf.put_slice(&resp.body);

    buf.freeze()
}

/// A serialized response waiting to go out on a client connection.
pub struct ResponseWriter {
    pending: Bytes,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self {
            pending: serialize_response(response),
        }
    }

    /// Bytes not yet written.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        stream.write_all_buf(&mut self.pending).await?;
        stream.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::{ResponseBuilder, StatusCode};

    #[test]
    fn status_line_headers_then_body() {
        let response = ResponseBuilder::new(StatusCode::NotFound)
            .body(b"gone".to_vec())
            .build();

        let bytes = serialize_response(&response);

        assert!(bytes.starts_with(b"HTTP/1.1 404 Not Found\r\n"));
        assert!(bytes.ends_with(b"Content-Length: 4\r\n\r\ngone"));
    }

    #[test]
    fn every_repeated_header_is_written() {
        let response = ResponseBuilder::new(StatusCode::Ok)
            .header("Set-Cookie", "a=1")
            .header("Set-Cookie", "b=2")
            .build();

        let bytes = serialize_response(&response);

        assert!(bytes.starts_with(b"HTTP/1.1 200 OK\r\nSet-Cookie: a=1\r\nSet-Cookie: b=2\r\n"));
    }

    #[tokio::test]
    async fn writes_everything_to_the_stream() {
        let response = ResponseBuilder::new(StatusCode::Ok).body(b"ok".to_vec()).build();
        let mut writer = ResponseWriter::new(&response);
        let mut out = Vec::new();

        writer.write_to_stream(&mut out).await.unwrap();

        assert_eq!(writer.remaining(), 0);
        assert_eq!(Bytes::from(out), serialize_response(&response));
    }
}
