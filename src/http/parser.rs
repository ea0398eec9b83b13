use crate::http::request::{Method, Request};
use crate::http::{Headers, find_header};

/// Largest request head accepted before the request is rejected.
pub const MAX_HEADER_BYTES: usize = 64 * 1024;

/// Default bound on a request body.
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    /// Request line missing a part, not UTF-8, or not HTTP/1.x
    InvalidRequest,
    InvalidMethod,
    InvalidHeader,
    InvalidContentLength,
    /// Chunked request bodies are not forwarded
    UnsupportedTransferEncoding,
    /// An `Expect` other than `100-continue`
    UnsupportedExpectation,
    HeadersTooLarge,
    /// Declared body is over the limit
    BodyTooLarge,
    /// More bytes are needed
    Incomplete,
}

/// Parse one request from the front of `buf`.
///
/// On success returns the request and how many bytes of `buf` it used;
/// anything after that belongs to the next request. Bodies are capped at
/// [`MAX_BODY_BYTES`].
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    parse_http_request_limited(buf, MAX_BODY_BYTES)
}

/// [`parse_http_request`] with an explicit body limit.
///
/// A declared length over `max_body` is refused as soon as the head is in,
/// before any of the body is buffered.
pub fn parse_http_request_limited(
    buf: &[u8],
    max_body: usize,
) -> Result<(Request, usize), ParseError> {
    let head_end = match find_headers_end(buf) {
        Some(end) => end,
        None if buf.len() > MAX_HEADER_BYTES => return Err(ParseError::HeadersTooLarge),
        None => return Err(ParseError::Incomplete),
    };
    let body_start = head_end + HEAD_TERMINATOR.len();

    let head = std::str::from_utf8(&buf[..head_end]).map_err(|_| ParseError::InvalidRequest)?;
    let (method, path, version, headers) = parse_head(head)?;

    let body_len = body_length(&headers)?;
    if body_len > max_body {
        return Err(ParseError::BodyTooLarge);
    }
    let body_end = body_start
        .checked_add(body_len)
        .ok_or(ParseError::InvalidContentLength)?;
    let body = buf
        .get(body_start..body_end)
        .ok_or(ParseError::Incomplete)?
        .to_vec();

    let request = Request {
        method,
        path: path.to_string(),
        version: version.to_string(),
        headers,
        body,
    };
    Ok((request, body_end))
}

type Head<'a> = (Method, &'a str, &'a str, Headers);

fn parse_head(head: &str) -> Result<Head<'_>, ParseError> {
    let mut lines = head.split("\r\n");

    let mut request_line = lines
        .next()
        .ok_or(ParseError::InvalidRequest)?
        .split_whitespace();
    let (Some(method), Some(path), Some(version)) =
        (request_line.next(), request_line.next(), request_line.next())
    else {
        return Err(ParseError::InvalidRequest);
    };

    if !version.starts_with("HTTP/1.") {
        return Err(ParseError::InvalidRequest);
    }
    let method = Method::parse(method).ok_or(ParseError::InvalidMethod)?;

    let headers = lines
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.split_once(':')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .ok_or(ParseError::InvalidHeader)
        })
        .collect::<Result<Headers, _>>()?;

    if find_header(&headers, "Expect").is_some_and(|v| !v.eq_ignore_ascii_case("100-continue")) {
        return Err(ParseError::UnsupportedExpectation);
    }

    Ok((method, path, version, headers))
}

/// Body length declared by the headers; chunked bodies are refused.
fn body_length(headers: &[(String, String)]) -> Result<usize, ParseError> {
    let mut content_length = None;
    for (key, value) in headers {
        if key.eq_ignore_ascii_case("Transfer-Encoding") {
            return Err(ParseError::UnsupportedTransferEncoding);
        }
        if key.eq_ignore_ascii_case("Content-Length") {
            content_length = Some(value);
        }
    }

    content_length.map_or(Ok(0), |v| {
        v.parse::<usize>()
            .map_err(|_| ParseError::InvalidContentLength)
    })
}

/// Whether `buf` starts with a complete head carrying
/// `Expect: 100-continue`.
pub fn awaits_continue(buf: &[u8]) -> bool {
    let Some(head_end) = find_headers_end(buf) else {
        return false;
    };
    let Ok(head) = std::str::from_utf8(&buf[..head_end]) else {
        return false;
    };
    head.split("\r\n")
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .any(|(k, v)| {
            k.trim().eq_ignore_ascii_case("Expect") && v.trim().eq_ignore_ascii_case("100-continue")
        })
}

/// Offset of the blank line ending a message head.
pub(crate) fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEAD_TERMINATOR.len())
        .position(|w| w == HEAD_TERMINATOR)
}
