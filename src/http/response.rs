use crate::http::{Headers, find_header};

/// Response status.
///
/// Statuses the proxy produces itself have named variants; anything else
/// relayed from an upstream is carried as [`StatusCode::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    Created,
    NoContent,
    NotModified,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    PayloadTooLarge,
    ExpectationFailed,
    /// 431 Request Header Fields Too Large
    HeadersTooLarge,
    InternalServerError,
    NotImplemented,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
    Other(u16),
}

const KNOWN_STATUSES: [(StatusCode, u16, &str); 15] = [
    (StatusCode::Ok, 200, "OK"),
    (StatusCode::Created, 201, "Created"),
    (StatusCode::NoContent, 204, "No Content"),
    (StatusCode::NotModified, 304, "Not Modified"),
    (StatusCode::BadRequest, 400, "Bad Request"),
    (StatusCode::NotFound, 404, "Not Found"),
    (StatusCode::MethodNotAllowed, 405, "Method Not Allowed"),
    (StatusCode::PayloadTooLarge, 413, "Payload Too Large"),
    (StatusCode::ExpectationFailed, 417, "Expectation Failed"),
    (StatusCode::HeadersTooLarge, 431, "Request Header Fields Too Large"),
    (StatusCode::InternalServerError, 500, "Internal Server Error"),
    (StatusCode::NotImplemented, 501, "Not Implemented"),
    (StatusCode::BadGateway, 502, "Bad Gateway"),
    (StatusCode::ServiceUnavailable, 503, "Service Unavailable"),
    (StatusCode::GatewayTimeout, 504, "Gateway Timeout"),
];

impl StatusCode {
    /// # Example
    ///
    /// ```
    /// # use svcproxy::http::response::StatusCode;
    /// assert_eq!(StatusCode::from_u16(502), StatusCode::BadGateway);
    /// assert_eq!(StatusCode::from_u16(418), StatusCode::Other(418));
    /// ```
    pub fn from_u16(code: u16) -> Self {
        KNOWN_STATUSES
            .iter()
            .find(|&&(_, known, _)| known == code)
            .map_or(StatusCode::Other(code), |&(status, _, _)| status)
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Other(code) => *code,
            named => KNOWN_STATUSES
                .iter()
                .find(|&&(status, _, _)| status == *named)
                .map_or(0, |&(_, code, _)| code),
        }
    }

    /// Standard phrase for named statuses, `Unknown` otherwise.
    pub fn reason_phrase(&self) -> &'static str {
        KNOWN_STATUSES
            .iter()
            .find(|&&(status, _, _)| status == *self)
            .map_or("Unknown", |&(_, _, phrase)| phrase)
    }

    /// 1xx, 204 and 304 responses never carry a body.
    pub fn is_bodiless(&self) -> bool {
        let code = self.as_u16();
        (100..200).contains(&code) || code == 204 || code == 304
    }
}

/// A response on its way to the client.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    /// Reason phrase relayed from the upstream's status line
    pub reason: Option<String>,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Response {
    /// A `text/plain` response.
    pub fn text(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        ResponseBuilder::new(status)
            .header("Content-Type", "text/plain")
            .body(body.into())
            .build()
    }

    pub fn bad_request() -> Self {
        Self::text(StatusCode::BadRequest, "400 Bad Request")
    }

    /// The upstream could not be reached or answered with garbage.
    pub fn bad_gateway() -> Self {
        Self::text(
            StatusCode::BadGateway,
            "502 Bad Gateway\r\n\r\nFailed to reach the upstream service.",
        )
    }

    pub fn gateway_timeout() -> Self {
        Self::text(
            StatusCode::GatewayTimeout,
            "504 Gateway Timeout\r\n\r\nThe upstream service did not respond in time.",
        )
    }

    /// Header value by name, ignoring ASCII case.
    pub fn header(&self, key: &str) -> Option<&str> {
        find_header(&self.headers, key)
    }

    /// Every value of a header that may repeat, such as `Set-Cookie`.
    pub fn header_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// The relayed reason phrase if there is one, else the standard phrase.
    pub fn reason_phrase(&self) -> &str {
        self.reason
            .as_deref()
            .unwrap_or_else(|| self.status.reason_phrase())
    }
}

/// Fluent construction of a [`Response`].
///
/// ```
/// # use svcproxy::http::response::{ResponseBuilder, StatusCode};
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(b"{}".to_vec())
///     .build();
/// assert_eq!(response.header("content-length"), Some("2"));
/// ```
#[derive(Debug)]
pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            response: Response {
                status,
                reason: None,
                headers: Headers::new(),
                body: Vec::new(),
            },
        }
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.response.reason = Some(reason.into());
        self
    }

    /// Appends a header; a repeated name adds another field.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.response.headers.push((key.into(), value.into()));
        self
    }

    /// Replaces every header set so far.
    pub fn headers(mut self, headers: Headers) -> Self {
        self.response.headers = headers;
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.response.body = body;
        self
    }

    /// Finish the response, adding `Content-Length` for the body unless the
    /// length or a transfer coding is already declared.
    pub fn build(self) -> Response {
        let mut response = self.response;
        let framed = response.header("Content-Length").is_some()
            || response.header("Transfer-Encoding").is_some();
        if !framed {
            response
                .headers
                .push(("Content-Length".to_string(), response.body.len().to_string()));
        }
        response
    }
}
