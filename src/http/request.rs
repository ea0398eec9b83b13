use std::fmt;

use crate::http::{Headers, find_header, is_hop_by_hop};

/// Request methods the proxy accepts from clients.
///
/// The proxy never answers a method itself; every one is forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    HEAD,
    OPTIONS,
    PATCH,
    TRACE,
}

const METHOD_NAMES: [(Method, &str); 8] = [
    (Method::GET, "GET"),
    (Method::POST, "POST"),
    (Method::PUT, "PUT"),
    (Method::DELETE, "DELETE"),
    (Method::HEAD, "HEAD"),
    (Method::OPTIONS, "OPTIONS"),
    (Method::PATCH, "PATCH"),
    (Method::TRACE, "TRACE"),
];

impl Method {
    /// Look up a method by its exact (case-sensitive) name.
    ///
    /// # Example
    ///
    /// ```
    /// # use svcproxy::http::request::Method;
    /// assert_eq!(Method::parse("GET"), Some(Method::GET));
    /// assert_eq!(Method::parse("get"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        METHOD_NAMES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(method, _)| *method)
    }

    pub fn as_str(&self) -> &'static str {
        METHOD_NAMES
            .iter()
            .find(|(method, _)| *method == *self)
            .map_or("", |&(_, name)| name)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A client request, as read off the inbound connection.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Request target as sent, e.g. `/items?page=2`
    pub path: String,
    pub version: String,
    /// Header names keep the client's casing; use [`Request::header`] to look up
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Request {
    /// Header value by name, ignoring ASCII case.
    pub fn header(&self, key: &str) -> Option<&str> {
        find_header(&self.headers, key)
    }

    /// Declared body length; 0 when absent or unparseable.
    pub fn content_length(&self) -> usize {
        self.header("Content-Length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// Whether the client expects the connection to stay open.
    ///
    /// An explicit `Connection` header wins; otherwise HTTP/1.0 closes and
    /// later versions persist.
    pub fn keep_alive(&self) -> bool {
        match self.header("Connection") {
            Some(v) if v.eq_ignore_ascii_case("close") => false,
            Some(v) if v.eq_ignore_ascii_case("keep-alive") => true,
            _ => self.version != "HTTP/1.0",
        }
    }

    /// The request target, `/` if the client sent none.
    pub fn target(&self) -> &str {
        if self.path.is_empty() { "/" } else { &self.path }
    }

    /// Headers that travel past this hop, in the order received.
    ///
    /// `Host` and the hop-by-hop set are dropped, and so is `Expect`: the
    /// proxy answers `100-continue` itself.
    pub fn end_to_end_headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .filter(|(k, _)| {
                !k.eq_ignore_ascii_case("Host")
                    && !k.eq_ignore_ascii_case("Expect")
                    && !is_hop_by_hop(k)
            })
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Fluent construction of a [`Request`]; method and path are required.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    version: Option<String>,
    headers: Headers,
    body: Vec<u8>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(self, method: Method) -> Self {
        Self {
            method: Some(method),
            ..self
        }
    }

    pub fn path(self, path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..self
        }
    }

    /// Defaults to `HTTP/1.1`.
    pub fn version(self, version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            ..self
        }
    }

    /// Appends a header; a repeated name adds another field.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn body(self, body: Vec<u8>) -> Self {
        Self { body, ..self }
    }

    pub fn build(self) -> Result<Request, &'static str> {
        let method = self.method.ok_or("method missing")?;
        let path = self.path.ok_or("path missing")?;

        Ok(Request {
            method,
            path,
            version: self.version.unwrap_or_else(|| "HTTP/1.1".to_string()),
            headers: self.headers,
            body: self.body,
        })
    }
}
