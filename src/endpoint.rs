//! Endpoint classification and upstream target parsing
//!
//! An endpoint is the upstream the proxy forwards to. Its leading scheme
//! token selects the proxy protocol; the rest names the host and port.

use std::fmt;
use std::net::Ipv6Addr;

use crate::error::ProxyError;

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "localhost:9090";

/// Proxy protocol selected for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyTag {
    /// gRPC over cleartext HTTP/2
    Grpc,
    /// HTTP/1.1
    Http,
    /// Opaque TCP relay
    Generic,
}

impl ProxyTag {
    /// Classify an endpoint by its literal, case-sensitive prefix.
    ///
    /// `grpc` is checked before `http`; anything else is [`ProxyTag::Generic`].
    ///
    /// # Example
    ///
    /// ```
    /// # use svcproxy::endpoint::ProxyTag;
    /// assert_eq!(ProxyTag::resolve("grpcs://x:1"), ProxyTag::Grpc);
    /// assert_eq!(ProxyTag::resolve("https://x:1"), ProxyTag::Http);
    /// assert_eq!(ProxyTag::resolve("x:1"), ProxyTag::Generic);
    /// ```
    pub fn resolve(endpoint: &str) -> Self {
        if endpoint.starts_with("grpc") {
            ProxyTag::Grpc
        } else if endpoint.starts_with("http") {
            ProxyTag::Http
        } else {
            ProxyTag::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyTag::Grpc => "grpc",
            ProxyTag::Http => "http",
            ProxyTag::Generic => "generic",
        }
    }
}

impl fmt::Display for ProxyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Substitute [`DEFAULT_ENDPOINT`] for an empty endpoint.
pub fn normalize(endpoint: &str) -> &str {
    if endpoint.is_empty() {
        DEFAULT_ENDPOINT
    } else {
        endpoint
    }
}

/// Upstream connection target parsed from an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Scheme token, if the endpoint carried `scheme://`
    pub scheme: Option<String>,
    /// Host name or address (IPv6 literals keep their brackets)
    pub host: String,
    pub port: u16,
    /// Path prefix for HTTP forwarding, without a trailing slash
    pub path: String,
}

impl Target {
    /// Parse `scheme://host:port/path` or a bare `host:port`.
    ///
    /// TLS schemes are rejected since the proxies only originate cleartext
    /// connections. An empty host (`:9090`) means the loopback address.
    /// IPv6 literals must be bracketed (`[::1]:9090`); without brackets the
    /// port cannot be told apart from the address.
    pub fn parse(endpoint: &str) -> Result<Self, ProxyError> {
        let invalid = |reason: &str| ProxyError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        };

        if !endpoint.contains("://") {
            let (host, port) = endpoint
                .rsplit_once(':')
                .ok_or_else(|| invalid("expected host:port"))?;
            let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;
            let host = if host.is_empty() { "127.0.0.1" } else { host };

            if let Some(literal) = host.strip_prefix('[') {
                literal
                    .strip_suffix(']')
                    .and_then(|addr| addr.parse::<Ipv6Addr>().ok())
                    .ok_or_else(|| invalid("invalid IPv6 literal"))?;
            } else if host.contains(':') {
                return Err(invalid("IPv6 addresses must be bracketed, e.g. [::1]:9090"));
            }

            return Ok(Self {
                scheme: None,
                host: host.to_string(),
                port,
                path: String::new(),
            });
        }

        let url = url::Url::parse(endpoint).map_err(|e| invalid(&e.to_string()))?;

        if matches!(url.scheme(), "https" | "grpcs") {
            return Err(ProxyError::UnsupportedScheme {
                scheme: url.scheme().to_string(),
            });
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host"))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| invalid("missing port"))?;

        Ok(Self {
            scheme: Some(url.scheme().to_string()),
            host: host.to_string(),
            port,
            path: url.path().trim_end_matches('/').to_string(),
        })
    }

    /// `host:port` suitable for connecting and for the `Host` header.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scheme {
            Some(scheme) => write!(f, "{}://{}{}", scheme, self.authority(), self.path),
            None => f.write_str(&self.authority()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_endpoint_becomes_default() {
        assert_eq!(normalize(""), DEFAULT_ENDPOINT);
        assert_eq!(normalize("grpc://a:1"), "grpc://a:1");
    }

    #[test]
    fn ipv6_hosts_keep_brackets() {
        let bare = Target::parse("[::1]:9090").unwrap();
        let url = Target::parse("http://[::1]:8080/api").unwrap();

        assert_eq!(bare.authority(), "[::1]:9090");
        assert_eq!(url.authority(), "[::1]:8080");
        assert_eq!(url.path, "/api");
    }

    #[test]
    fn grpc_is_checked_before_http() {
        assert_eq!(ProxyTag::resolve("grpc+http://a:1"), ProxyTag::Grpc);
        assert_eq!(ProxyTag::resolve("httpgrpc://a:1"), ProxyTag::Http);
    }
}
