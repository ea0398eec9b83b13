//! HTTP/1.1 plumbing behind [`HttpProxy`](crate::proxy::HttpProxy).
//!
//! [`parser`] turns buffered bytes into a [`request::Request`], and
//! [`writer`] turns a [`response::Response`] back into bytes. [`connection`]
//! drives one client socket through its states:
//!
//! ```text
//! Reading ──request──▶ Processing ──forward──▶ Writing ──keep-alive──▶ Reading
//!    │                                            │
//!    └──client gone──▶ Closed ◀──────close────────┘
//! ```
//!
//! A malformed request is answered from `Reading` directly (400, 413, 417,
//! 431 or 501) and the connection closes. A client that sends
//! `Expect: 100-continue` gets the interim `100 Continue` from `Reading`
//! once its head is in and the body is still missing.

pub mod connection;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;

/// Header fields in wire order. Repeated names are kept as separate entries.
pub type Headers = Vec<(String, String)>;

/// First value of `name` in `headers`, ignoring ASCII case.
pub fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Headers that describe a single connection and are never forwarded.
pub const HOP_BY_HOP: &[&str] = &[
    "Connection",
    "Keep-Alive",
    "Proxy-Connection",
    "Upgrade",
    "TE",
    "Trailer",
];

pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}
