use svcproxy::http::parser::{
    MAX_HEADER_BYTES, ParseError, parse_http_request, parse_http_request_limited,
};
use svcproxy::http::request::Method;

#[test]
fn test_parse_get_request() {
    let req = b"GET /search?q=rust HTTP/1.1\r\nHost: example.com\r\nAccept: */*\r\n\r\n";
    let (parsed, consumed) = parse_http_request(req).unwrap();

    assert_eq!(parsed.method, Method::GET);
    assert_eq!(parsed.path, "/search?q=rust");
    assert_eq!(parsed.version, "HTTP/1.1");
    assert_eq!(parsed.header("host"), Some("example.com"));
    assert_eq!(parsed.header("Accept"), Some("*/*"));
    assert!(parsed.body.is_empty());
    assert_eq!(consumed, req.len());
}

#[test]
fn test_parse_post_with_binary_body() {
    let req = b"POST /upload HTTP/1.1\r\ncontent-length: 4\r\n\r\n\x00\x01\x02\x03";
    let (parsed, consumed) = parse_http_request(req).unwrap();

    assert_eq!(parsed.method, Method::POST);
    assert_eq!(parsed.body, vec![0, 1, 2, 3]);
    assert_eq!(consumed, req.len());
}

#[test]
fn test_parse_waits_for_complete_head_and_body() {
    assert_eq!(
        parse_http_request(b"GET / HTTP/1.1\r\nHost: example.com\r\n").unwrap_err(),
        ParseError::Incomplete
    );
    assert_eq!(
        parse_http_request(b"POST /api HTTP/1.1\r\nContent-Length: 10\r\n\r\nhello").unwrap_err(),
        ParseError::Incomplete
    );
}

#[test]
fn test_parse_rejects_unknown_method() {
    assert_eq!(
        parse_http_request(b"BREW /pot HTTP/1.1\r\n\r\n").unwrap_err(),
        ParseError::InvalidMethod
    );
}

#[test]
fn test_parse_rejects_header_without_colon() {
    assert_eq!(
        parse_http_request(b"GET / HTTP/1.1\r\nBrokenHeader\r\n\r\n").unwrap_err(),
        ParseError::InvalidHeader
    );
}

#[test]
fn test_parse_rejects_bad_content_length() {
    assert_eq!(
        parse_http_request(b"POST / HTTP/1.1\r\nContent-Length: ten\r\n\r\n").unwrap_err(),
        ParseError::InvalidContentLength
    );
}

#[test]
fn test_parse_rejects_chunked_body() {
    let req = b"POST /api HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n";

    assert_eq!(
        parse_http_request(req).unwrap_err(),
        ParseError::UnsupportedTransferEncoding
    );
}

#[test]
fn test_parse_rejects_non_http1_version() {
    for req in [&b"GET / SPDY/3\r\n\r\n"[..], b"GET / HTTP/2.0\r\n\r\n", b"GET /\r\n\r\n"] {
        assert_eq!(parse_http_request(req).unwrap_err(), ParseError::InvalidRequest);
    }
}

#[test]
fn test_parse_rejects_oversized_head() {
    let mut req = b"GET / HTTP/1.1\r\nX-Filler: ".to_vec();
    req.resize(MAX_HEADER_BYTES + 1, b'a');

    assert_eq!(parse_http_request(&req).unwrap_err(), ParseError::HeadersTooLarge);
}

#[test]
fn test_parse_leaves_pipelined_bytes() {
    let req = b"GET /a HTTP/1.1\r\n\r\nPUT /b HTTP/1.1\r\nContent-Length: 2\r\n\r\nokEXTRA";
    let (first, consumed) = parse_http_request(req).unwrap();
    let rest = &req[consumed..];
    let (second, consumed) = parse_http_request(rest).unwrap();

    assert_eq!(first.path, "/a");
    assert_eq!(second.method, Method::PUT);
    assert_eq!(second.body, b"ok".to_vec());
    assert_eq!(&rest[consumed..], b"EXTRA");
}

#[test]
fn test_parse_refuses_body_over_limit_before_it_arrives() {
    let req = b"POST / HTTP/1.1\r\nContent-Length: 99999999999\r\n\r\nab";

    assert_eq!(parse_http_request(req).unwrap_err(), ParseError::BodyTooLarge);
}

#[test]
fn test_parse_limit_is_inclusive() {
    let req = b"POST / HTTP/1.1\r\nContent-Length: 4\r\n\r\nabcd";

    assert!(parse_http_request_limited(req, 4).is_ok());
    assert_eq!(
        parse_http_request_limited(req, 3).unwrap_err(),
        ParseError::BodyTooLarge
    );
}

#[test]
fn test_parse_keeps_repeated_headers_in_order() {
    let req = b"GET / HTTP/1.1\r\nAccept: text/html\r\nX-Tag: a\r\nx-tag: b\r\n\r\n";
    let (parsed, _) = parse_http_request(req).unwrap();

    let tags: Vec<_> = parsed
        .headers
        .iter()
        .filter(|(k, _)| k.eq_ignore_ascii_case("X-Tag"))
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(tags, vec!["a", "b"]);
    assert_eq!(parsed.headers[0].0, "Accept");
}

#[test]
fn test_parse_expectations() {
    let continued = b"PUT / HTTP/1.1\r\nExpect: 100-continue\r\nContent-Length: 2\r\n\r\nok";
    let unknown = b"PUT / HTTP/1.1\r\nExpect: teapot\r\n\r\n";

    assert!(parse_http_request(continued).is_ok());
    assert_eq!(
        parse_http_request(unknown).unwrap_err(),
        ParseError::UnsupportedExpectation
    );
}
