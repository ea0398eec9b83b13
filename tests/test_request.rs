use svcproxy::http::request::{Method, Request, RequestBuilder};

fn get(version: &str, headers: &[(&str, &str)]) -> Request {
    headers
        .iter()
        .fold(
            RequestBuilder::new().method(Method::GET).path("/").version(version),
            |builder, (k, v)| builder.header(*k, *v),
        )
        .build()
        .unwrap()
}

#[test]
fn test_request_header_lookup_ignores_case() {
    let req = get("HTTP/1.1", &[("X-Request-Id", "abc"), ("Host", "svc")]);

    assert_eq!(req.header("x-request-id"), Some("abc"));
    assert_eq!(req.header("HOST"), Some("svc"));
    assert_eq!(req.header("Missing"), None);
}

#[test]
fn test_request_content_length() {
    assert_eq!(get("HTTP/1.1", &[("Content-Length", "42")]).content_length(), 42);
    assert_eq!(get("HTTP/1.1", &[]).content_length(), 0);
    assert_eq!(get("HTTP/1.1", &[("Content-Length", "lots")]).content_length(), 0);
}

#[test]
fn test_request_keep_alive_defaults_by_version() {
    assert!(get("HTTP/1.1", &[]).keep_alive());
    assert!(!get("HTTP/1.0", &[]).keep_alive());
}

#[test]
fn test_request_connection_header_overrides_version() {
    assert!(!get("HTTP/1.1", &[("Connection", "close")]).keep_alive());
    assert!(!get("HTTP/1.1", &[("connection", "CLOSE")]).keep_alive());
    assert!(get("HTTP/1.0", &[("Connection", "Keep-Alive")]).keep_alive());
}

#[test]
fn test_request_target_defaults_to_root() {
    let empty = RequestBuilder::new().method(Method::GET).path("").build().unwrap();
    let query = RequestBuilder::new().method(Method::GET).path("/a?b=c").build().unwrap();

    assert_eq!(empty.target(), "/");
    assert_eq!(query.target(), "/a?b=c");
}

#[test]
fn test_request_end_to_end_headers_skip_host_and_hop_by_hop() {
    let req = get(
        "HTTP/1.1",
        &[
            ("Host", "public"),
            ("Connection", "keep-alive"),
            ("te", "trailers"),
            ("Proxy-Connection", "keep-alive"),
            ("Accept", "*/*"),
        ],
    );

    let forwarded: Vec<_> = req.end_to_end_headers().collect();
    assert_eq!(forwarded, vec![("Accept", "*/*")]);
}

#[test]
fn test_request_builder_requires_method_and_path() {
    assert_eq!(
        RequestBuilder::new().path("/").build().unwrap_err(),
        "method missing"
    );
    assert_eq!(
        RequestBuilder::new().method(Method::GET).build().unwrap_err(),
        "path missing"
    );
}

#[test]
fn test_method_names_are_case_sensitive() {
    assert_eq!(Method::parse("POST"), Some(Method::POST));
    assert_eq!(Method::parse("post"), None);
    assert_eq!(Method::parse("BREW"), None);
}

#[test]
fn test_method_name_round_trip() {
    for method in [Method::GET, Method::PUT, Method::DELETE, Method::HEAD, Method::OPTIONS] {
        assert_eq!(Method::parse(method.as_str()), Some(method));
        assert_eq!(method.to_string(), method.as_str());
    }
}

#[test]
fn test_request_end_to_end_headers_keep_repeats_and_drop_expect() {
    let req = get(
        "HTTP/1.1",
        &[
            ("Via", "1.1 edge"),
            ("Expect", "100-continue"),
            ("Via", "1.1 mid"),
        ],
    );

    let forwarded: Vec<_> = req.end_to_end_headers().collect();
    assert_eq!(forwarded, vec![("Via", "1.1 edge"), ("Via", "1.1 mid")]);
}
