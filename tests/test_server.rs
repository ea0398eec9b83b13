//! Tests for the server and router

use std::sync::Arc;
use std::time::Duration;

use svcproxy::endpoint::ProxyTag;
use svcproxy::error::ServeError;
use svcproxy::proxy::{Proxy, ProxyOptions};
use svcproxy::router::Router;
use svcproxy::server::Server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

fn generic_router(endpoint: &str) -> Router {
    let proxy = Proxy::new(ProxyTag::Generic, &ProxyOptions::new(endpoint)).unwrap();
    Router::new("svc", Arc::new(proxy))
}

#[tokio::test]
async fn test_run_without_router_fails_before_binding() {
    // an address that could never bind proves nothing was attempted
    let mut server = Server::new("256.0.0.1:80");
    let (tx, rx) = oneshot::channel();
    server.notify_ready(tx);

    assert!(!server.has_router());
    let result = server.run(std::future::pending()).await;

    assert!(matches!(result, Err(ServeError::NoRouter)));
    assert!(rx.await.is_err());
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = taken.local_addr().unwrap().to_string();

    let mut server = Server::new(address.clone());
    server.init(generic_router("127.0.0.1:1"));

    match server.run(std::future::pending()).await {
        Err(ServeError::Bind { address: reported, .. }) => assert_eq!(reported, address),
        other => panic!("expected bind error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_router_relays_through_server_until_shutdown() {
    let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream_addr = upstream.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let (mut socket, _) = upstream.accept().await.unwrap();
        let mut buf = [0u8; 4];
        socket.read_exact(&mut buf).await.unwrap();
        buf.reverse();
        socket.write_all(&buf).await.unwrap();
    });

    let mut server = Server::new("127.0.0.1:0");
    server.init(generic_router(&upstream_addr));
    assert!(server.has_router());

    let (ready_tx, ready_rx) = oneshot::channel();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    server.notify_ready(ready_tx);

    let handle = tokio::spawn(server.run(async {
        let _ = stop_rx.await;
    }));

    let addr = ready_rx.await.unwrap();
    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(b"abcd").await.unwrap();
    let mut buf = [0u8; 4];
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"dcba");

    stop_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[test]
fn test_router_exposes_name_and_proxy() {
    let router = generic_router("127.0.0.1:9090");

    assert_eq!(router.name(), "svc");
    assert_eq!(router.proxy().tag(), ProxyTag::Generic);
    assert_eq!(router.proxy().target().authority(), "127.0.0.1:9090");
}
