//! svcproxy - run a service that proxies to a local backend
//!
//! The endpoint's scheme picks the proxy protocol (gRPC, HTTP or a plain TCP
//! relay), an optional backend command is started and supervised for the
//! lifetime of the service, and a router binds the proxy into the server.

pub mod cli;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod proxy;
pub mod router;
pub mod runtime;
pub mod server;
pub mod service;
pub mod supervisor;

pub use config::ServiceConfig;
pub use error::BootstrapError;
pub use service::Service;
