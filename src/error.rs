//! Error types for each stage of the bootstrap.
//!
//! Construction and launch failures are fatal to the whole service; per
//! connection forwarding failures are only logged by the server.

use std::path::PathBuf;

use crate::runtime::ProcessState;

/// Errors raised while loading the service configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for a service config.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The backend output sink is not one of `stdout`, `null` or a path.
    #[error("invalid output sink: {0:?}")]
    InvalidOutput(String),
}

/// Errors raised by the protocol proxies.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The endpoint could not be turned into an upstream target.
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// The endpoint names a scheme the proxies cannot originate.
    #[error("unsupported endpoint scheme {scheme:?}")]
    UnsupportedScheme { scheme: String },

    /// Connecting to the upstream failed.
    #[error("failed to connect to upstream {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// The upstream did not accept the connection in time.
    #[error("connection timeout to upstream {target}")]
    ConnectTimeout { target: String },

    /// The upstream did not answer within the request timeout.
    #[error("request timeout to upstream {target}")]
    RequestTimeout { target: String },

    /// The client did not speak the protocol the proxy expects.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised by a process runtime.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("service {name:?} is already registered")]
    AlreadyRegistered { name: String },

    #[error("service {name:?} is not registered")]
    NotFound { name: String },

    #[error("service {name:?} has an empty command")]
    EmptyCommand { name: String },

    /// The backend executable could not be launched.
    #[error("failed to launch service {name:?} ({program}): {source}")]
    Launch {
        name: String,
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The output file for the backend could not be opened.
    #[error("failed to open output {path} for service {name:?}: {source}")]
    Output {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Terminating the backend failed.
    #[error("failed to stop service {name:?}: {source}")]
    Terminate {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The runtime has been stopped and accepts no more work.
    #[error("runtime is stopped")]
    Stopped,

    /// A supervisor call arrived out of order.
    #[error("service {name:?} cannot move from {from} to {to}")]
    InvalidTransition {
        name: String,
        from: ProcessState,
        to: ProcessState,
    },
}

/// Errors raised by the server.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// `run` was called before a router was installed.
    #[error("no router installed")]
    NoRouter,

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors returned by [`Service::run`](crate::service::Service::run).
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("proxy construction failed: {0}")]
    Proxy(#[from] ProxyError),

    #[error("backend launch failed: {0}")]
    Launch(#[from] RuntimeError),

    #[error("server failed: {0}")]
    Serve(#[from] ServeError),
}
