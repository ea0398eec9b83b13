//! Process runtime
//!
//! The runtime owns a table of named backend processes and launches, stops
//! and forgets them on request. [`LocalRuntime`] runs them as child processes
//! of this one.

pub mod local;
pub mod state;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{ConfigError, RuntimeError};

pub use local::LocalRuntime;
pub use state::ProcessState;

/// Where a backend's standard output goes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Output {
    /// Inherit this process's stdout
    #[default]
    Stdout,
    /// Discard
    Null,
    /// Append to a file, created if missing
    File(PathBuf),
}

impl FromStr for Output {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdout" => Ok(Output::Stdout),
            "null" => Ok(Output::Null),
            "" => Err(ConfigError::InvalidOutput(s.to_string())),
            path => Ok(Output::File(PathBuf::from(path))),
        }
    }
}

impl TryFrom<String> for Output {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Stdout => f.write_str("stdout"),
            Output::Null => f.write_str("null"),
            Output::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A backend process as handed to the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub name: String,
    /// Program followed by its arguments
    pub command: Vec<String>,
    pub output: Output,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command,
            output: Output::default(),
        }
    }

    pub fn with_output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    pub fn args(&self) -> &[String] {
        self.command.get(1..).unwrap_or_default()
    }
}

/// Creates, starts and tears down named backend processes.
///
/// Every call is async so that stopping a backend can wait for it to exit
/// without holding up the executor.
#[async_trait]
pub trait Runtime: Send + Sync + 'static {
    /// Record a process under `descriptor.name` without launching it.
    async fn create(&self, descriptor: &ServiceDescriptor) -> Result<(), RuntimeError>;

    /// Launch every recorded process that is not running yet.
    async fn start(&self) -> Result<(), RuntimeError>;

    /// Terminate the named process and forget it.
    async fn delete(&self, name: &str) -> Result<(), RuntimeError>;

    /// Terminate anything still running and refuse further work.
    async fn stop(&self) -> Result<(), RuntimeError>;
}

#[async_trait]
impl<R: Runtime + ?Sized> Runtime for Arc<R> {
    async fn create(&self, descriptor: &ServiceDescriptor) -> Result<(), RuntimeError> {
        (**self).create(descriptor).await
    }

    async fn start(&self) -> Result<(), RuntimeError> {
        (**self).start().await
    }

    async fn delete(&self, name: &str) -> Result<(), RuntimeError> {
        (**self).delete(name).await
    }

    async fn stop(&self) -> Result<(), RuntimeError> {
        (**self).stop().await
    }
}
