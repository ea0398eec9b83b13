//! Service configuration
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! command-line flags and environment variables. Empty values never override.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cli::Cli;
use crate::endpoint;
use crate::error::ConfigError;
use crate::http::parser::MAX_BODY_BYTES;
use crate::proxy::ProxyOptions;
use crate::runtime::{Output, ServiceDescriptor};

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Service name; also the backend's name in the runtime
    pub name: String,
    /// Listen address; `:port` means all interfaces
    pub address: String,
    /// Upstream endpoint; empty means [`endpoint::DEFAULT_ENDPOINT`]
    pub endpoint: String,
    /// Backend program and arguments; empty means no backend is supervised
    pub command: Vec<String>,
    pub output: Output,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub stop_timeout_secs: u64,
    /// Largest request body the HTTP proxy accepts
    pub max_body_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            address: DEFAULT_ADDRESS.to_string(),
            endpoint: String::new(),
            command: Vec::new(),
            output: Output::Stdout,
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
            stop_timeout_secs: 10,
            max_body_bytes: MAX_BODY_BYTES,
        }
    }
}

impl ServiceConfig {
    /// Build the configuration from parsed command-line arguments.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut cfg = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(name) = non_empty(&cli.name) {
            cfg.name = name.to_string();
        }
        if let Some(address) = non_empty(&cli.address) {
            cfg.address = address.to_string();
        }
        if let Some(endpoint) = non_empty(&cli.endpoint) {
            cfg.endpoint = endpoint.to_string();
        }
        if let Some(output) = non_empty(&cli.output) {
            cfg.output = output.parse()?;
        }
        if !cli.command.is_empty() {
            cfg.command = cli.command.clone();
        }

        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: PathBuf::from(path),
            source,
        })?;
        Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: PathBuf::from(path),
            source,
        })
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// The endpoint with the default substituted when empty.
    pub fn endpoint(&self) -> &str {
        endpoint::normalize(&self.endpoint)
    }

    /// The listen address, with `:port` expanded to all interfaces.
    pub fn address(&self) -> String {
        if self.address.is_empty() {
            DEFAULT_ADDRESS.to_string()
        } else if self.address.starts_with(':') {
            format!("0.0.0.0{}", self.address)
        } else {
            self.address.clone()
        }
    }

    pub fn proxy_options(&self) -> ProxyOptions {
        ProxyOptions::new(self.endpoint())
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_max_body_bytes(self.max_body_bytes)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    /// The backend to supervise, if a command was given.
    ///
    /// Without a service name the backend is registered under its program's
    /// file name.
    pub fn descriptor(&self) -> Option<ServiceDescriptor> {
        let program = self.command.first()?;
        let name = if self.name.is_empty() {
            Path::new(program)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| program.clone())
        } else {
            self.name.clone()
        };

        Some(ServiceDescriptor::new(name, self.command.clone()).with_output(self.output.clone()))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
