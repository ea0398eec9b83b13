//! Command-line arguments for the `svcproxy` binary.
//!
//! Kept out of `main.rs` so tests can build them with `Cli::try_parse_from`.

use std::path::PathBuf;

use clap::Parser;

/// Run a service that proxies to a local backend, optionally starting it.
#[derive(Parser, Debug, Default)]
#[command(name = "svcproxy", version)]
pub struct Cli {
    /// Name of the service
    #[arg(long, env = "SERVICE_NAME")]
    pub name: Option<String>,

    /// Address of the service
    #[arg(long, env = "SERVICE_ADDRESS")]
    pub address: Option<String>,

    /// The local service endpoint. Defaults to localhost:9090
    #[arg(long, env = "SERVICE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// YAML config file; flags and environment override its values
    #[arg(long, env = "SERVICE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Where the backend's stdout goes: stdout, null or a file path
    #[arg(long, env = "SERVICE_OUTPUT")]
    pub output: Option<String>,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Backend command and arguments to run alongside the proxy
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}
