//! bbssh server binary.
//!
//! # Usage
//!
//! ```bash
//! ssh-keygen -t rsa -f test_rsa.key -N ""
//! cargo run -- --port 2200
//! ssh -p 2200 robey@localhost
//! ```
//!
//! Set `RUST_LOG=debug` for per-request tracing.

use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use bbssh::{Server, ServerBuilder};
use log::error;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match Args::parse(env::args().skip(1)) {
        Ok(Some(args)) => args,
        Ok(None) => {
            Args::print_help();
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("Error: {}\n", message);
            Args::print_help();
            return ExitCode::from(2);
        }
    };

    let config = match args.into_builder().build() {
        Ok(config) => config,
        Err(e) => {
            error!("*** {}", e);
            return ExitCode::FAILURE;
        }
    };

    let server = match Server::bind(config) {
        Ok(server) => server,
        Err(e) => {
            error!("*** {}", e);
            return ExitCode::FAILURE;
        }
    };

    // run() only comes back when accept fails
    if let Err(e) = server.run().await {
        error!("*** Listen/accept failed: {}", e);
    }
    ExitCode::FAILURE
}

/// Command line arguments.
#[derive(Debug, Default, PartialEq)]
struct Args {
    bind: Option<IpAddr>,
    port: Option<u16>,
    host_key: Option<PathBuf>,
    allowed_user: Option<String>,
    allowed_key: Option<PathBuf>,
    timeout: Option<u64>,
}

impl Args {
    /// Parse arguments. `Ok(None)` means `--help` was given.
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Option<Self>, String> {
        let mut parsed = Args::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let mut value = |name: &str| {
                args.next()
                    .ok_or_else(|| format!("{} needs a value", name))
            };

            match arg.as_str() {
                "--bind" | "-b" => {
                    let v = value(&arg)?;
                    parsed.bind = Some(v.parse().map_err(|_| format!("invalid address '{}'", v))?);
                }
                "--port" | "-p" => {
                    let v = value(&arg)?;
                    parsed.port = Some(v.parse().map_err(|_| format!("invalid port '{}'", v))?);
                }
                "--host-key" | "-k" => parsed.host_key = Some(PathBuf::from(value(&arg)?)),
                "--allowed-user" | "-u" => parsed.allowed_user = Some(value(&arg)?),
                "--allowed-key" | "-a" => parsed.allowed_key = Some(PathBuf::from(value(&arg)?)),
                "--timeout" | "-t" => {
                    let v = value(&arg)?;
                    parsed.timeout = Some(v.parse().map_err(|_| format!("invalid timeout '{}'", v))?);
                }
                "--help" | "-h" => return Ok(None),
                other => return Err(format!("unknown argument '{}'", other)),
            }
        }

        Ok(Some(parsed))
    }

    fn into_builder(self) -> ServerBuilder {
        let mut builder = ServerBuilder::new();
        if let Some(ip) = self.bind {
            builder = builder.bind(ip);
        }
        if let Some(port) = self.port {
            builder = builder.port(port);
        }
        if let Some(path) = self.host_key {
            builder = builder.host_key_path(path);
        }
        if let Some(user) = self.allowed_user {
            builder = builder.allowed_user(user);
        }
        if let Some(path) = self.allowed_key {
            builder = builder.allowed_key_path(path);
        }
        if let Some(secs) = self.timeout {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder
    }

    fn print_help() {
        println!("bbssh - minimal demonstration SSH server");
        println!();
        println!("Usage: bbssh [OPTIONS]");
        println!();
        println!("Options:");
        println!("  -b, --bind <ADDR>          Address to listen on (default: 0.0.0.0)");
        println!("  -p, --port <PORT>          Port to listen on (default: 2200)");
        println!("  -k, --host-key <PATH>      Host private key (default: test_rsa.key)");
        println!("  -u, --allowed-user <NAME>  User allowed to log in by key (default: robey)");
        println!("  -a, --allowed-key <PATH>   OpenSSH .pub file replacing the built-in key");
        println!("  -t, --timeout <SECS>       Wait for channel and shell request (default: 10)");
        println!("  -h, --help                 Show this help message");
    }
}
