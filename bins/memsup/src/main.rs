use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use memsup_fixture::{wait_until_listening, FixtureConfig, LocalServerControl, PosixServerControl};

/// memsup - start and stop throwaway memcached fixtures
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (YAML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start one server per port (defaults to the configured port)
    Start {
        ports: Vec<u16>,
    },
    /// Kill servers listening on the given ports
    Stop {
        /// Command name to look for (defaults to the configured server name)
        #[arg(short, long)]
        name: Option<String>,
        #[arg(required = true)]
        ports: Vec<u16>,
    },
    /// Print the flags a server would be started with
    Params,
    /// Block until a server accepts connections
    Wait {
        port: u16,
        #[arg(long, default_value = "5000")]
        timeout_ms: u64,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    initialize_logging(args.debug)?;

    let config = FixtureConfig::load(args.config.as_deref())?;
    let control = PosixServerControl::new(config);

    match args.command {
        Command::Start { ports } => {
            let ports = if ports.is_empty() {
                vec![control.config().port]
            } else {
                ports
            };
            control.add_local_server(&ports)?;
            info!("Started {} on ports {:?}", control.config().server_name, ports);
        }
        Command::Stop { name, ports } => {
            let name = name.unwrap_or_else(|| control.config().server_name.clone());
            let report = control.remove_local_server(&name, &ports);
            for failure in &report.failures {
                warn!("{}", failure);
            }
            info!("Sent {} kill signal(s) to {}", report.signal_count(), name);
        }
        Command::Params => {
            let params = control.server_parameters();
            println!("{}", params.to_flag_string().trim_start());
        }
        Command::Wait { port, timeout_ms } => {
            let addr = (control.config().ipv4_addr.as_str(), port);
            wait_until_listening(addr, Duration::from_millis(timeout_ms))?;
            info!("Port {} is accepting connections", port);
        }
    }

    Ok(())
}

fn initialize_logging(debug: bool) -> Result<()> {
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
