//! Stand-in for memcached in end-to-end tests.
//!
//! Accepts the memcached flags the supervisor passes (`-p`, `-m`, `-o`, `-Z`),
//! listens on the port, and can be told to emit the kinds of startup
//! diagnostics a real server prints.

use clap::{ArgAction, Parser, ValueEnum};
use std::io::Write;
use std::net::TcpListener;
use std::path::Path;
use std::process;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "fakecached")]
#[command(about = "Stand-in memcached for fixture supervisor tests", long_about = None)]
struct Args {
    /// TCP port to listen on
    #[arg(short = 'p', default_value = "11211")]
    port: u16,

    /// Memory limit in megabytes (accepted, unused)
    #[arg(short = 'm', default_value = "64")]
    memory_limit: u32,

    /// Extended options; with -Z, "<chain>,<key>" names the TLS files
    #[arg(short = 'o', action = ArgAction::Append)]
    options: Vec<String>,

    /// Enable TLS
    #[arg(short = 'Z')]
    tls: bool,

    /// Startup diagnostics to emit
    #[arg(long, value_enum, default_value = "silent")]
    scenario: Scenario,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Scenario {
    /// Nothing on stderr
    Silent,
    /// A settings warning, then normal operation
    Warning,
    /// Crash right after start
    Segv,
}

fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stdout)
        .init();

    let args = Args::parse();
    info!("Starting fakecached with args: {:?}", args);

    if args.tls {
        check_tls_files(&args.options);
    }

    match args.scenario {
        Scenario::Silent => {}
        Scenario::Warning => diagnostic("WARNING: slab class too small, raising to 48 bytes"),
        Scenario::Segv => {
            diagnostic("Segmentation fault");
            process::exit(139);
        }
    }

    let listener = match TcpListener::bind(("127.0.0.1", args.port)) {
        Ok(listener) => listener,
        Err(e) => {
            diagnostic(&format!("failed to listen on TCP port {}: {}", args.port, e));
            process::exit(71);
        }
    };
    info!("Listening on port {} with {} MB", args.port, args.memory_limit);

    for stream in listener.incoming() {
        // Accept and drop; callers only probe for readiness
        drop(stream);
    }
}

fn diagnostic(line: &str) {
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{}", line);
    let _ = stderr.flush();
}

fn check_tls_files(options: &[String]) {
    let Some(pair) = options.iter().find(|o| o.contains(',')) else {
        diagnostic("TLS enabled but no certificate given");
        process::exit(64);
    };

    for file in pair.split(',') {
        if !Path::new(file).is_file() {
            diagnostic(&format!("Could not load certificate: {}", file));
            process::exit(64);
        }
    }
}
