//! tunnel-worker: per-client VPN worker process
//!
//! Started by the main server process with the worker end of the control
//! channel already open.
//!
//! # Usage
//!
//! ```bash
//! # Serve the control channel inherited on fd 3
//! tunnel-worker --control-fd 3 -c /etc/tunnel-worker/worker.json
//!
//! # Environment overrides
//! TUNNEL_WORKER_LOG_LEVEL=debug tunnel-worker --control-fd 3
//! ```

use std::net::{Ipv4Addr, Ipv6Addr};
use std::os::fd::{FromRawFd, OwnedFd, RawFd};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use tunnel_worker::config::{create_default_config, load_config_with_env, WorkerConfig};
use tunnel_worker::net::VpnInfo;
use tunnel_worker::{prepare_process, ControlChannel, Worker};

const DEFAULT_CONFIG_PATH: &str = "/etc/tunnel-worker/worker.json";

/// Command-line arguments
struct Args {
    /// Inherited control channel descriptor
    control_fd: Option<RawFd>,
    /// Configuration file path
    config_path: Option<PathBuf>,
    /// Tunnel device serving this client
    tun: Option<String>,
    ipv4: Option<Ipv4Addr>,
    ipv6: Option<Ipv6Addr>,
    /// Generate default configuration
    generate_config: bool,
    /// Check configuration only
    check_config: bool,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut parsed = Self {
            control_fd: None,
            config_path: None,
            tun: None,
            ipv4: None,
            ipv6: None,
            generate_config: false,
            check_config: false,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--control-fd" => {
                    parsed.control_fd = Some(required_value(&arg, args.next()));
                }
                "-c" | "--config" => {
                    if let Some(path) = args.next() {
                        parsed.config_path = Some(PathBuf::from(path));
                    }
                }
                "--tun" => {
                    parsed.tun = args.next();
                }
                "--ipv4" => {
                    parsed.ipv4 = Some(required_value(&arg, args.next()));
                }
                "--ipv6" => {
                    parsed.ipv6 = Some(required_value(&arg, args.next()));
                }
                "-g" | "--generate-config" => {
                    parsed.generate_config = true;
                }
                "--check" => {
                    parsed.check_config = true;
                }
                "-h" | "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "-v" | "--version" => {
                    println!("tunnel-worker v{}", tunnel_worker::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {arg}");
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        parsed
    }
}

/// Parse the value following `flag`, exiting on a missing or bad value
fn required_value<T: std::str::FromStr>(flag: &str, value: Option<String>) -> T {
    match value.as_deref().map(str::parse) {
        Some(Ok(v)) => v,
        _ => {
            eprintln!("{flag} requires a valid value");
            std::process::exit(1);
        }
    }
}

fn print_help() {
    println!(
        r"tunnel-worker v{}

Per-client worker of a multi-process VPN server.

USAGE:
    tunnel-worker --control-fd <FD> [OPTIONS]

OPTIONS:
    --control-fd <FD>       Inherited control channel descriptor
    -c, --config <PATH>     Configuration file path
    --tun <NAME>            Tunnel device serving this client
    --ipv4 <ADDR>           Tunnel IPv4 address
    --ipv6 <ADDR>           Tunnel IPv6 address
    -g, --generate-config   Generate default configuration and exit
    --check                 Check configuration and exit
    -h, --help              Print help information
    -v, --version           Print version information

ENVIRONMENT:
    TUNNEL_WORKER_LOG_LEVEL        Override log level (trace, debug, info, warn, error)
    TUNNEL_WORKER_MTU              Override the tunnel MTU
    TUNNEL_WORKER_POLL_TIMEOUT_MS  Override the control channel poll timeout

EXIT STATUS:
    0  terminated by the main process
    1  control channel receive failure
    2  main process closed the channel
    3  malformed command frame
    4  unknown command
",
        tunnel_worker::VERSION
    );
}

/// Initialize logging
fn init_logging(config: &WorkerConfig) {
    let level = match config.log.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.log.target)
        .with_writer(std::io::stderr);

    if config.log.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Take ownership of an inherited descriptor after checking it is open
fn adopt_control_fd(fd: RawFd) -> Result<OwnedFd> {
    if fd < 0 {
        bail!("invalid control fd {fd}");
    }
    // SAFETY: F_GETFD only inspects the descriptor table
    if unsafe { libc::fcntl(fd, libc::F_GETFD) } < 0 {
        return Err(std::io::Error::last_os_error())
            .with_context(|| format!("control fd {fd} is not open"));
    }
    // SAFETY: the descriptor is open and handed to this process exclusively
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.generate_config {
        let path = args
            .config_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        create_default_config(&path)?;
        println!("Generated default configuration at {path:?}");
        return Ok(());
    }

    let config = load_config_with_env(args.config_path.as_deref())
        .with_context(|| format!("Failed to load configuration from {:?}", args.config_path))?;

    if args.check_config {
        println!("Configuration is valid");
        return Ok(());
    }

    init_logging(&config);

    info!("tunnel-worker v{}", tunnel_worker::VERSION);

    let mut vpn = args.tun.map(|name| VpnInfo::new(name, args.ipv4, args.ipv6));
    prepare_process(&config.network, vpn.as_mut()).context("Worker setup failed")?;

    let Some(fd) = args.control_fd else {
        bail!("--control-fd is required");
    };
    let channel = ControlChannel::new(adopt_control_fd(fd)?);

    let mut worker = Worker::new(channel, &config.control);
    let reason = worker.run();
    // process::exit skips destructors
    drop(worker);

    std::process::exit(reason.exit_code());
}
