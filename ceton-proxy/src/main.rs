//! ceton-proxy: tuner allocation arbiter for Ceton InfiniTV devices.
//!
//! Hands out free tuners to concurrent stream requests over a small REST API,
//! never giving the same tuner to two callers and never taking one that
//! another program is using.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

mod channels;
mod config;
mod device;
mod hardware;
mod logging;
mod tuner;
mod web;

use ceton_protocol::SetupError;

use channels::ChannelCollector;
use config::{load_config, ConfigFile, DEFAULT_CONFIG_FILE, DEFAULT_LISTEN};
use device::{DeviceConfig, DeviceRegistry};
use hardware::{FuserUsage, HttpBackend};
use tuner::Allocator;
use web::state::WebState;

/// ceton-proxy - Tuner allocation arbiter for Ceton devices
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address for the REST API and status page to listen on
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Configuration file path
    #[arg(short = 'f', long)]
    config: Option<PathBuf>,

    /// Device address, overriding the configured device list
    #[arg(short, long)]
    address: Option<String>,

    /// Tuner count of the device given with --address
    #[arg(short, long, default_value = "4")]
    tuners: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory where log files are stored
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Number of days to keep log files
    #[arg(long, default_value = "7")]
    log_retention_days: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load config file: explicit path > auto-detect > default
    let config_path = args.config.clone().or_else(|| {
        let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
        default_path.exists().then_some(default_path)
    });
    let file_config = match &config_path {
        Some(path) => match load_config(path) {
            Ok(c) => {
                eprintln!("Loaded config from: {}", path.display());
                c
            }
            Err(e) => {
                eprintln!("Failed to load config file: {}", e);
                return Err(e);
            }
        },
        None => ConfigFile::default(),
    };

    // Merge logging configs (command line takes precedence)
    let log_dir = if args.log_dir.to_string_lossy() != "logs" {
        args.log_dir.clone()
    } else {
        PathBuf::from(file_config.logging.log_dir.as_deref().unwrap_or("logs"))
    };
    let log_retention_days = if args.log_retention_days != 7 {
        args.log_retention_days
    } else {
        file_config.logging.retention_days.unwrap_or(7)
    };
    logging::init_logging(
        &log_dir,
        log_retention_days,
        args.verbose,
        file_config.logging.level.as_deref(),
    )?;

    use log::{error, info};

    let listen_addr = match args.listen.or(file_config.server.listen) {
        Some(addr) => addr,
        None => DEFAULT_LISTEN.parse()?,
    };

    let ceton = &file_config.ceton;
    let mut registry_config = ceton.registry_config();
    if let Some(address) = args.address {
        registry_config.devices = vec![DeviceConfig {
            address,
            tuners: args.tuners,
            pcie_address: ceton.pcie_address.clone(),
        }];
    }

    info!("ceton-proxy starting...");
    info!("  Listen address: {}", listen_addr);
    info!("  Host address: {}", registry_config.host_address);
    for device in &registry_config.devices {
        info!("  Device: {} ({} tuners)", device.address, device.tuners);
    }

    let backend = Arc::new(HttpBackend::new(ceton.request_timeout())?);
    let usage = Arc::new(FuserUsage::new(ceton.fuser_command(), ceton.fuser_timeout()));

    let registry = match DeviceRegistry::discover(&registry_config, backend.as_ref()).await {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            error!("Startup aborted: {}", e);
            return Err(e.into());
        }
    };

    let first_device = registry
        .device(0)
        .map(|d| d.address.clone())
        .ok_or(SetupError::NoDeviceAddress)?;

    let allocator = Arc::new(Allocator::initialize(Arc::clone(&registry), backend.clone(), usage).await);
    let channels = ChannelCollector::new(backend, first_device);
    let web_state = Arc::new(WebState::new(allocator, channels));

    if let Err(e) = web::start_web_server(listen_addr, web_state).await {
        error!("REST server error: {}", e);
        return Err(e);
    }

    Ok(())
}
