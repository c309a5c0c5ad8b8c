//! ceton-loadgen: concurrent stream requests against ceton-proxy.
//!
//! Starts a number of workers that repeatedly request a stream, hold it for a
//! random time and release it. The exit code is the number of failed jobs.

use std::time::Duration;

use clap::Parser;
use log::{error, info};

mod client;
mod runner;

use client::{ClientConfig, StreamClient};
use runner::LoadConfig;

/// ceton-loadgen - Stream request load generator for ceton-proxy
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the ceton-proxy REST API
    #[arg(short, long, default_value = "http://127.0.0.1:5004")]
    server: String,

    /// Number of concurrent jobs
    #[arg(short, long, default_value = "3")]
    jobs: usize,

    /// Channels to cycle through
    #[arg(short, long, value_delimiter = ',', default_value = "505,593,508,553")]
    channels: Vec<u32>,

    /// Total run time in seconds
    #[arg(long, default_value = "1200")]
    total_secs: u64,

    /// Minimum delay before a job starts, in seconds
    #[arg(long, default_value = "5")]
    delay_min: u64,

    /// Maximum delay before a job starts, in seconds
    #[arg(long, default_value = "15")]
    delay_max: u64,

    /// Minimum time a job holds its tuner, in seconds
    #[arg(long, default_value = "10")]
    run_min: u64,

    /// Maximum time a job holds its tuner, in seconds
    #[arg(long, default_value = "30")]
    run_max: u64,

    /// Start the first job of every worker without delay
    #[arg(long)]
    start_immediately: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn load_config(&self) -> LoadConfig {
        let secs = Duration::from_secs;
        LoadConfig {
            jobs: self.jobs,
            channels: self.channels.clone(),
            total: secs(self.total_secs),
            delay: secs(self.delay_min)..=secs(self.delay_max.max(self.delay_min)),
            run: secs(self.run_min)..=secs(self.run_max.max(self.run_min)),
            start_immediately: self.start_immediately,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();

    let client = match StreamClient::new(&ClientConfig {
        server: args.server.clone(),
        ..ClientConfig::default()
    }) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let config = args.load_config();
    info!(
        "Start: {} jobs against {}, channels {:?}, total {:?}",
        config.jobs, args.server, config.channels, config.total
    );

    let stats = runner::run(client, config).await;
    let failed = stats.failed();

    if failed > 0 {
        info!("Exiting, with errors ({} of {} jobs failed)", failed, stats.started());
    } else {
        info!("Exiting cleanly ({} jobs)", stats.started());
    }
    std::process::exit(failed.min(i32::from(u8::MAX) as usize) as i32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["ceton-loadgen"]);
        assert_eq!(args.jobs, 3);
        assert_eq!(args.channels, vec![505, 593, 508, 553]);
        assert!(!args.start_immediately);

        let config = args.load_config();
        assert_eq!(config.total, Duration::from_secs(1200));
        assert_eq!(config.delay, Duration::from_secs(5)..=Duration::from_secs(15));
        assert_eq!(config.run, Duration::from_secs(10)..=Duration::from_secs(30));
    }

    #[test]
    fn test_channel_list_flag() {
        let args = Args::parse_from(["ceton-loadgen", "--channels", "7,8", "--delay-min", "20"]);
        assert_eq!(args.channels, vec![7, 8]);
        // A minimum above the maximum collapses the range.
        let config = args.load_config();
        assert_eq!(*config.delay.start(), *config.delay.end());
    }
}
