//! Stream request workers.
//!
//! Each worker waits a random delay, requests a stream, holds it for a
//! random run time, releases it and schedules the next job, until the
//! overall deadline passes.

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use rand::Rng;
use tokio::time::Instant;

use crate::client::StreamClient;

/// Load pattern shared by every worker.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub jobs: usize,
    pub channels: Vec<u32>,
    pub total: Duration,
    pub delay: RangeInclusive<Duration>,
    pub run: RangeInclusive<Duration>,
    /// First job of every worker starts without delay.
    pub start_immediately: bool,
}

/// Delay before a job and how long it holds its tuner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobTiming {
    pub delay: Duration,
    pub runtime: Duration,
}

fn random_between(range: &RangeInclusive<Duration>) -> Duration {
    let (min, max) = (range.start().as_millis() as u64, range.end().as_millis() as u64);
    if max <= min {
        return Duration::from_millis(min);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min..=max))
}

impl JobTiming {
    pub fn random(config: &LoadConfig, immediate: bool) -> Self {
        let delay = if immediate {
            Duration::ZERO
        } else {
            random_between(&config.delay)
        };
        Self {
            delay,
            runtime: random_between(&config.run),
        }
    }
}

/// Round-robin channel selection shared by all workers.
#[derive(Debug)]
pub struct ChannelCycle {
    channels: Vec<u32>,
    next: AtomicUsize,
}

impl ChannelCycle {
    pub fn new(channels: Vec<u32>) -> Self {
        Self {
            channels,
            next: AtomicUsize::new(0),
        }
    }

    pub fn next(&self) -> Option<u32> {
        if self.channels.is_empty() {
            return None;
        }
        let i = self.next.fetch_add(1, Ordering::Relaxed);
        Some(self.channels[i % self.channels.len()])
    }
}

/// Outcome counters of a load run.
#[derive(Debug, Default)]
pub struct RunStats {
    pub started: AtomicUsize,
    pub failed: AtomicUsize,
}

impl RunStats {
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

/// Run every worker until the deadline and return the counters.
pub async fn run(client: StreamClient, config: LoadConfig) -> Arc<RunStats> {
    let stats = Arc::new(RunStats::default());
    let cycle = Arc::new(ChannelCycle::new(config.channels.clone()));
    let deadline = Instant::now() + config.total;
    let config = Arc::new(config);

    let mut handles = Vec::with_capacity(config.jobs);
    for job in 0..config.jobs {
        let worker = Worker {
            job,
            client: client.clone(),
            config: Arc::clone(&config),
            cycle: Arc::clone(&cycle),
            stats: Arc::clone(&stats),
            deadline,
        };
        handles.push(tokio::spawn(worker.run()));
    }

    for handle in handles {
        if let Err(e) = handle.await {
            error!("Worker task failed: {}", e);
            stats.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    info!("Stopping all jobs");
    stats
}

struct Worker {
    job: usize,
    client: StreamClient,
    config: Arc<LoadConfig>,
    cycle: Arc<ChannelCycle>,
    stats: Arc<RunStats>,
    deadline: Instant,
}

impl Worker {
    async fn run(self) {
        let mut immediate = self.config.start_immediately;

        loop {
            let timing = JobTiming::random(&self.config, immediate);
            immediate = false;

            let start_at = Instant::now() + timing.delay;
            if start_at >= self.deadline {
                break;
            }
            info!(
                "Scheduling new job {} (delay {:?}, duration {:?})",
                self.job, timing.delay, timing.runtime
            );
            tokio::time::sleep_until(start_at).await;

            let Some(channel) = self.cycle.next() else {
                break;
            };
            self.stats.started.fetch_add(1, Ordering::SeqCst);

            if !self.stream_once(channel, timing.runtime).await {
                self.stats.failed.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// Allocate, hold and release one stream. Returns false on any failure.
    async fn stream_once(&self, channel: u32, runtime: Duration) -> bool {
        let grant = match self.client.allocate(channel, self.job).await {
            Ok(grant) => grant,
            Err(e) if e.is_no_tuner() => {
                warn!("Job {}: no tuner for channel {}", self.job, channel);
                return false;
            }
            Err(e) => {
                error!("Job {}: {}", self.job, e);
                return false;
            }
        };

        info!(
            "Starting job {} on channel {} (tuner {}, {})",
            self.job, channel, grant.tuner, grant.locator
        );
        let hold_until = (Instant::now() + runtime).min(self.deadline);
        tokio::time::sleep_until(hold_until).await;

        match self.client.release(grant.tuner).await {
            Ok(()) => {
                info!("Ending job {} (tuner {})", self.job, grant.tuner);
                true
            }
            Err(e) => {
                error!("Job {}: release of tuner {} failed: {}", self.job, grant.tuner, e);
                false
            }
        }
    }
}
