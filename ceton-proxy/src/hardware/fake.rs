//! In-memory stand-ins for the device interface and the OS usage check.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use ceton_protocol::{ChannelMapError, DispatchError, ProbeError, TunerVar, TRANSPORT_STOPPED};

use crate::hardware::{CetonBackend, ChannelControl, DeviceUsage, StreamControl};

const TRANSPORT_PLAYING: &str = "PLAYING";

#[derive(Default)]
struct FakeState {
    host_connection: HashMap<String, String>,
    transport: HashMap<(String, u32), String>,
    unreadable: HashSet<(String, u32)>,
    stop_takes_effect: bool,
    fail_start: bool,
    fail_tune: bool,
    stream_requests: Vec<(String, StreamControl)>,
    channel_requests: Vec<(String, ChannelControl)>,
    channel_pages: HashMap<(u32, bool), String>,
    probe_delay: Option<Duration>,
}

/// Simulated Ceton devices.
///
/// Starting a tuner sets its transport to `PLAYING`; stopping sets it back to
/// `STOPPED` unless [`FakeBackend::set_stop_takes_effect`] disabled that.
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                stop_takes_effect: true,
                ..FakeState::default()
            }),
        }
    }

    pub fn with_device(self, address: &str, host_connection: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .host_connection
            .insert(address.to_string(), host_connection.to_string());
        self
    }

    pub fn set_transport(&self, address: &str, instance: u32, value: &str) {
        self.state
            .lock()
            .unwrap()
            .transport
            .insert((address.to_string(), instance), value.to_string());
    }

    pub fn set_unreadable(&self, address: &str, instance: u32, unreadable: bool) {
        let mut state = self.state.lock().unwrap();
        let key = (address.to_string(), instance);
        if unreadable {
            state.unreadable.insert(key);
        } else {
            state.unreadable.remove(&key);
        }
    }

    pub fn set_stop_takes_effect(&self, value: bool) {
        self.state.lock().unwrap().stop_takes_effect = value;
    }

    pub fn set_fail_start(&self, value: bool) {
        self.state.lock().unwrap().fail_start = value;
    }

    pub fn set_fail_tune(&self, value: bool) {
        self.state.lock().unwrap().fail_tune = value;
    }

    pub fn set_probe_delay(&self, delay: Duration) {
        self.state.lock().unwrap().probe_delay = Some(delay);
    }

    pub fn set_channel_page(&self, page: u32, xml: bool, body: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .channel_pages
            .insert((page, xml), body.into());
    }

    pub fn stream_requests(&self) -> Vec<(String, StreamControl)> {
        self.state.lock().unwrap().stream_requests.clone()
    }

    pub fn channel_requests(&self) -> Vec<(String, ChannelControl)> {
        self.state.lock().unwrap().channel_requests.clone()
    }

    pub fn clear_requests(&self) {
        let mut state = self.state.lock().unwrap();
        state.stream_requests.clear();
        state.channel_requests.clear();
    }
}

#[async_trait]
impl CetonBackend for FakeBackend {
    async fn get_var(&self, address: &str, instance: u32, var: TunerVar) -> Result<String, ProbeError> {
        let delay = self.state.lock().unwrap().probe_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock().unwrap();
        if state.unreadable.contains(&(address.to_string(), instance)) {
            return Err(ProbeError::Transport {
                var: var.name().to_string(),
                reason: "connection refused".to_string(),
            });
        }

        let value = match var {
            TunerVar::HostConnection => state
                .host_connection
                .get(address)
                .cloned()
                .ok_or_else(|| ProbeError::Transport {
                    var: var.name().to_string(),
                    reason: "no such device".to_string(),
                })?,
            TunerVar::TransportState => state
                .transport
                .get(&(address.to_string(), instance))
                .cloned()
                .unwrap_or_else(|| TRANSPORT_STOPPED.to_string()),
            TunerVar::SignalLevel => "-2.5 dBmV".to_string(),
            TunerVar::SignalSnr => "36.2 dB".to_string(),
            TunerVar::Temperature => "52 C".to_string(),
            _ => "0".to_string(),
        };
        Ok(value)
    }

    async fn stream_request(&self, address: &str, control: &StreamControl) -> Result<(), DispatchError> {
        let mut state = self.state.lock().unwrap();
        state
            .stream_requests
            .push((address.to_string(), control.clone()));

        if control.start == 1 && state.fail_start {
            return Err(DispatchError::Status {
                endpoint: format!("http://{}/stream_request.cgi", address),
                status: 500,
            });
        }

        let key = (address.to_string(), control.instance_id);
        if control.start == 1 {
            state.transport.insert(key, TRANSPORT_PLAYING.to_string());
        } else if state.stop_takes_effect {
            state.transport.insert(key, TRANSPORT_STOPPED.to_string());
        }
        Ok(())
    }

    async fn channel_request(&self, address: &str, control: &ChannelControl) -> Result<(), DispatchError> {
        let mut state = self.state.lock().unwrap();
        state
            .channel_requests
            .push((address.to_string(), control.clone()));

        if state.fail_tune {
            return Err(DispatchError::Transport {
                endpoint: format!("http://{}/channel_request.cgi", address),
                reason: "connection reset".to_string(),
            });
        }
        Ok(())
    }

    async fn channel_map_page(&self, _address: &str, page: u32, xml: bool) -> Result<String, ChannelMapError> {
        self.state
            .lock()
            .unwrap()
            .channel_pages
            .get(&(page, xml))
            .cloned()
            .ok_or(ChannelMapError::Transport {
                page,
                reason: "HTTP 404".to_string(),
            })
    }
}

/// Simulated `fuser` that reports a configurable set of paths as busy.
#[derive(Default)]
pub struct FakeUsage {
    busy: Mutex<HashSet<PathBuf>>,
    checks: AtomicUsize,
}

impl FakeUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_busy(&self, path: impl Into<PathBuf>, busy: bool) {
        let mut set = self.busy.lock().unwrap();
        let path = path.into();
        if busy {
            set.insert(path);
        } else {
            set.remove(&path);
        }
    }

    /// Number of usage checks performed so far.
    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceUsage for FakeUsage {
    async fn is_busy(&self, path: &Path) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.busy.lock().unwrap().contains(path)
    }
}
