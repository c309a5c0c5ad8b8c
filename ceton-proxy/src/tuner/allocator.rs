//! Tuner allocation state machine.
//!
//! Every tuner moves through:
//!
//! ```text
//! Inactive --allocate--> Active --release--> StopPending --confirmed stop--> Inactive
//!     any state --activity not ours--> External --confirmed stop--> Inactive
//! ```
//!
//! The status table sits behind one async mutex. A scan, the selection of a
//! free tuner and its transition to `Active` happen while holding it, so two
//! concurrent callers can never be handed the same tuner. Probes run inside
//! that critical section and are bounded by the backend's request timeout.

use std::sync::Arc;

use log::{error, info, warn};
use thiserror::Error;
use tokio::sync::Mutex;

use ceton_protocol::{
    DeviceSnapshot, DispatchError, StreamLocator, TunerSnapshot, TunerStatus, TunerVar,
};

use crate::device::DeviceRegistry;
use crate::hardware::{CetonBackend, DeviceUsage};
use crate::tuner::dispatch::CommandDispatcher;
use crate::tuner::probe::HardwareProbe;
use crate::tuner::table::StatusTable;

/// A tuner handed to a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub tuner: usize,
    pub locator: StreamLocator,
}

/// Result of an allocation attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationOutcome {
    Allocated(Allocation),
    NoTunerAvailable,
}

/// Allocation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocateError {
    /// Start or tune failed; the tuner was rolled back to `StopPending`.
    #[error("Failed to start tuner {tuner}: {source}")]
    Dispatch {
        tuner: usize,
        #[source]
        source: DispatchError,
    },
}

/// Release failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReleaseError {
    #[error("Unknown tuner index: {0}")]
    UnknownTuner(usize),

    /// The tuner is not held by this process.
    #[error("Tuner {tuner} is not allocated (status {status})")]
    NotAllocated { tuner: usize, status: TunerStatus },

    /// The stop command failed; the tuner stays `StopPending`.
    #[error("Failed to stop tuner {tuner}: {source}")]
    Dispatch {
        tuner: usize,
        #[source]
        source: DispatchError,
    },
}

/// Arbitrates a fixed pool of tuners between concurrent callers.
pub struct Allocator {
    table: Mutex<StatusTable>,
    registry: Arc<DeviceRegistry>,
    probe: HardwareProbe,
    dispatcher: CommandDispatcher,
}

impl Allocator {
    /// Create the allocator and force-stop every tuner to clear state left by a
    /// previous process.
    pub async fn initialize(
        registry: Arc<DeviceRegistry>,
        backend: Arc<dyn CetonBackend>,
        usage: Arc<dyn DeviceUsage>,
    ) -> Self {
        let probe = HardwareProbe::new(Arc::clone(&registry), Arc::clone(&backend), usage);
        let dispatcher = CommandDispatcher::new(Arc::clone(&registry), backend);
        let table = StatusTable::from_registry(&registry);

        for index in 0..table.len() {
            if let Err(e) = dispatcher.start_stop(index, false).await {
                warn!("Initial stop of Ceton tuner {} failed: {}", index, e);
            }
        }

        info!("Allocator ready with {} tuners", table.len());

        Self {
            table: Mutex::new(table),
            registry,
            probe,
            dispatcher,
        }
    }

    /// Reconcile, select the first free tuner, start it and tune it.
    pub async fn find_and_allocate(
        &self,
        channel: u32,
        stream_args: Option<serde_json::Value>,
    ) -> Result<AllocationOutcome, AllocateError> {
        let mut table = self.table.lock().await;

        let eligible = self.scan(&mut table).await;
        let Some(&index) = eligible.first() else {
            info!("No Ceton tuners available for channel {}", channel);
            return Ok(AllocationOutcome::NoTunerAvailable);
        };

        info!("Selected Ceton tuner {} for channel {}", index, channel);
        table.set_status(index, TunerStatus::Active);
        if let Some(record) = table.get_mut(index) {
            record.stream_args = stream_args;
        }

        let started = match self.dispatcher.start_stop(index, true).await {
            Ok(locator) => self
                .dispatcher
                .tune(index, channel)
                .await
                .map(|()| locator),
            Err(e) => Err(e),
        };

        let locator = match started {
            Ok(locator) => locator,
            Err(source) => {
                error!(
                    "Allocation of Ceton tuner {} for channel {} failed: {}",
                    index, channel, source
                );
                if let Err(e) = self.dispatcher.start_stop(index, false).await {
                    error!("Rollback stop of Ceton tuner {} failed: {}", index, e);
                }
                table.set_status(index, TunerStatus::StopPending);
                if let Some(record) = table.get_mut(index) {
                    record.stream_args = None;
                }
                return Err(AllocateError::Dispatch { tuner: index, source });
            }
        };
        drop(table);

        info!(
            "Initiate streaming channel {} from Ceton tuner {} at {}",
            channel, index, locator
        );
        self.log_tuned_state(index).await;

        Ok(AllocationOutcome::Allocated(Allocation {
            tuner: index,
            locator,
        }))
    }

    /// Mark a tuner `StopPending` and send the stop command.
    ///
    /// The next scan moves it to `Inactive` once the hardware confirms.
    pub async fn release(&self, index: usize) -> Result<(), ReleaseError> {
        let mut table = self.table.lock().await;
        let status = table
            .status(index)
            .ok_or(ReleaseError::UnknownTuner(index))?;

        match status {
            TunerStatus::Active | TunerStatus::StopPending => {}
            TunerStatus::Inactive | TunerStatus::External => {
                warn!("Release of Ceton tuner {} ignored, status is {}", index, status);
                return Err(ReleaseError::NotAllocated {
                    tuner: index,
                    status,
                });
            }
        }

        info!("Closing Ceton tuner {}", index);
        table.set_status(index, TunerStatus::StopPending);
        if let Some(record) = table.get_mut(index) {
            record.stream_args = None;
        }

        self.dispatcher
            .start_stop(index, false)
            .await
            .map(|_| ())
            .map_err(|source| ReleaseError::Dispatch {
                tuner: index,
                source,
            })
    }

    /// Apply the reconciliation policy to every tuner without selecting one.
    pub async fn reconcile(&self) {
        let mut table = self.table.lock().await;
        let eligible = self.scan(&mut table).await;
        info!("Reconciled Ceton tuners, {} free", eligible.len());
    }

    /// Refresh advisory signal data of every tuner. Status is left untouched.
    pub async fn refresh_signals(&self) {
        let mut readings = Vec::with_capacity(self.registry.tuner_count());
        for slot in self.registry.tuners() {
            let signal = self.probe.read_signal(slot.index).await;
            let busy = self.probe.device_busy_state(slot.index).await;
            readings.push((slot.index, signal, busy));
        }

        let mut table = self.table.lock().await;
        for (index, signal, busy) in readings {
            if let Some(record) = table.get_mut(index) {
                record.signal = signal;
                record.device_busy = busy;
            }
        }
    }

    /// Read-only view of every tuner.
    pub async fn snapshot(&self) -> Vec<TunerSnapshot> {
        self.table.lock().await.snapshot(&self.registry)
    }

    /// Identity and health of every device.
    pub async fn devices(&self) -> Vec<DeviceSnapshot> {
        let mut devices = Vec::with_capacity(self.registry.devices().len());
        for device in self.registry.devices() {
            if let Some(info) = self.probe.device_info(device.ordinal).await {
                devices.push(info);
            }
        }
        devices
    }

    /// Refresh every non-Active tuner and return the free ones in index order.
    ///
    /// Policy for a tuner that is not `Active`:
    /// - transport stopped and device file not busy: `Inactive`, eligible
    /// - otherwise, including an unreadable transport, unless `StopPending`: `External`
    async fn scan(&self, table: &mut StatusTable) -> Vec<usize> {
        let mut eligible = Vec::new();

        for index in 0..table.len() {
            let Some(status) = table.status(index) else {
                continue;
            };
            if status == TunerStatus::Active {
                continue;
            }

            let signal = self.probe.read_signal(index).await;
            let busy_state = self.probe.device_busy_state(index).await;
            let busy = busy_state.unwrap_or(false);

            let stopped = signal.transport.as_ref().map(|t| t.is_stopped());

            if let Some(record) = table.get_mut(index) {
                record.signal = signal;
                record.device_busy = busy_state;
            }

            match stopped {
                Some(true) if !busy => {
                    table.set_status(index, TunerStatus::Inactive);
                    if let Some(record) = table.get_mut(index) {
                        record.stream_args = None;
                    }
                    eligible.push(index);
                }
                _ => {
                    if stopped.is_none() {
                        warn!("Ceton tuner {} transport state unknown", index);
                    }
                    if status != TunerStatus::StopPending {
                        table.set_status(index, TunerStatus::External);
                    }
                }
            }
        }

        eligible
    }

    async fn log_tuned_state(&self, index: usize) {
        let (frequency, program, copy_protection) = tokio::join!(
            self.probe.probe(index, TunerVar::Frequency),
            self.probe.probe(index, TunerVar::ProgramNumber),
            self.probe.probe(index, TunerVar::CopyProtectionStatus),
        );
        info!(
            "Ceton tuner {}: frequency={} program={} copy_protection={}",
            index,
            frequency.unwrap_or_else(|_| "unknown".to_string()),
            program.unwrap_or_else(|_| "unknown".to_string()),
            copy_protection.unwrap_or_else(|_| "unknown".to_string()),
        );
    }
}
