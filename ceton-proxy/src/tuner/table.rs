//! Per-tuner status records.

use log::info;

use ceton_protocol::{SignalInfo, TunerSnapshot, TunerStatus};

use crate::device::{DeviceRegistry, TunerSlot};

/// Mutable state of one tuner.
#[derive(Debug, Clone)]
pub struct TunerRecord {
    pub slot: TunerSlot,
    pub status: TunerStatus,
    pub signal: SignalInfo,
    /// Result of the last device file usage check (PCIe tuners only).
    pub device_busy: Option<bool>,
    /// Caller context attached at allocation, cleared on release.
    pub stream_args: Option<serde_json::Value>,
}

impl TunerRecord {
    pub fn new(slot: TunerSlot) -> Self {
        Self {
            slot,
            status: TunerStatus::Inactive,
            signal: SignalInfo::default(),
            device_busy: None,
            stream_args: None,
        }
    }
}

/// Dense table of tuner records indexed by global tuner index.
#[derive(Debug, Clone)]
pub struct StatusTable {
    records: Vec<TunerRecord>,
}

impl StatusTable {
    pub fn from_registry(registry: &DeviceRegistry) -> Self {
        Self {
            records: registry.tuners().iter().cloned().map(TunerRecord::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut TunerRecord> {
        self.records.get_mut(index)
    }

    pub fn status(&self, index: usize) -> Option<TunerStatus> {
        self.records.get(index).map(|r| r.status)
    }

    /// Set a tuner's status, logging only actual transitions.
    ///
    /// Returns true if the status changed.
    pub fn set_status(&mut self, index: usize, status: TunerStatus) -> bool {
        let Some(record) = self.records.get_mut(index) else {
            return false;
        };
        if record.status == status {
            return false;
        }
        info!(
            "Ceton tuner {} status: {} -> {}",
            index, record.status, status
        );
        record.status = status;
        true
    }

    pub fn snapshot(&self, registry: &DeviceRegistry) -> Vec<TunerSnapshot> {
        self.records
            .iter()
            .map(|r| {
                let device = registry.device_of(&r.slot);
                TunerSnapshot {
                    index: r.slot.index,
                    device_address: device.address.clone(),
                    instance: r.slot.instance,
                    delivery: r.slot.delivery,
                    status: r.status,
                    destination: r.slot.destination.locator().to_string(),
                    device_busy: r.device_busy,
                    signal: r.signal.clone(),
                    stream_args: r.stream_args.clone(),
                }
            })
            .collect()
    }
}
