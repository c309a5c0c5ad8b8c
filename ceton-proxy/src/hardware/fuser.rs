//! Device file usage check through `fuser`.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::{error, warn};
use tokio::process::Command;

use crate::hardware::DeviceUsage;

/// Runs an external file-usage command against a device path.
///
/// `fuser` exits with zero when some process has the file open and non-zero
/// otherwise. A command that cannot be run or does not finish in time counts
/// as busy.
#[derive(Debug, Clone)]
pub struct FuserUsage {
    command: String,
    timeout: Duration,
}

impl FuserUsage {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }
}

impl Default for FuserUsage {
    fn default() -> Self {
        Self::new("fuser", Duration::from_secs(2))
    }
}

#[async_trait]
impl DeviceUsage for FuserUsage {
    async fn is_busy(&self, path: &Path) -> bool {
        let status = Command::new(&self.command)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(self.timeout, status).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                error!("Failed to run {} on {}: {}", self.command, path.display(), e);
                true
            }
            Err(_) => {
                warn!(
                    "{} on {} timed out after {:?}",
                    self.command,
                    path.display(),
                    self.timeout
                );
                true
            }
        }
    }
}
