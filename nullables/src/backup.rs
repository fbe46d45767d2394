//! Nullable wallet backup: records backup requests without copying files.

use splitchain_fork::{ForkError, WalletBackup};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// A [`WalletBackup`] that only records `(destination, height)` pairs.
#[derive(Default)]
pub struct NullWalletBackup {
    calls: Mutex<Vec<(String, u32)>>,
    failing: AtomicBool,
}

impl NullWalletBackup {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backup that fails every request.
    pub fn failing() -> Self {
        let backup = Self::new();
        backup.set_failing(true);
        backup
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every request received, successful or not.
    pub fn calls(&self) -> Vec<(String, u32)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl WalletBackup for NullWalletBackup {
    fn backup(&self, destination: &str, height: u32) -> Result<PathBuf, ForkError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((destination.to_string(), height));
        if self.failing.load(Ordering::SeqCst) {
            return Err(ForkError::BackupFailed {
                height,
                reason: "null backup configured to fail".to_string(),
            });
        }
        Ok(PathBuf::from(destination).join(format!("wallet.auto.{height}.bak")))
    }
}
