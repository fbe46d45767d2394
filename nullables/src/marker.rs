//! Nullable marker store: in-memory activation marker for testing.

use splitchain_fork::{ActivationMarker, ForkError, MarkerStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// An in-memory [`MarkerStore`] that keeps every saved marker.
#[derive(Default)]
pub struct NullMarkerStore {
    current: Mutex<Option<ActivationMarker>>,
    history: Mutex<Vec<ActivationMarker>>,
    unreadable: AtomicBool,
    fail_saves: AtomicBool,
}

impl NullMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `marker`, as after an earlier run.
    pub fn with_marker(marker: ActivationMarker) -> Self {
        let store = Self::new();
        *store.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(marker);
        store
    }

    /// Make `load` fail as if the marker file were corrupt.
    pub fn set_unreadable(&self, unreadable: bool) {
        self.unreadable.store(unreadable, Ordering::SeqCst);
    }

    /// Make `save` fail with an I/O error.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// The marker as a restart would read it.
    pub fn current(&self) -> Option<ActivationMarker> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every successfully saved marker, oldest first.
    pub fn history(&self) -> Vec<ActivationMarker> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn save_count(&self) -> usize {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl MarkerStore for NullMarkerStore {
    fn load(&self) -> Result<Option<ActivationMarker>, ForkError> {
        if self.unreadable.load(Ordering::SeqCst) {
            return Err(ForkError::MissingKey("forkheight"));
        }
        Ok(self.current())
    }

    fn save(&self, marker: &ActivationMarker) -> Result<(), ForkError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(ForkError::Io(std::io::Error::other("null store write failure")));
        }
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(marker.clone());
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(marker.clone());
        Ok(())
    }
}
