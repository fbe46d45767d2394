//! Nullable shutdown hook: remembers shutdown requests.

use splitchain_fork::ShutdownHook;
use std::sync::{Mutex, PoisonError};

#[derive(Default)]
pub struct NullShutdown {
    reasons: Mutex<Vec<String>>,
}

impl NullShutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requested(&self) -> bool {
        !self.reasons().is_empty()
    }

    pub fn reasons(&self) -> Vec<String> {
        self.reasons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ShutdownHook for NullShutdown {
    fn request_shutdown(&self, reason: &str) {
        self.reasons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(reason.to_string());
    }
}
