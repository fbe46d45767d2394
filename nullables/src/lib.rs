//! Nullable infrastructure for deterministic testing.
//!
//! The fork controller reaches the outside world only through the
//! [`MarkerStore`](splitchain_fork::MarkerStore),
//! [`WalletBackup`](splitchain_fork::WalletBackup) and
//! [`ShutdownHook`](splitchain_fork::ShutdownHook) traits. The types here
//! implement them in memory:
//! - Every call is recorded so tests can assert on it
//! - Failures can be switched on programmatically
//! - Nothing touches the filesystem
//!
//! Usage: swap real implementations for nullables in tests.

pub mod backup;
pub mod marker;
pub mod shutdown;

pub use backup::NullWalletBackup;
pub use marker::NullMarkerStore;
pub use shutdown::NullShutdown;
