//! Splitchain node glue.
//!
//! The node owns the best-chain tip and wires the retarget engine and the
//! fork activation controller to the outside world:
//! - Validates each block's bits and proof of work before extending the tip
//! - Activates and deactivates the fork as the tip crosses the trigger height
//! - Backs up the wallet file on first activation
//! - Loads typed configuration, initialises logging and exposes metrics

pub mod backup;
pub mod chain_state;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod shutdown;

pub use backup::FileWalletBackup;
pub use chain_state::{BlockHeader, ChainState};
pub use config::{ForkConfig, NodeConfig};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::ForkMetrics;
pub use shutdown::ShutdownController;
