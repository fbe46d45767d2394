//! Hard-fork activation bookkeeping.
//!
//! [`ForkActivationController`] resolves the trigger height and fork id, tracks
//! whether the fork is active as the tip moves, and guards the one-off actions
//! taken on first activation. Persistence, wallet backup and shutdown are
//! reached through the [`MarkerStore`], [`WalletBackup`] and [`ShutdownHook`]
//! traits so the node can supply real implementations and tests nullables.

pub mod backup;
pub mod conf;
pub mod controller;
pub mod error;
pub mod marker;

pub use backup::{expand_backup_path, WalletBackup};
pub use conf::ConfFile;
pub use controller::{
    ForkActivationController, ForkOverrides, ForkState, ForkStatus, ShutdownHook,
    POST_FORK_CONSENSUS_ID,
};
pub use error::ForkError;
pub use marker::{ActivationMarker, FileMarkerStore, MarkerStore};
