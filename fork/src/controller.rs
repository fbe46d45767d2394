//! Fork activation state machine.
//!
//! The controller resolves the fork parameters once at startup, then follows
//! the best tip across the trigger height in both directions. The one-off
//! actions (marker file, wallet backup) run at most once per data directory:
//! a marker left by an earlier run, or by an earlier activation in this run,
//! suppresses them for good, even if a reorg later deactivates the fork.
//!
//! Calls must be serialized with tip updates by the caller.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use splitchain_types::network::{DEFAULT_FORK_ID, MAX_FORK_ID};
use splitchain_types::NetworkId;

use crate::backup::WalletBackup;
use crate::marker::{ActivationMarker, MarkerStore};
use crate::ForkError;

/// Identifies the post-fork consensus rules this build implements.
///
/// Advertised whether or not the fork is active so peers can compare builds.
pub const POST_FORK_CONSENSUS_ID: &str = "LEONOV";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForkState {
    #[default]
    Inactive,
    Active,
}

/// Runtime configuration of the fork, before validation.
///
/// Values are signed so out-of-range input reaches validation instead of
/// being rejected by a parser with a less useful message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkOverrides {
    pub fork_height: Option<i64>,
    pub fork_id: Option<i64>,
    /// Defaults to the block before the fork.
    pub auto_backup_block: Option<i64>,
    /// Backup destination; may contain `@` for the backup block height.
    pub auto_backup_wallet_path: Option<String>,
}

/// Receives requests to stop the node.
///
/// Implementations only signal; the process boundary decides how to stop.
pub trait ShutdownHook: Send + Sync {
    fn request_shutdown(&self, reason: &str);
}

/// Read-only snapshot of the controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkStatus {
    pub network: NetworkId,
    pub state: ForkState,
    pub fork_height: u32,
    pub fork_id: u32,
    pub auto_backup_block: u32,
    pub activated_before: bool,
    pub backup_done: bool,
    pub consensus_id: String,
    pub setup_error: Option<String>,
}

struct Resolved {
    fork_height: u32,
    fork_id: u32,
    auto_backup_block: Option<u32>,
}

pub struct ForkActivationController {
    network: NetworkId,
    fork_height: u32,
    fork_id: u32,
    /// Explicit backup block; otherwise the block before the fork height.
    auto_backup_block: Option<u32>,
    auto_backup_wallet_path: String,
    state: ForkState,
    activated_before: bool,
    backup_done: bool,
    setup_error: Option<ForkError>,
    store: Arc<dyn MarkerStore>,
    wallet_backup: Option<Arc<dyn WalletBackup>>,
}

impl ForkActivationController {
    /// Resolve the fork parameters for `network`.
    ///
    /// Precedence, lowest first: network defaults, `overrides`, the persisted
    /// marker. Invalid parameters request a shutdown through `shutdown` and are
    /// kept in [`setup_error`](Self::setup_error); the controller then falls
    /// back to the network defaults. The fork always starts inactive.
    pub fn setup(
        network: NetworkId,
        overrides: &ForkOverrides,
        store: Arc<dyn MarkerStore>,
        shutdown: &dyn ShutdownHook,
    ) -> Self {
        let mut fork_height = overrides
            .fork_height
            .unwrap_or_else(|| i64::from(network.default_fork_height()));
        let mut fork_id = overrides
            .fork_id
            .unwrap_or_else(|| i64::from(DEFAULT_FORK_ID));
        let mut auto_backup_block = overrides.auto_backup_block;

        let activated_before = match store.load() {
            Ok(Some(marker)) => {
                tracing::info!(
                    fork_height = marker.fork_height,
                    fork_id = marker.fork_id,
                    "found activation marker, fork was activated before"
                );
                if let Some(error) = &marker.error {
                    tracing::warn!(%error, "previous activation recorded a failure");
                }
                fork_height = i64::from(marker.fork_height);
                fork_id = i64::from(marker.fork_id);
                if let Some(block) = marker.auto_backup_block {
                    auto_backup_block = Some(i64::from(block));
                }
                true
            }
            Ok(None) => {
                tracing::info!("no activation marker, fork not activated yet");
                false
            }
            Err(err) => {
                // The marker exists but cannot be used; never repeat the one-off actions.
                tracing::error!(%err, "unreadable activation marker, treating fork as activated before");
                true
            }
        };

        let (resolved, setup_error) = match Self::validate(
            network,
            fork_height,
            fork_id,
            auto_backup_block,
            activated_before,
        ) {
            Ok(resolved) => (resolved, None),
            Err(err) => {
                tracing::error!(%err, %network, "invalid fork configuration");
                shutdown.request_shutdown(&err.to_string());
                let default_height = network.default_fork_height();
                let fallback = Resolved {
                    fork_height: default_height,
                    fork_id: DEFAULT_FORK_ID,
                    auto_backup_block: None,
                };
                (fallback, Some(err))
            }
        };

        tracing::info!(
            %network,
            fork_height = resolved.fork_height,
            fork_id = %format!("{:#08x}", resolved.fork_id),
            auto_backup_block = resolved
                .auto_backup_block
                .unwrap_or_else(|| resolved.fork_height.saturating_sub(1)),
            "fork setup complete"
        );

        Self {
            network,
            fork_height: resolved.fork_height,
            fork_id: resolved.fork_id,
            auto_backup_block: resolved.auto_backup_block,
            auto_backup_wallet_path: overrides.auto_backup_wallet_path.clone().unwrap_or_default(),
            state: ForkState::Inactive,
            activated_before,
            backup_done: activated_before,
            setup_error,
            store,
            wallet_backup: None,
        }
    }

    pub fn with_wallet_backup(mut self, wallet_backup: Arc<dyn WalletBackup>) -> Self {
        self.wallet_backup = Some(wallet_backup);
        self
    }

    fn validate(
        network: NetworkId,
        fork_height: i64,
        fork_id: i64,
        auto_backup_block: Option<i64>,
        activated_before: bool,
    ) -> Result<Resolved, ForkError> {
        if fork_height <= 0 {
            return Err(ForkError::InvalidForkHeight(fork_height));
        }
        let height =
            u32::try_from(fork_height).map_err(|_| ForkError::InvalidForkHeight(fork_height))?;

        let minimum = network.min_fork_height();
        if !activated_before && height < minimum {
            return Err(ForkError::BelowMinimum {
                network,
                height: fork_height,
                minimum,
            });
        }

        if fork_id == 0 {
            tracing::warn!("fork id 0 leaves transactions open to replay on the other chain");
        }
        let id = u32::try_from(fork_id)
            .ok()
            .filter(|id| *id <= MAX_FORK_ID)
            .ok_or(ForkError::InvalidForkId {
                id: fork_id,
                max: MAX_FORK_ID,
            })?;

        let backup_block = auto_backup_block
            .map(|block| u32::try_from(block).map_err(|_| ForkError::InvalidBackupBlock(block)))
            .transpose()?;

        Ok(Resolved {
            fork_height: height,
            fork_id: id,
            auto_backup_block: backup_block,
        })
    }

    /// The best tip reached the fork.
    ///
    /// On the first activation for this data directory, freezes the fork
    /// height at `actual_height`, writes the marker and (when `do_backup` is
    /// set) takes the wallet backup. Without an explicit backup block the
    /// backup is taken at the block before the frozen height. A failed backup is recorded in the marker
    /// and returned; the caller must stop the node. The fork is active
    /// afterwards in every case.
    pub fn activate(&mut self, actual_height: u32, do_backup: bool) -> Result<(), ForkError> {
        let mut outcome = Ok(());

        if self.state == ForkState::Inactive && !self.activated_before {
            tracing::info!(
                actual_height,
                configured_height = self.fork_height,
                "performing one-off fork activation"
            );
            self.fork_height = actual_height;

            let mut marker = ActivationMarker::new(self.fork_height, self.fork_id);
            self.save_marker(&marker);

            if do_backup && !self.backup_done {
                match self.run_backup() {
                    Ok(Some(path)) => {
                        tracing::info!(
                            path = %path.display(),
                            block = self.auto_backup_block(),
                            "wallet backed up"
                        );
                        self.backup_done = true;
                        marker.auto_backup_block = Some(self.auto_backup_block());
                        self.save_marker(&marker);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        tracing::error!(%err, "wallet backup failed during fork activation");
                        marker.error = Some(err.to_string());
                        self.save_marker(&marker);
                        outcome = Err(err);
                    }
                }
            }

            self.activated_before = true;
        }

        if self.state == ForkState::Inactive {
            tracing::info!(fork_height = self.fork_height, "fork active");
        }
        self.state = ForkState::Active;
        outcome
    }

    /// The best tip fell back below the fork.
    pub fn deactivate(&mut self) {
        if self.state == ForkState::Active {
            tracing::warn!(fork_height = self.fork_height, "fork deactivated by reorg");
        }
        self.state = ForkState::Inactive;
    }

    fn run_backup(&self) -> Result<Option<PathBuf>, ForkError> {
        let Some(wallet_backup) = &self.wallet_backup else {
            tracing::debug!("no wallet configured, skipping fork backup");
            return Ok(None);
        };
        let height = self.auto_backup_block();
        match wallet_backup.backup(&self.auto_backup_wallet_path, height) {
            Ok(path) => Ok(Some(path)),
            Err(err @ ForkError::BackupFailed { .. }) => Err(err),
            Err(err) => Err(ForkError::BackupFailed {
                height,
                reason: err.to_string(),
            }),
        }
    }

    fn save_marker(&self, marker: &ActivationMarker) {
        if let Err(err) = self.store.save(marker) {
            tracing::error!(%err, "failed to write activation marker");
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == ForkState::Active
    }

    pub fn state(&self) -> ForkState {
        self.state
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    pub fn resolved_fork_height(&self) -> u32 {
        self.fork_height
    }

    pub fn resolved_fork_id(&self) -> u32 {
        self.fork_id
    }

    pub fn auto_backup_block(&self) -> u32 {
        self.auto_backup_block
            .unwrap_or_else(|| self.fork_height.saturating_sub(1))
    }

    pub fn auto_backup_wallet_path(&self) -> &str {
        &self.auto_backup_wallet_path
    }

    pub fn was_activated_before(&self) -> bool {
        self.activated_before
    }

    pub fn backup_done(&self) -> bool {
        self.backup_done
    }

    pub fn setup_error(&self) -> Option<&ForkError> {
        self.setup_error.as_ref()
    }

    pub fn consensus_id(&self) -> &'static str {
        POST_FORK_CONSENSUS_ID
    }

    pub fn status(&self) -> ForkStatus {
        ForkStatus {
            network: self.network,
            state: self.state,
            fork_height: self.fork_height,
            fork_id: self.fork_id,
            auto_backup_block: self.auto_backup_block(),
            activated_before: self.activated_before,
            backup_done: self.backup_done,
            consensus_id: self.consensus_id().to_string(),
            setup_error: self.setup_error.as_ref().map(ToString::to_string),
        }
    }
}

impl std::fmt::Debug for ForkActivationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForkActivationController")
            .field("network", &self.network)
            .field("state", &self.state)
            .field("fork_height", &self.fork_height)
            .field("fork_id", &self.fork_id)
            .field("activated_before", &self.activated_before)
            .field("backup_done", &self.backup_done)
            .finish_non_exhaustive()
    }
}
