//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use splitchain_fork::ForkOverrides;
use splitchain_types::{ConsensusParams, NetworkId};

use crate::NodeError;

/// Configuration for a splitchain node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Command-line flags are layered on
/// top by the daemon; the activation marker in `data_dir` outranks both for
/// the fork height, fork id and backup block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Which network to follow.
    #[serde(default = "default_network")]
    pub network: NetworkId,

    /// Data directory holding the activation marker and wallet.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Wallet file name inside `data_dir`; may contain `@`.
    #[serde(default = "default_wallet_file")]
    pub wallet_file: String,

    /// Run without a wallet; no backup is taken at the fork.
    #[serde(default)]
    pub disable_wallet: bool,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to collect Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,

    #[serde(default)]
    pub fork: ForkConfig,
}

/// The `[fork]` table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkConfig {
    /// Trigger height; defaults per network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fork_height: Option<i64>,

    /// Fork id in the reserved 24-bit space.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fork_id: Option<i64>,

    /// Block whose wallet state is backed up; defaults to the block before the fork.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_backup_block: Option<i64>,

    /// Backup destination, relative to `data_dir` unless absolute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_backup_wallet_path: Option<String>,

    /// Test-only: retarget even where the network normally does not.
    #[serde(default)]
    pub force_retarget: bool,

    /// Allow activation by on-chain signal instead of height alone.
    #[serde(default)]
    pub segwit_fork: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_network() -> NetworkId {
    NetworkId::Regtest
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./splitchain_data")
}

fn default_wallet_file() -> String {
    "wallet.dat".to_string()
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Fork settings as handed to the activation controller.
    pub fn fork_overrides(&self) -> ForkOverrides {
        ForkOverrides {
            fork_height: self.fork.fork_height,
            fork_id: self.fork.fork_id,
            auto_backup_block: self.fork.auto_backup_block,
            auto_backup_wallet_path: self.fork.auto_backup_wallet_path.clone(),
        }
    }

    /// Consensus parameters for the configured network.
    ///
    /// The fork height is the network default here; the chain state replaces
    /// it with the controller's resolved height.
    pub fn consensus_params(&self) -> ConsensusParams {
        ConsensusParams::for_network(self.network).with_force_retarget(self.fork.force_retarget)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            data_dir: default_data_dir(),
            wallet_file: default_wallet_file(),
            disable_wallet: false,
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
            fork: ForkConfig::default(),
        }
    }
}
