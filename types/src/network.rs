//! Network identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// Default fork id used for the post-fork signature domain.
pub const DEFAULT_FORK_ID: u32 = 0x55_5555;

/// Fork ids occupy a reserved 24-bit space.
pub const MAX_FORK_ID: u32 = 0xff_ffff;

/// Identifies which chain a node is connected to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    /// The production network.
    Main,
    /// The public test network.
    Test,
    /// The no-limit test network.
    Nol,
    /// Local regression-test network.
    Regtest,
}

impl NetworkId {
    pub const ALL: [NetworkId; 4] = [Self::Main, Self::Test, Self::Nol, Self::Regtest];

    /// Fork trigger height used when no override is configured.
    pub fn default_fork_height(&self) -> u32 {
        match self {
            Self::Main => 666_666,
            Self::Test => 1_000_000,
            Self::Nol => 1_000,
            Self::Regtest => 100,
        }
    }

    /// Lowest trigger height accepted on an instance that has not forked yet.
    ///
    /// Currently the same as the default, but kept separate so the two can diverge.
    pub fn min_fork_height(&self) -> u32 {
        self.default_fork_height()
    }

    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Test => "test",
            Self::Nol => "nol",
            Self::Regtest => "regtest",
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "main" | "mainnet" => Ok(Self::Main),
            "test" | "testnet" => Ok(Self::Test),
            "nol" | "nolnet" => Ok(Self::Nol),
            "regtest" => Ok(Self::Regtest),
            other => Err(TypesError::UnknownNetwork(other.to_string())),
        }
    }
}
