use splitchain_fork::ForkError;
use splitchain_types::CompactTarget;
use splitchain_work::WorkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("fork error: {0}")]
    Fork(#[from] ForkError),

    #[error("proof-of-work error: {0}")]
    Work(#[from] WorkError),

    #[error("block {height} has bits {actual}, expected {expected}")]
    BadBits {
        height: u32,
        expected: CompactTarget,
        actual: CompactTarget,
    },

    #[error("chain has no genesis block")]
    NoGenesis,

    #[error("chain already has a genesis block")]
    AlreadyInitialized,

    #[error("cannot disconnect the genesis block")]
    DisconnectGenesis,

    #[error("config error: {0}")]
    Config(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("logging error: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
