use splitchain_types::NetworkId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForkError {
    #[error("fork height {0} must be a positive block height")]
    InvalidForkHeight(i64),

    #[error("fork height {height} is below the minimum of {minimum} for the {network} network")]
    BelowMinimum {
        network: NetworkId,
        height: i64,
        minimum: u32,
    },

    #[error("fork id {id} is not in range 0..={max}")]
    InvalidForkId { id: i64, max: u32 },

    #[error("auto backup block {0} is not a valid block height")]
    InvalidBackupBlock(i64),

    #[error("invalid value for `{key}`: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("marker file is missing `{0}`")]
    MissingKey(&'static str),

    #[error("wallet backup at block {height} failed: {reason}")]
    BackupFailed { height: u32, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
