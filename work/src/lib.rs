//! Proof-of-work retarget engine.
//!
//! Pure functions over a [`ChainIndexView`](splitchain_types::ChainIndexView)
//! and [`ConsensusParams`](splitchain_types::ConsensusParams): the next
//! required target (legacy two-week windows before the fork, a fast-converging
//! schedule after it, and a one-off reset at the boundary), proof-of-work
//! checks, and chain-work helpers. Nothing here locks or blocks; callers
//! hold the chain lock while an ancestor walk is in progress.

pub mod chainwork;
pub mod difficulty;
pub mod error;
pub mod validator;

pub use chainwork::{block_proof, block_proof_equivalent_time};
pub use difficulty::{
    calculate_fork_next_work_required, calculate_next_work_required,
    calculate_reset_work_required, next_work_required,
};
pub use error::WorkError;
pub use validator::{check_proof_of_work, verify_proof_of_work};
