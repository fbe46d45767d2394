//! Fundamental types for the splitchain node.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! 256-bit targets and their compact encoding, block hashes, the read-only chain
//! index view, network identifiers, and the consensus parameters including the
//! post-fork retarget schedule.

pub mod block;
pub mod chain;
pub mod compact;
pub mod error;
pub mod network;
pub mod params;
pub mod schedule;

pub use block::BlockHash;
pub use chain::{BlockIndex, ChainIndexView};
pub use compact::{CompactTarget, DecodedTarget, U256};
pub use error::TypesError;
pub use network::NetworkId;
pub use params::ConsensusParams;
pub use schedule::{Breakpoint, RetargetSchedule};
