//! Read-only view of the block index used by the retarget engine.
//!
//! Ancestor walks are unsynchronized: callers must hold whatever lock guards
//! the chain structure for the duration of an engine call.

use std::sync::Arc;

use crate::block::BlockHash;
use crate::compact::{CompactTarget, U256};

/// Ancestry access needed to compute the next target.
pub trait ChainIndexView: Sized {
    fn height(&self) -> u32;

    /// Block timestamp in seconds.
    fn time(&self) -> i64;

    fn bits(&self) -> CompactTarget;

    /// Cumulative work of the chain up to and including this block.
    fn chain_work(&self) -> U256;

    fn previous(&self) -> Option<&Self>;

    /// Ancestor at `height`, or `None` when `height` is above this block.
    fn ancestor(&self, height: u32) -> Option<&Self> {
        if height > self.height() {
            return None;
        }
        let mut walk = self;
        while walk.height() > height {
            walk = walk.previous()?;
        }
        Some(walk)
    }
}

/// An immutable, reference-counted block index entry.
///
/// Each entry points at its parent, so a tip handle keeps its whole ancestry
/// alive and can be shared between threads without further locking.
#[derive(Clone, Debug)]
pub struct BlockIndex {
    pub hash: BlockHash,
    pub height: u32,
    pub time: i64,
    pub bits: CompactTarget,
    pub chain_work: U256,
    pub prev: Option<Arc<BlockIndex>>,
}

impl BlockIndex {
    pub fn genesis(hash: BlockHash, time: i64, bits: CompactTarget, work: U256) -> Self {
        Self {
            hash,
            height: 0,
            time,
            bits,
            chain_work: work,
            prev: None,
        }
    }

    /// Build the child of `prev`, adding `work` to its cumulative chain work.
    ///
    /// Chain work saturates at the largest 256-bit value.
    pub fn child(
        prev: &Arc<BlockIndex>,
        hash: BlockHash,
        time: i64,
        bits: CompactTarget,
        work: U256,
    ) -> Self {
        let chain_work = prev
            .chain_work
            .checked_add(work)
            .unwrap_or_else(U256::max_value);
        Self {
            hash,
            height: prev.height + 1,
            time,
            bits,
            chain_work,
            prev: Some(Arc::clone(prev)),
        }
    }
}

impl ChainIndexView for BlockIndex {
    fn height(&self) -> u32 {
        self.height
    }

    fn time(&self) -> i64 {
        self.time
    }

    fn bits(&self) -> CompactTarget {
        self.bits
    }

    fn chain_work(&self) -> U256 {
        self.chain_work
    }

    fn previous(&self) -> Option<&Self> {
        self.prev.as_deref()
    }
}
