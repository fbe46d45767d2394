//! Best-chain tip and the fork trigger.
//!
//! [`ChainState`] is the single mutator of the tip. Each connected block must
//! carry exactly the target the retarget engine requires and satisfy it; when
//! the tip crosses the fork height in either direction the activation
//! controller is told, under the same `&mut self` borrow that moves the tip.

use std::sync::Arc;

use splitchain_fork::{ForkActivationController, ShutdownHook};
use splitchain_types::{BlockHash, BlockIndex, CompactTarget, ConsensusParams};
use splitchain_work::{block_proof, next_work_required, verify_proof_of_work};

use crate::metrics::ForkMetrics;
use crate::NodeError;

/// The header fields the chain state needs to extend the tip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub hash: BlockHash,
    pub time: i64,
    pub bits: CompactTarget,
}

pub struct ChainState {
    params: ConsensusParams,
    fork: ForkActivationController,
    shutdown: Arc<dyn ShutdownHook>,
    metrics: Arc<ForkMetrics>,
    tip: Option<Arc<BlockIndex>>,
    backup_enabled: bool,
    segwit_fork: bool,
}

impl ChainState {
    /// `params.fork_height` is replaced by the controller's resolved height.
    pub fn new(
        params: ConsensusParams,
        fork: ForkActivationController,
        shutdown: Arc<dyn ShutdownHook>,
        metrics: Arc<ForkMetrics>,
    ) -> Self {
        let params = params.with_fork_height(fork.resolved_fork_height());
        Self {
            params,
            fork,
            shutdown,
            metrics,
            tip: None,
            backup_enabled: false,
            segwit_fork: false,
        }
    }

    /// Take the wallet backup on first activation.
    pub fn with_backup(mut self, enabled: bool) -> Self {
        self.backup_enabled = enabled;
        self
    }

    /// Allow [`signal_activation`](Self::signal_activation).
    pub fn with_segwit_fork(mut self, enabled: bool) -> Self {
        self.segwit_fork = enabled;
        self
    }

    pub fn genesis(&mut self, time: i64, bits: CompactTarget) -> Result<Arc<BlockIndex>, NodeError> {
        if self.tip.is_some() {
            return Err(NodeError::AlreadyInitialized);
        }
        let block = Arc::new(BlockIndex::genesis(BlockHash::ZERO, time, bits, block_proof(bits)));
        self.set_tip(Arc::clone(&block));
        Ok(block)
    }

    /// Target the next block must carry if it is timestamped `time`.
    pub fn next_work_required(&self, time: i64) -> CompactTarget {
        next_work_required(self.tip.as_deref(), time, &self.params)
    }

    /// Validate `header` against the tip and make it the new tip.
    ///
    /// Reaching the fork height activates the fork. A fatal activation error
    /// (failed wallet backup) requests a shutdown and is returned; the block
    /// stays connected.
    pub fn connect_block(&mut self, header: BlockHeader) -> Result<Arc<BlockIndex>, NodeError> {
        let tip = self.tip.clone().ok_or(NodeError::NoGenesis)?;
        let height = tip.height + 1;

        let expected = self.next_work_required(header.time);
        if header.bits != expected {
            self.metrics.blocks_rejected.inc();
            tracing::warn!(height, %expected, actual = %header.bits, "block has unexpected bits");
            return Err(NodeError::BadBits {
                height,
                expected,
                actual: header.bits,
            });
        }
        if let Err(err) = verify_proof_of_work(&header.hash, header.bits, &self.params) {
            self.metrics.blocks_rejected.inc();
            if !self.params.force_retarget {
                tracing::warn!(height, %err, "block fails proof of work");
            }
            return Err(err.into());
        }

        if header.bits != tip.bits {
            self.metrics.retargets.inc();
        }
        if height == self.params.fork_height {
            self.metrics.difficulty_resets.inc();
        }

        let block = Arc::new(BlockIndex::child(
            &tip,
            header.hash,
            header.time,
            header.bits,
            block_proof(header.bits),
        ));
        self.set_tip(Arc::clone(&block));
        self.metrics.blocks_connected.inc();
        tracing::debug!(height, bits = %header.bits, "block connected");

        if !self.fork.is_active() && height >= self.fork.resolved_fork_height() {
            self.activate(height)?;
        }
        Ok(block)
    }

    /// Roll the tip back one block, deactivating the fork if the new tip is
    /// below the fork height.
    pub fn disconnect_tip(&mut self) -> Result<Arc<BlockIndex>, NodeError> {
        let tip = self.tip.clone().ok_or(NodeError::NoGenesis)?;
        let prev = tip.prev.clone().ok_or(NodeError::DisconnectGenesis)?;

        self.set_tip(Arc::clone(&prev));
        self.metrics.blocks_disconnected.inc();
        tracing::debug!(height = tip.height, "block disconnected");

        if self.fork.is_active() && prev.height < self.fork.resolved_fork_height() {
            self.fork.deactivate();
            self.metrics.fork_active.set(0);
            self.metrics.deactivations.inc();
        }
        Ok(tip)
    }

    /// Activate on an on-chain signal seen at the current tip.
    ///
    /// The tip was connected under the legacy rules, so the fork height is
    /// frozen at the next block: the tip becomes the last pre-fork block and
    /// the next target carries the difficulty reset.
    ///
    /// Returns whether the call activated the fork; a no-op unless the
    /// signal gate is enabled and the fork is inactive.
    pub fn signal_activation(&mut self) -> Result<bool, NodeError> {
        if !self.segwit_fork {
            tracing::debug!("signal activation disabled");
            return Ok(false);
        }
        if self.fork.is_active() {
            return Ok(false);
        }
        let tip = self.tip.as_ref().ok_or(NodeError::NoGenesis)?.height;
        self.activate(tip + 1)?;
        Ok(true)
    }

    fn activate(&mut self, height: u32) -> Result<(), NodeError> {
        let outcome = self.fork.activate(height, self.backup_enabled);

        // The schedule now starts at the frozen height.
        self.params.fork_height = self.fork.resolved_fork_height();
        self.metrics.fork_active.set(1);
        self.metrics.activations.inc();

        if let Err(err) = outcome {
            tracing::error!(height, %err, "fatal error during fork activation");
            self.shutdown.request_shutdown(&err.to_string());
            return Err(err.into());
        }
        Ok(())
    }

    fn set_tip(&mut self, block: Arc<BlockIndex>) {
        self.metrics.tip_height.set(i64::from(block.height));
        self.metrics.tip_bits.set(i64::from(block.bits.to_bits()));
        self.tip = Some(block);
    }

    pub fn tip(&self) -> Option<&Arc<BlockIndex>> {
        self.tip.as_ref()
    }

    pub fn height(&self) -> Option<u32> {
        self.tip.as_ref().map(|tip| tip.height)
    }

    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    pub fn fork(&self) -> &ForkActivationController {
        &self.fork
    }
}
