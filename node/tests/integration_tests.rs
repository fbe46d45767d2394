//! Integration tests driving the chain state across the fork:
//! header → bits check → proof of work → tip update → activation → marker/backup.
//!
//! These wire the retarget engine, the activation controller and the node's
//! file-backed collaborators together the way the daemon does.

use std::fs;
use std::sync::Arc;

use proptest::prelude::*;

use splitchain_fork::{
    ActivationMarker, FileMarkerStore, ForkActivationController, ForkOverrides, MarkerStore,
    ShutdownHook,
};
use splitchain_node::{
    BlockHeader, ChainState, FileWalletBackup, ForkMetrics, NodeError, ShutdownController,
};
use splitchain_nullables::{NullMarkerStore, NullShutdown, NullWalletBackup};
use splitchain_types::{BlockHash, CompactTarget, ConsensusParams, NetworkId, U256};
use splitchain_work::block_proof;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SPACING: i64 = 600;

struct Node {
    chain: ChainState,
    store: Arc<NullMarkerStore>,
    backup: Arc<NullWalletBackup>,
    shutdown: Arc<NullShutdown>,
    metrics: Arc<ForkMetrics>,
}

fn regtest_node(overrides: ForkOverrides) -> Node {
    node_with(ConsensusParams::regtest(), overrides)
}

fn node_with(params: ConsensusParams, overrides: ForkOverrides) -> Node {
    let store = Arc::new(NullMarkerStore::new());
    let backup = Arc::new(NullWalletBackup::new());
    let shutdown = Arc::new(NullShutdown::new());
    let metrics = Arc::new(ForkMetrics::new().expect("metrics"));

    let fork =
        ForkActivationController::setup(NetworkId::Regtest, &overrides, store.clone(), &*shutdown)
            .with_wallet_backup(backup.clone());
    let bits = params.pow_limit_bits();
    let mut chain = ChainState::new(params, fork, shutdown.clone(), metrics.clone()).with_backup(true);
    chain.genesis(0, bits).expect("genesis");

    Node {
        chain,
        store,
        backup,
        shutdown,
        metrics,
    }
}

/// Header for the next block, `SPACING` seconds after the tip, at the required bits.
fn next_header(chain: &ChainState) -> BlockHeader {
    let time = chain.tip().map(|tip| tip.time).unwrap_or_default() + SPACING;
    BlockHeader {
        hash: BlockHash::ZERO,
        time,
        bits: chain.next_work_required(time),
    }
}

fn mine_to(chain: &mut ChainState, height: u32) {
    while chain.height().unwrap_or_default() < height {
        let header = next_header(chain);
        chain.connect_block(header).expect("block connects");
    }
}

// ---------------------------------------------------------------------------
// 1. Activation on height crossing
// ---------------------------------------------------------------------------

#[test]
fn fork_activates_at_trigger_height() {
    let mut node = regtest_node(ForkOverrides::default());

    mine_to(&mut node.chain, 99);
    assert!(!node.chain.fork().is_active());
    assert!(node.store.current().is_none());

    mine_to(&mut node.chain, 100);
    assert!(node.chain.fork().is_active());
    assert_eq!(node.backup.calls(), vec![(String::new(), 99)]);
    assert_eq!(
        node.store.current(),
        Some(ActivationMarker {
            fork_height: 100,
            fork_id: 0x55_5555,
            auto_backup_block: Some(99),
            error: None,
        })
    );
    assert_eq!(node.metrics.fork_active.get(), 1);
    assert_eq!(node.metrics.activations.get(), 1);
    assert_eq!(node.metrics.tip_height.get(), 100);
    assert!(!node.shutdown.requested());
}

#[test]
fn reorg_below_fork_deactivates_without_repeating_side_effects() {
    let mut node = regtest_node(ForkOverrides::default());
    mine_to(&mut node.chain, 101);
    let saves = node.store.save_count();

    node.chain.disconnect_tip().unwrap();
    assert!(node.chain.fork().is_active(), "tip 100 is still at the fork");

    node.chain.disconnect_tip().unwrap();
    assert_eq!(node.chain.height(), Some(99));
    assert!(!node.chain.fork().is_active());
    assert!(node.chain.fork().was_activated_before());
    assert_eq!(node.metrics.deactivations.get(), 1);

    mine_to(&mut node.chain, 100);
    assert!(node.chain.fork().is_active());
    assert_eq!(node.backup.calls().len(), 1);
    assert_eq!(node.store.save_count(), saves);
}

#[test]
fn genesis_cannot_be_disconnected() {
    let mut node = regtest_node(ForkOverrides::default());
    assert!(matches!(
        node.chain.disconnect_tip(),
        Err(NodeError::DisconnectGenesis)
    ));
    assert!(matches!(
        node.chain.genesis(0, CompactTarget::new(0x207f_ffff)),
        Err(NodeError::AlreadyInitialized)
    ));
}

// ---------------------------------------------------------------------------
// 2. Header validation
// ---------------------------------------------------------------------------

#[test]
fn wrong_bits_are_rejected() {
    let mut node = regtest_node(ForkOverrides::default());
    let mut header = next_header(&node.chain);
    header.bits = CompactTarget::new(0x1d00_ffff);

    assert!(matches!(
        node.chain.connect_block(header),
        Err(NodeError::BadBits { height: 1, .. })
    ));
    assert_eq!(node.chain.height(), Some(0));
    assert_eq!(node.metrics.blocks_rejected.get(), 1);
}

#[test]
fn insufficient_work_is_rejected() {
    let mut node = regtest_node(ForkOverrides::default());
    let mut header = next_header(&node.chain);
    header.hash = BlockHash::new([0xff; 32]);

    assert!(matches!(
        node.chain.connect_block(header),
        Err(NodeError::Work(_))
    ));
    assert_eq!(node.chain.height(), Some(0));
}

#[test]
fn chain_work_accumulates_block_proofs() {
    let mut node = regtest_node(ForkOverrides::default());
    mine_to(&mut node.chain, 10);
    let proof = block_proof(ConsensusParams::regtest().pow_limit_bits());
    let tip = node.chain.tip().unwrap();
    assert_eq!(tip.chain_work, proof * U256::from(11u64));
}

// ---------------------------------------------------------------------------
// 3. Fatal activation failures
// ---------------------------------------------------------------------------

#[test]
fn failed_backup_stops_the_node() {
    let node = regtest_node(ForkOverrides::default());
    node.backup.set_failing(true);
    let mut chain = node.chain;

    mine_to(&mut chain, 99);
    let header = next_header(&chain);
    let err = chain.connect_block(header).unwrap_err();

    assert!(matches!(err, NodeError::Fork(_)));
    assert!(chain.fork().is_active());
    assert_eq!(chain.height(), Some(100));
    assert!(node.shutdown.requested());
    assert!(node.store.current().and_then(|m| m.error).is_some());
}

#[test]
fn invalid_configuration_requests_shutdown() {
    let shutdown = ShutdownController::new();
    let fork = ForkActivationController::setup(
        NetworkId::Main,
        &ForkOverrides {
            fork_id: Some(0x100_0000),
            ..Default::default()
        },
        Arc::new(NullMarkerStore::new()),
        &shutdown,
    );
    assert!(fork.setup_error().is_some());
    assert!(shutdown.is_requested());
}

// ---------------------------------------------------------------------------
// 4. Soft-signal activation
// ---------------------------------------------------------------------------

#[test]
fn signal_activation_is_gated() {
    let mut node = regtest_node(ForkOverrides::default());
    mine_to(&mut node.chain, 40);
    assert!(!node.chain.signal_activation().unwrap());
    assert!(!node.chain.fork().is_active());

    let mut chain = node.chain.with_segwit_fork(true);
    assert!(chain.signal_activation().unwrap());
    assert!(chain.fork().is_active());
    assert_eq!(chain.fork().resolved_fork_height(), 41);
    assert_eq!(chain.params().fork_height, 41);
    assert_eq!(node.store.current().map(|m| m.fork_height), Some(41));
    assert_eq!(node.backup.calls(), vec![(String::new(), 40)]);

    // Already active: nothing more to do.
    assert!(!chain.signal_activation().unwrap());

    // The next block is the first post-fork block.
    mine_to(&mut chain, 41);
    assert!(chain.fork().is_active());
    assert_eq!(node.metrics.difficulty_resets.get(), 1);
}

/// Main-net rules from a genesis well below the limit, so the reset is visible.
fn main_chain(overrides: ForkOverrides, segwit_fork: bool) -> (ChainState, Arc<ForkMetrics>) {
    let shutdown = Arc::new(NullShutdown::new());
    let metrics = Arc::new(ForkMetrics::new().expect("metrics"));
    let fork = ForkActivationController::setup(
        NetworkId::Regtest,
        &overrides,
        Arc::new(NullMarkerStore::new()),
        &*shutdown,
    );
    let mut chain = ChainState::new(ConsensusParams::main(), fork, shutdown, metrics.clone())
        .with_segwit_fork(segwit_fork);
    chain.genesis(0, CompactTarget::new(0x1c00_ffff)).expect("genesis");
    (chain, metrics)
}

#[test]
fn signal_activation_applies_the_difficulty_reset() {
    let (mut signalled, metrics) = main_chain(
        ForkOverrides {
            fork_height: Some(5_000),
            ..Default::default()
        },
        true,
    );
    mine_to(&mut signalled, 2_100);
    let before = signalled.tip().unwrap().bits;
    assert!(signalled.signal_activation().unwrap());
    mine_to(&mut signalled, 2_101);
    let reset = signalled.tip().unwrap().bits;

    // The 2 016-block window is exactly on target, so the reset is a plain x4.
    let expected = CompactTarget::from_target(&(before.decode().value * U256::from(4u64)));
    assert_eq!(reset, expected);
    assert_ne!(reset, before);
    assert_eq!(metrics.difficulty_resets.get(), 1);

    // Same bits as a chain whose configured height is that block.
    let (mut scheduled, _) = main_chain(
        ForkOverrides {
            fork_height: Some(2_101),
            ..Default::default()
        },
        false,
    );
    mine_to(&mut scheduled, 2_101);
    assert_eq!(scheduled.tip().unwrap().bits, reset);
}

// ---------------------------------------------------------------------------
// 5. Retargeting through the fork on a retargeting network
// ---------------------------------------------------------------------------

#[test]
fn difficulty_resets_at_fork_and_then_retargets_every_block() {
    // Main-net arithmetic with a regtest-sized fork height.
    let params = ConsensusParams::main().with_fork_height(0);
    let mut node = node_with(
        params,
        ForkOverrides {
            fork_height: Some(2_100),
            ..Default::default()
        },
    );
    assert_eq!(node.chain.params().fork_height, 2_100);

    mine_to(&mut node.chain, 2_099);
    let before = node.chain.tip().unwrap().bits;

    mine_to(&mut node.chain, 2_100);
    let reset = node.chain.tip().unwrap().bits;
    // The legacy retarget at 2016 left the target just under the limit, so
    // quadrupling it saturates.
    assert_eq!(reset, node.chain.params().pow_limit_bits());
    assert_ne!(reset, before);
    assert_eq!(node.metrics.difficulty_resets.get(), 1);
    assert!(node.chain.fork().is_active());

    // One-block windows: a slow block eases the target, capped at the limit.
    let tip_time = node.chain.tip().unwrap().time;
    let header = BlockHeader {
        hash: BlockHash::ZERO,
        time: tip_time + 2 * SPACING,
        bits: node.chain.next_work_required(tip_time + 2 * SPACING),
    };
    node.chain.connect_block(header).unwrap();
    let next = node.chain.next_work_required(tip_time + 3 * SPACING);
    assert_eq!(next, node.chain.params().pow_limit_bits());

    // A rushed block tightens it by the fast-window ratio bound.
    let tip_time = node.chain.tip().unwrap().time;
    let rushed = BlockHeader {
        hash: BlockHash::ZERO,
        time: tip_time + 1,
        bits: node.chain.next_work_required(tip_time + 1),
    };
    node.chain.connect_block(rushed).unwrap();
    let tightened = node.chain.next_work_required(tip_time + 2);
    let limit = node.chain.params().pow_limit;
    assert_eq!(
        tightened,
        CompactTarget::from_target(&(limit / U256::from(10u64)))
    );
}

// ---------------------------------------------------------------------------
// 6. File-backed collaborators
// ---------------------------------------------------------------------------

#[test]
fn file_backed_activation_and_restart() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("wallet.dat"), b"wallet").unwrap();
    let shutdown = Arc::new(ShutdownController::new());
    let metrics = Arc::new(ForkMetrics::new().unwrap());
    let overrides = ForkOverrides {
        auto_backup_wallet_path: Some("backups".into()),
        ..Default::default()
    };

    let build = |metrics: Arc<ForkMetrics>| {
        let fork = ForkActivationController::setup(
            NetworkId::Regtest,
            &overrides,
            Arc::new(FileMarkerStore::new(dir.path())),
            &*shutdown,
        )
        .with_wallet_backup(Arc::new(FileWalletBackup::new(dir.path(), "wallet.dat")));
        let params = ConsensusParams::regtest();
        let bits = params.pow_limit_bits();
        let hook: Arc<dyn ShutdownHook> = shutdown.clone();
        let mut chain = ChainState::new(params, fork, hook, metrics).with_backup(true);
        chain.genesis(0, bits).unwrap();
        chain
    };

    let mut chain = build(metrics.clone());
    mine_to(&mut chain, 100);
    assert!(chain.fork().is_active());
    assert_eq!(
        fs::read(dir.path().join("backups/wallet.dat.auto.99.bak")).unwrap(),
        b"wallet"
    );
    let marker = FileMarkerStore::new(dir.path()).load().unwrap().unwrap();
    assert_eq!(marker.fork_height, 100);
    assert_eq!(marker.auto_backup_block, Some(99));

    // A restart replays the chain; the marker suppresses a second backup.
    fs::write(dir.path().join("wallet.dat"), b"changed").unwrap();
    let mut chain = build(Arc::new(ForkMetrics::new().unwrap()));
    assert!(chain.fork().was_activated_before());
    mine_to(&mut chain, 100);
    assert!(chain.fork().is_active());
    assert_eq!(
        fs::read(dir.path().join("backups/wallet.dat.auto.99.bak")).unwrap(),
        b"wallet"
    );
    assert!(!dir.path().join("backups/wallet.dat.auto.99.bak.old").exists());
    assert!(!shutdown.is_requested());
}

proptest! {
    /// Any walk of connects and disconnects leaves the fork active exactly
    /// when the tip is at or above the fork height, with one backup at most.
    #[test]
    fn activation_follows_tip_height(steps in prop::collection::vec(prop::bool::weighted(0.7), 1..300)) {
        let mut node = regtest_node(ForkOverrides::default());
        for connect in steps {
            if connect {
                let header = next_header(&node.chain);
                node.chain.connect_block(header).unwrap();
            } else if node.chain.height() > Some(0) {
                node.chain.disconnect_tip().unwrap();
            }
            let height = node.chain.height().unwrap();
            prop_assert_eq!(node.chain.fork().is_active(), height >= 100);
            prop_assert_eq!(node.metrics.fork_active.get(), i64::from(height >= 100));
        }
        prop_assert!(node.backup.calls().len() <= 1);
    }
}
