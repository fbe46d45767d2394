//! Prometheus metrics for the chain tip and fork activation.
//!
//! [`ForkMetrics`] owns a dedicated [`Registry`]; [`ForkMetrics::encode`]
//! renders it in the Prometheus text exposition format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

use crate::NodeError;

pub struct ForkMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub blocks_connected: IntCounter,
    pub blocks_rejected: IntCounter,
    pub blocks_disconnected: IntCounter,
    /// Blocks whose target differs from their parent's.
    pub retargets: IntCounter,
    /// Blocks carrying the one-off fork-boundary reset.
    pub difficulty_resets: IntCounter,
    pub activations: IntCounter,
    pub deactivations: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// 1 while the fork rules are active.
    pub fork_active: IntGauge,
    pub tip_height: IntGauge,
    /// Compact target of the tip, as an integer.
    pub tip_bits: IntGauge,
}

impl ForkMetrics {
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        let blocks_connected = register_int_counter_with_registry!(
            Opts::new("splitchain_blocks_connected_total", "Blocks connected to the tip"),
            registry
        )?;
        let blocks_rejected = register_int_counter_with_registry!(
            Opts::new(
                "splitchain_blocks_rejected_total",
                "Blocks rejected for wrong bits or insufficient work"
            ),
            registry
        )?;
        let blocks_disconnected = register_int_counter_with_registry!(
            Opts::new("splitchain_blocks_disconnected_total", "Blocks disconnected by reorgs"),
            registry
        )?;
        let retargets = register_int_counter_with_registry!(
            Opts::new("splitchain_retargets_total", "Connected blocks that changed the target"),
            registry
        )?;
        let difficulty_resets = register_int_counter_with_registry!(
            Opts::new(
                "splitchain_difficulty_resets_total",
                "Fork-boundary difficulty resets applied"
            ),
            registry
        )?;
        let activations = register_int_counter_with_registry!(
            Opts::new("splitchain_fork_activations_total", "Fork activations"),
            registry
        )?;
        let deactivations = register_int_counter_with_registry!(
            Opts::new("splitchain_fork_deactivations_total", "Fork deactivations by reorg"),
            registry
        )?;

        let fork_active = register_int_gauge_with_registry!(
            Opts::new("splitchain_fork_active", "Whether the fork rules are active"),
            registry
        )?;
        let tip_height = register_int_gauge_with_registry!(
            Opts::new("splitchain_tip_height", "Height of the best tip"),
            registry
        )?;
        let tip_bits = register_int_gauge_with_registry!(
            Opts::new("splitchain_tip_bits", "Compact target of the best tip"),
            registry
        )?;

        Ok(Self {
            registry,
            blocks_connected,
            blocks_rejected,
            blocks_disconnected,
            retargets,
            difficulty_resets,
            activations,
            deactivations,
            fork_active,
            tip_height,
            tip_bits,
        })
    }

    /// Render every metric in the text exposition format.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()).into())
    }
}
