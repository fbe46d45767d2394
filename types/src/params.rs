//! Consensus parameters: proof-of-work limits and the post-fork retarget model.
//!
//! Created once at startup from the network selection plus any runtime
//! overrides, then treated as immutable by the retarget engine.

use crate::compact::{CompactTarget, U256};
use crate::network::NetworkId;
use crate::schedule::RetargetSchedule;

/// Seconds between blocks the difficulty aims for.
pub const TARGET_SPACING_SECS: i64 = 10 * 60;

/// Legacy retarget window: two weeks.
pub const TARGET_TIMESPAN_SECS: i64 = 14 * 24 * 60 * 60;

/// Length of the post-fork retarget period, in days of blocks.
pub const RETARGET_PERIOD_DAYS: i64 = 180;

/// Divisor applied to the observed timespan by the one-off difficulty reset.
pub const DEFAULT_RESET_DROP_FACTOR: i64 = 4;

/// Parameters that influence target computation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsensusParams {
    pub network: NetworkId,
    /// Easiest allowed target.
    pub pow_limit: U256,
    pub pow_target_spacing: i64,
    pub pow_target_timespan: i64,
    /// Testnet rule: a block may fall back to `pow_limit` after a long gap.
    pub allow_min_difficulty_blocks: bool,
    pub no_retargeting: bool,
    /// Test-only switch that retargets even where the network normally does not
    /// and silences proof-of-work rejection diagnostics.
    pub force_retarget: bool,
    /// Height of the first block under the new rules.
    pub fork_height: u32,
    /// Number of blocks after the fork during which the schedule applies;
    /// `None` keeps the fork-aware path active forever.
    pub retarget_period_blocks: Option<u32>,
    pub reset_drop_factor: i64,
    pub schedule: RetargetSchedule,
}

impl ConsensusParams {
    pub fn for_network(network: NetworkId) -> Self {
        match network {
            NetworkId::Main => Self::main(),
            NetworkId::Test => Self::test(),
            NetworkId::Nol => Self {
                network: NetworkId::Nol,
                fork_height: NetworkId::Nol.default_fork_height(),
                ..Self::test()
            },
            NetworkId::Regtest => Self::regtest(),
        }
    }

    pub fn main() -> Self {
        Self {
            network: NetworkId::Main,
            pow_limit: CompactTarget::new(0x1d00_ffff).decode().value,
            pow_target_spacing: TARGET_SPACING_SECS,
            pow_target_timespan: TARGET_TIMESPAN_SECS,
            allow_min_difficulty_blocks: false,
            no_retargeting: false,
            force_retarget: false,
            fork_height: NetworkId::Main.default_fork_height(),
            retarget_period_blocks: Some(default_retarget_period(TARGET_SPACING_SECS)),
            reset_drop_factor: DEFAULT_RESET_DROP_FACTOR,
            schedule: RetargetSchedule::default(),
        }
    }

    pub fn test() -> Self {
        Self {
            network: NetworkId::Test,
            allow_min_difficulty_blocks: true,
            fork_height: NetworkId::Test.default_fork_height(),
            ..Self::main()
        }
    }

    pub fn regtest() -> Self {
        Self {
            network: NetworkId::Regtest,
            pow_limit: CompactTarget::new(0x207f_ffff).decode().value,
            allow_min_difficulty_blocks: true,
            no_retargeting: true,
            fork_height: NetworkId::Regtest.default_fork_height(),
            ..Self::main()
        }
    }

    pub fn with_fork_height(mut self, fork_height: u32) -> Self {
        self.fork_height = fork_height;
        self
    }

    pub fn with_force_retarget(mut self, force_retarget: bool) -> Self {
        self.force_retarget = force_retarget;
        self
    }

    pub fn with_schedule(mut self, schedule: RetargetSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn pow_limit_bits(&self) -> CompactTarget {
        CompactTarget::from_target(&self.pow_limit)
    }

    /// Legacy number of blocks between retargets.
    pub fn difficulty_adjustment_interval(&self) -> i64 {
        self.pow_target_timespan / self.pow_target_spacing
    }

    /// Whether retargeting is switched off for this network (and not forced on).
    pub fn retargeting_disabled(&self) -> bool {
        self.no_retargeting && !self.force_retarget
    }

    /// Whether the testnet minimum-difficulty exception is in effect.
    pub fn min_difficulty_exception(&self) -> bool {
        self.allow_min_difficulty_blocks && !self.force_retarget
    }

    pub fn retarget_period_end(&self) -> Option<u32> {
        self.retarget_period_blocks
            .map(|blocks| self.fork_height.saturating_add(blocks))
    }

    pub fn is_within_retarget_period(&self, height: u32) -> bool {
        if height < self.fork_height {
            return false;
        }
        match self.retarget_period_end() {
            Some(end) => height < end,
            None => true,
        }
    }

    /// Retarget timespan in force at `height`.
    pub fn target_timespan_at(&self, height: u32) -> i64 {
        if !self.is_within_retarget_period(height) {
            return self.pow_target_timespan;
        }
        self.schedule
            .multiple_at(height - self.fork_height)
            .map(|multiple| multiple * self.pow_target_spacing)
            .unwrap_or(self.pow_target_timespan)
    }

    /// Blocks between retargets at `height`; never zero.
    pub fn adjustment_interval_at(&self, height: u32) -> i64 {
        (self.target_timespan_at(height) / self.pow_target_spacing).max(1)
    }
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self::main()
    }
}

fn default_retarget_period(spacing: i64) -> u32 {
    (RETARGET_PERIOD_DAYS * 24 * 60 * 60 / spacing) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Breakpoint;

    #[test]
    fn legacy_interval_is_2016() {
        assert_eq!(ConsensusParams::main().difficulty_adjustment_interval(), 2016);
    }

    #[test]
    fn pow_limits_encode_to_known_bits() {
        assert_eq!(ConsensusParams::main().pow_limit_bits().to_bits(), 0x1d00_ffff);
        assert_eq!(ConsensusParams::regtest().pow_limit_bits().to_bits(), 0x207f_ffff);
    }

    #[test]
    fn before_fork_uses_legacy_timespan() {
        let params = ConsensusParams::main().with_fork_height(1_000);
        assert!(!params.is_within_retarget_period(999));
        assert_eq!(params.target_timespan_at(999), TARGET_TIMESPAN_SECS);
        assert_eq!(params.adjustment_interval_at(999), 2016);
    }

    #[test]
    fn schedule_starts_at_fork_height() {
        let params = ConsensusParams::main().with_fork_height(1_000);
        assert!(params.is_within_retarget_period(1_000));
        assert_eq!(params.target_timespan_at(1_000), 600);
        assert_eq!(params.adjustment_interval_at(1_000), 1);
        assert_eq!(params.target_timespan_at(1_008), 3_600);
        assert_eq!(params.adjustment_interval_at(1_008), 6);
    }

    #[test]
    fn bounded_period_ends() {
        let params = ConsensusParams::main().with_fork_height(1_000);
        assert_eq!(params.retarget_period_end(), Some(1_000 + 25_920));
        assert!(params.is_within_retarget_period(26_919));
        assert!(!params.is_within_retarget_period(26_920));
        assert_eq!(params.target_timespan_at(26_920), TARGET_TIMESPAN_SECS);
    }

    #[test]
    fn unbounded_period_falls_back_after_table() {
        let params = ConsensusParams {
            retarget_period_blocks: None,
            ..ConsensusParams::main().with_fork_height(10)
        };
        assert!(params.is_within_retarget_period(u32::MAX));
        assert_eq!(params.target_timespan_at(10 + 25_920), TARGET_TIMESPAN_SECS);
    }

    #[test]
    fn custom_schedule_is_swappable() {
        let schedule = RetargetSchedule::new(vec![Breakpoint::new(2, 3)]).unwrap();
        let params = ConsensusParams::main()
            .with_fork_height(50)
            .with_schedule(schedule);
        assert_eq!(params.target_timespan_at(52), 1_800);
        assert_eq!(params.target_timespan_at(53), TARGET_TIMESPAN_SECS);
    }

    #[test]
    fn force_retarget_overrides_network_flags() {
        let params = ConsensusParams::regtest();
        assert!(params.retargeting_disabled());
        assert!(params.min_difficulty_exception());
        let forced = params.with_force_retarget(true);
        assert!(!forced.retargeting_disabled());
        assert!(!forced.min_difficulty_exception());
    }
}
