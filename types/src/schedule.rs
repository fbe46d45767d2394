//! Height-indexed retarget schedule used after the fork.
//!
//! Right after the fork the chain retargets over a window of a single block,
//! then the window widens step by step until the legacy timespan takes over.
//! The table is plain data so it can be replaced without touching the engine.

use serde::{Deserialize, Serialize};

use crate::TypesError;

/// One row of the schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    /// Inclusive upper bound, in blocks since the fork, covered by this row.
    pub last_block: u32,
    /// Retarget timespan expressed as a multiple of the target spacing.
    pub spacing_multiple: i64,
}

impl Breakpoint {
    pub const fn new(last_block: u32, spacing_multiple: i64) -> Self {
        Self {
            last_block,
            spacing_multiple,
        }
    }
}

const DEFAULT_BREAKPOINTS: [Breakpoint; 9] = [
    Breakpoint::new(7, 1),        // 10 minutes
    Breakpoint::new(46, 6),       // 1 hour
    Breakpoint::new(153, 36),     // 6 hours
    Breakpoint::new(299, 72),     // 12 hours
    Breakpoint::new(1_299, 144),  // 1 day
    Breakpoint::new(4_999, 288),  // 2 days
    Breakpoint::new(9_999, 432),  // 3 days
    Breakpoint::new(14_999, 576), // 4 days
    Breakpoint::new(25_919, 1_152), // 8 days
];

/// Ordered breakpoint table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetargetSchedule {
    breakpoints: Vec<Breakpoint>,
}

impl RetargetSchedule {
    /// Build a schedule, checking that rows are strictly increasing in
    /// `last_block` and non-decreasing in `spacing_multiple`.
    pub fn new(breakpoints: Vec<Breakpoint>) -> Result<Self, TypesError> {
        if breakpoints.is_empty() {
            return Err(TypesError::EmptySchedule);
        }
        for (index, bp) in breakpoints.iter().enumerate() {
            if bp.spacing_multiple <= 0 {
                return Err(TypesError::NonPositiveMultiple(bp.spacing_multiple));
            }
            if index == 0 {
                continue;
            }
            let prev = &breakpoints[index - 1];
            if bp.last_block <= prev.last_block {
                return Err(TypesError::UnorderedSchedule {
                    index,
                    reason: "block bounds must increase",
                });
            }
            if bp.spacing_multiple < prev.spacing_multiple {
                return Err(TypesError::UnorderedSchedule {
                    index,
                    reason: "multiples must not decrease",
                });
            }
        }
        Ok(Self { breakpoints })
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    /// Last block (since the fork) still covered by the table.
    pub fn last_block(&self) -> u32 {
        self.breakpoints
            .last()
            .map(|bp| bp.last_block)
            .unwrap_or_default()
    }

    /// Spacing multiple for a block `blocks_since_fork` after the fork, or
    /// `None` once the table has run out.
    pub fn multiple_at(&self, blocks_since_fork: u32) -> Option<i64> {
        self.breakpoints
            .iter()
            .find(|bp| blocks_since_fork <= bp.last_block)
            .map(|bp| bp.spacing_multiple)
    }
}

impl Default for RetargetSchedule {
    fn default() -> Self {
        Self {
            breakpoints: DEFAULT_BREAKPOINTS.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_valid() {
        let table = RetargetSchedule::default();
        assert_eq!(
            RetargetSchedule::new(table.breakpoints().to_vec()).unwrap(),
            table
        );
        assert_eq!(table.last_block(), 25_919);
    }

    #[test]
    fn lookup_uses_inclusive_upper_bounds() {
        let table = RetargetSchedule::default();
        assert_eq!(table.multiple_at(0), Some(1));
        assert_eq!(table.multiple_at(7), Some(1));
        assert_eq!(table.multiple_at(8), Some(6));
        assert_eq!(table.multiple_at(299), Some(72));
        assert_eq!(table.multiple_at(300), Some(144));
        assert_eq!(table.multiple_at(25_919), Some(1_152));
        assert_eq!(table.multiple_at(25_920), None);
    }

    #[test]
    fn rejects_malformed_tables() {
        assert_eq!(
            RetargetSchedule::new(vec![]).unwrap_err(),
            TypesError::EmptySchedule
        );
        assert!(matches!(
            RetargetSchedule::new(vec![Breakpoint::new(10, 2), Breakpoint::new(10, 3)]),
            Err(TypesError::UnorderedSchedule { index: 1, .. })
        ));
        assert!(matches!(
            RetargetSchedule::new(vec![Breakpoint::new(10, 6), Breakpoint::new(20, 3)]),
            Err(TypesError::UnorderedSchedule { index: 1, .. })
        ));
        assert_eq!(
            RetargetSchedule::new(vec![Breakpoint::new(10, 0)]).unwrap_err(),
            TypesError::NonPositiveMultiple(0)
        );
    }
}
