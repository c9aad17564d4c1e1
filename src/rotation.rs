// 🔄 Rotation Engine - Weekly pool ownership + self-conflict redistribution
//
// Week W, cycle position c = (W - 1) mod N:
//   elder at ordinal k owns pool (k + c) mod N
//   its own family is filtered out and handed to the table's receiver
//
// Pools never change, so consecutive weeks are disjoint and the whole
// assignment repeats every N weeks. The engine holds no mutable state.

use crate::directory::Directory;
use crate::error::{RotationError, RotationResult};
use crate::pools::{BalanceBand, PoolSet};
use crate::redistribution::{fallback_ordinal, find_conflicts, pool_for, Conflict, RedistributionTable};
use crate::roster::Roster;
use anyhow::Result;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

// ============================================================================
// WEEKLY ASSIGNMENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElderAssignment {
    pub elder: String,

    /// Pool rotated in for this week
    pub pool: usize,

    pub families: BTreeSet<String>,
}

/// A filtered family and where it went
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redistribution {
    pub family: String,
    pub owner: String,
    pub receiver: String,

    /// true when the table had no entry and the N/2 fallback was used
    pub fallback: bool,
}

/// Result of one `assign` call. Purely derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyAssignment {
    pub week_index: i64,
    pub cycle_position: usize,

    /// In roster order
    pub elders: Vec<ElderAssignment>,

    pub redistributed: Vec<Redistribution>,
}

impl WeeklyAssignment {
    pub fn families_for(&self, elder: &str) -> Option<&BTreeSet<String>> {
        self.elders
            .iter()
            .find(|a| a.elder == elder)
            .map(|a| &a.families)
    }

    /// elder → families
    pub fn to_map(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.elders
            .iter()
            .map(|a| (a.elder.clone(), a.families.clone()))
            .collect()
    }

    /// Total families handed out (counts duplicates, if any)
    pub fn total_assigned(&self) -> usize {
        self.elders.iter().map(|a| a.families.len()).sum()
    }

    /// Redistributions that went through the fallback
    pub fn anomalies(&self) -> Vec<&Redistribution> {
        self.redistributed.iter().filter(|r| r.fallback).collect()
    }
}

// ============================================================================
// ROTATION ENGINE
// ============================================================================

/// Immutable rotation state: directory, roster, pools and table.
///
/// Built once at startup; `assign` is a pure function of the week index.
#[derive(Debug, Clone)]
pub struct RotationEngine {
    directory: Directory,
    roster: Roster,
    pools: PoolSet,
    table: RedistributionTable,

    /// Reachable conflicts the table does not cover
    gaps: Vec<Conflict>,
}

impl RotationEngine {
    /// Validate configuration, partition once, and check table coverage
    pub fn new(
        directory: Directory,
        roster: Roster,
        table: RedistributionTable,
    ) -> RotationResult<Self> {
        roster.validate_against(&directory)?;
        table.validate(&roster)?;

        let pools = PoolSet::partition(directory.families(), roster.pool_count())?;
        let conflicts = find_conflicts(&roster, &pools);

        let gaps: Vec<Conflict> = table.missing(&conflicts).into_iter().cloned().collect();
        for gap in &gaps {
            warn!(
                cycle_position = gap.cycle_position,
                owner = %gap.owner,
                "redistribution table has no entry for conflict; regenerate the table"
            );
        }

        for entry in table.stale(&conflicts) {
            warn!(
                cycle_position = entry.cycle_position,
                owner = %entry.owner,
                receiver = %entry.receiver,
                "redistribution entry matches no conflict"
            );
        }

        debug!(
            families = directory.len(),
            pools = pools.len(),
            conflicts = conflicts.len(),
            "rotation engine ready"
        );

        Ok(RotationEngine {
            directory,
            roster,
            pools,
            table,
            gaps,
        })
    }

    /// Engine over the embedded reference configuration
    pub fn reference() -> Result<Self> {
        Ok(RotationEngine::new(
            Directory::reference()?,
            Roster::reference()?,
            RedistributionTable::reference()?,
        )?)
    }

    /// N
    pub fn cycle_length(&self) -> usize {
        self.pools.len()
    }

    /// (week_index - 1) mod N, non-negative for any index
    pub fn cycle_position(&self, week_index: i64) -> usize {
        (week_index - 1).rem_euclid(self.cycle_length() as i64) as usize
    }

    /// Compute the assignment for a (continuous) week index
    pub fn assign(&self, week_index: i64) -> WeeklyAssignment {
        let n = self.cycle_length();
        let cycle_position = self.cycle_position(week_index);

        let mut elders = Vec::with_capacity(self.roster.len());
        let mut filtered: Vec<(String, usize)> = Vec::new();

        // First pass: rotate pools in, drop each elder's own family
        for (ordinal, elder) in self.roster.elders().iter().enumerate() {
            let pool = pool_for(ordinal, cycle_position, n);

            let mut families: BTreeSet<String> = self.pools.pool(pool).iter().cloned().collect();
            if families.remove(&elder.family) {
                filtered.push((elder.family.clone(), ordinal));
            }

            elders.push(ElderAssignment {
                elder: elder.name.clone(),
                pool,
                families,
            });
        }

        // Second pass: hand filtered families to their receivers
        let mut redistributed = Vec::with_capacity(filtered.len());

        for (family, owner_ordinal) in filtered {
            let owner = &self.roster.elders()[owner_ordinal].name;

            let (receiver_ordinal, fallback) = match self
                .table
                .receiver(cycle_position, owner)
                .and_then(|name| self.roster.ordinal(name))
            {
                Some(ordinal) => (ordinal, false),
                None => {
                    let ordinal = fallback_ordinal(owner_ordinal, n);
                    warn!(
                        week_index,
                        cycle_position,
                        owner = %owner,
                        receiver = %self.roster.elders()[ordinal].name,
                        "unresolved conflict; using fallback receiver"
                    );
                    (ordinal, true)
                }
            };

            elders[receiver_ordinal].families.insert(family.clone());

            redistributed.push(Redistribution {
                family,
                owner: owner.clone(),
                receiver: elders[receiver_ordinal].elder.clone(),
                fallback,
            });
        }

        WeeklyAssignment {
            week_index,
            cycle_position,
            elders,
            redistributed,
        }
    }

    /// elder → families for a week index
    pub fn compute_assignments(&self, week_index: i64) -> BTreeMap<String, BTreeSet<String>> {
        self.assign(week_index).to_map()
    }

    /// The full family universe
    pub fn all_entities(&self) -> BTreeSet<String> {
        self.directory.families().iter().cloned().collect()
    }

    /// Err on the first conflict the table does not cover
    pub fn ensure_table_complete(&self) -> RotationResult<()> {
        match self.gaps.first() {
            Some(gap) => Err(RotationError::UnresolvedConflict {
                cycle_position: gap.cycle_position,
                owner: gap.owner.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn gaps(&self) -> &[Conflict] {
        &self.gaps
    }

    pub fn balance_band(&self) -> BalanceBand {
        self.pools.balance_band()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn pools(&self) -> &PoolSet {
        &self.pools
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::Elder;
    use chrono::Weekday;

    const KYLE_FAMILY: &str = "Fairman, Kyle & Leigh Ann; Wyatt, Audrey";

    fn engine() -> RotationEngine {
        RotationEngine::reference().unwrap()
    }

    #[test]
    fn test_cycle_position() {
        let engine = engine();

        assert_eq!(engine.cycle_position(1), 0);
        assert_eq!(engine.cycle_position(8), 7);
        assert_eq!(engine.cycle_position(9), 0);
        assert_eq!(engine.cycle_position(0), 7);
        assert_eq!(engine.cycle_position(-7), 0);
    }

    #[test]
    fn test_week_one_pool_ownership() {
        let engine = engine();
        let week = engine.assign(1);

        for (ordinal, assignment) in week.elders.iter().enumerate() {
            assert_eq!(assignment.pool, ordinal);
        }
    }

    #[test]
    fn test_week_one_redistribution() {
        let engine = engine();
        let week = engine.assign(1);

        let kyle = week.families_for("Kyle Fairman").unwrap();
        let jerry = week.families_for("Jerry Wood").unwrap();

        assert!(!kyle.contains(KYLE_FAMILY));
        assert!(jerry.contains(KYLE_FAMILY));
        assert_eq!(kyle.len(), 18);
        assert_eq!(jerry.len(), 20);

        assert_eq!(
            week.redistributed,
            vec![Redistribution {
                family: KYLE_FAMILY.to_string(),
                owner: "Kyle Fairman".to_string(),
                receiver: "Jerry Wood".to_string(),
                fallback: false,
            }]
        );
    }

    #[test]
    fn test_unconflicted_elder_gets_whole_pool() {
        let engine = engine();
        let week = engine.assign(1);

        let alan = week.families_for("Alan Judd").unwrap();
        let pool: BTreeSet<String> = engine.pools().pool(0).iter().cloned().collect();
        assert_eq!(alan, &pool);
    }

    #[test]
    fn test_compute_assignments_covers_universe() {
        let engine = engine();

        for week in 1..=8 {
            let map = engine.compute_assignments(week);
            let union: BTreeSet<String> = map.values().flatten().cloned().collect();

            assert_eq!(union, engine.all_entities());
            assert_eq!(map.values().map(BTreeSet::len).sum::<usize>(), 155);
        }
    }

    #[test]
    fn test_reference_table_complete() {
        let engine = engine();

        assert!(engine.gaps().is_empty());
        assert!(engine.ensure_table_complete().is_ok());
    }

    #[test]
    fn test_missing_entry_uses_fallback() {
        let directory = Directory::reference().unwrap();
        let roster = Roster::reference().unwrap();

        let mut table = RedistributionTable::new();
        for entry in RedistributionTable::reference().unwrap().entries() {
            if entry.owner != "Kyle Fairman" {
                table.insert(entry.cycle_position, &entry.owner, &entry.receiver);
            }
        }

        let engine = RotationEngine::new(directory, roster, table).unwrap();
        assert_eq!(engine.gaps().len(), 1);
        assert_eq!(
            engine.ensure_table_complete(),
            Err(RotationError::UnresolvedConflict {
                cycle_position: 0,
                owner: "Kyle Fairman".to_string(),
            })
        );

        // Kyle is ordinal 5; fallback is ordinal (5 + 4) % 8 = 1
        let week = engine.assign(1);
        assert!(week.families_for("Brian McLaughlin").unwrap().contains(KYLE_FAMILY));
        assert_eq!(week.anomalies().len(), 1);
        assert_eq!(week.anomalies()[0].receiver, "Brian McLaughlin");
    }

    #[test]
    fn test_unknown_owned_family_rejected() {
        let directory = Directory::reference().unwrap();
        let mut elders = Roster::reference().unwrap().elders().to_vec();
        elders[0] = Elder::new("Alan Judd", "Nobody, Here", Weekday::Mon);
        let roster = Roster::new(elders, 8).unwrap();

        let err = RotationEngine::new(directory, roster, RedistributionTable::new()).unwrap_err();
        assert!(matches!(err, RotationError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_assignment_is_pure() {
        let engine = engine();
        assert_eq!(engine.assign(42), engine.assign(42));
    }
}
