// 🔀 Redistribution Table - Reassignment rules as data
//
// When an elder's rotated-in pool holds its own family, that family is
// filtered out and handed to a fixed receiver for that cycle position.
// The table is derived offline (see `derive_table` / rotation-table binary)
// and checked in as JSON; it is never recomputed while assigning.

use crate::error::{RotationError, RotationResult};
use crate::pools::PoolSet;
use crate::roster::Roster;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Reference table for the 8-elder roster and 155-family directory
const REFERENCE_TABLE: &str = include_str!("../data/redistribution.json");

// ============================================================================
// TABLE ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedistributionEntry {
    /// (continuous_week - 1) mod N
    pub cycle_position: usize,

    /// Elder whose own family was filtered out
    pub owner: String,

    /// Elder who absorbs the filtered family
    pub receiver: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TableFile {
    entries: Vec<RedistributionEntry>,
}

// ============================================================================
// REDISTRIBUTION TABLE
// ============================================================================

/// cycle_position → { owner → receiver }
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedistributionTable {
    map: BTreeMap<usize, BTreeMap<String, String>>,
}

impl RedistributionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the embedded reference table
    pub fn reference() -> Result<Self> {
        Self::from_json(REFERENCE_TABLE).context("Failed to parse reference redistribution table")
    }

    /// Load table from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read redistribution table: {:?}", path.as_ref()))?;

        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: TableFile =
            serde_json::from_str(content).context("Failed to parse redistribution table JSON")?;

        Ok(Self::from_entries(file.entries)?)
    }

    /// Serialize as the checked-in JSON layout
    pub fn to_json(&self) -> Result<String> {
        let file = TableFile {
            entries: self.entries(),
        };
        serde_json::to_string_pretty(&file).context("Failed to serialize redistribution table")
    }

    /// Build from entries; an (cycle_position, owner) pair may appear once
    pub fn from_entries(entries: Vec<RedistributionEntry>) -> RotationResult<Self> {
        let mut table = RedistributionTable::new();

        for entry in entries {
            if table.receiver(entry.cycle_position, &entry.owner).is_some() {
                return Err(RotationError::invalid(format!(
                    "redistribution entry for {} at cycle position {} appears twice",
                    entry.owner, entry.cycle_position
                )));
            }
            table.insert(entry.cycle_position, &entry.owner, &entry.receiver);
        }

        Ok(table)
    }

    pub fn insert(&mut self, cycle_position: usize, owner: &str, receiver: &str) {
        self.map
            .entry(cycle_position)
            .or_default()
            .insert(owner.to_string(), receiver.to_string());
    }

    /// Receiver for an owner's filtered family at a cycle position
    pub fn receiver(&self, cycle_position: usize, owner: &str) -> Option<&str> {
        self.map
            .get(&cycle_position)
            .and_then(|owners| owners.get(owner))
            .map(String::as_str)
    }

    /// Flattened entries, ordered by cycle position then owner
    pub fn entries(&self) -> Vec<RedistributionEntry> {
        self.map
            .iter()
            .flat_map(|(&cycle_position, owners)| {
                owners.iter().map(move |(owner, receiver)| RedistributionEntry {
                    cycle_position,
                    owner: owner.clone(),
                    receiver: receiver.clone(),
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.map.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Structural checks against the roster
    pub fn validate(&self, roster: &Roster) -> RotationResult<()> {
        for entry in self.entries() {
            if entry.cycle_position >= roster.pool_count() {
                return Err(RotationError::invalid(format!(
                    "redistribution entry cycle position {} outside 0..{}",
                    entry.cycle_position,
                    roster.pool_count()
                )));
            }

            for name in [&entry.owner, &entry.receiver] {
                if roster.ordinal(name).is_none() {
                    return Err(RotationError::invalid(format!(
                        "redistribution entry names unknown elder: {}",
                        name
                    )));
                }
            }

            if entry.owner == entry.receiver {
                return Err(RotationError::invalid(format!(
                    "redistribution entry hands {}'s family back to {}",
                    entry.owner, entry.receiver
                )));
            }
        }
        Ok(())
    }

    /// Conflicts with no table entry
    pub fn missing<'a>(&self, conflicts: &'a [Conflict]) -> Vec<&'a Conflict> {
        conflicts
            .iter()
            .filter(|c| self.receiver(c.cycle_position, &c.owner).is_none())
            .collect()
    }

    /// Entries that match no conflict (never used)
    pub fn stale(&self, conflicts: &[Conflict]) -> Vec<RedistributionEntry> {
        self.entries()
            .into_iter()
            .filter(|e| {
                !conflicts
                    .iter()
                    .any(|c| c.cycle_position == e.cycle_position && c.owner == e.owner)
            })
            .collect()
    }
}

// ============================================================================
// CONFLICT ANALYSIS
// ============================================================================

/// An elder meeting its own family's pool at some cycle position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub cycle_position: usize,
    pub owner: String,
    pub owner_ordinal: usize,
    pub family: String,
    pub pool: usize,
}

/// Pool an elder at `ordinal` owns at `cycle_position`
pub fn pool_for(ordinal: usize, cycle_position: usize, n: usize) -> usize {
    (ordinal + cycle_position) % n
}

/// Fallback receiver for a conflict missing from the table
pub fn fallback_ordinal(owner_ordinal: usize, n: usize) -> usize {
    (owner_ordinal + n / 2) % n
}

/// Every (cycle position, elder) self-conflict across one full cycle
pub fn find_conflicts(roster: &Roster, pools: &PoolSet) -> Vec<Conflict> {
    let n = pools.len();
    let mut conflicts = Vec::new();

    for cycle_position in 0..n {
        for (ordinal, elder) in roster.elders().iter().enumerate() {
            let pool = pool_for(ordinal, cycle_position, n);

            if pools.home_pool(&elder.family) == Some(pool) {
                conflicts.push(Conflict {
                    cycle_position,
                    owner: elder.name.clone(),
                    owner_ordinal: ordinal,
                    family: elder.family.clone(),
                    pool,
                });
            }
        }
    }

    conflicts
}

/// Per-elder view of one cycle position before redistribution
#[derive(Debug, Clone, Serialize)]
pub struct CycleSlot {
    pub elder: String,
    pub pool: usize,
    pub pool_size: usize,
    pub conflicted: bool,
    pub filtered_size: usize,
}

/// Pool ownership and filtered sizes for every cycle position
pub fn cycle_overview(roster: &Roster, pools: &PoolSet) -> Vec<Vec<CycleSlot>> {
    let n = pools.len();

    (0..n)
        .map(|cycle_position| {
            roster
                .elders()
                .iter()
                .enumerate()
                .map(|(ordinal, elder)| {
                    let pool = pool_for(ordinal, cycle_position, n);
                    let pool_size = pools.pool(pool).len();
                    let conflicted = pools.home_pool(&elder.family) == Some(pool);

                    CycleSlot {
                        elder: elder.name.clone(),
                        pool,
                        pool_size,
                        conflicted,
                        filtered_size: if conflicted { pool_size - 1 } else { pool_size },
                    }
                })
                .collect()
        })
        .collect()
}

// ============================================================================
// OFFLINE DERIVATION
// ============================================================================

/// Derive a redistribution table for a roster and partition.
///
/// For each conflict the receiver must:
/// - not be the owner
/// - not hold the family's home pool in the previous or next week
/// - stay within the balance band after absorbing the family
///
/// Among eligible elders the smallest list wins, then the one furthest
/// from the owner in roster order, then the lowest ordinal.
pub fn derive_table(roster: &Roster, pools: &PoolSet) -> RotationResult<RedistributionTable> {
    let n = pools.len();
    let band = pools.balance_band();
    let overview = cycle_overview(roster, pools);
    let conflicts = find_conflicts(roster, pools);

    let mut table = RedistributionTable::new();

    for (cycle_position, slots) in overview.iter().enumerate() {
        let mut sizes: Vec<usize> = slots.iter().map(|s| s.filtered_size).collect();
        let previous = (cycle_position + n - 1) % n;
        let next = (cycle_position + 1) % n;

        for conflict in conflicts.iter().filter(|c| c.cycle_position == cycle_position) {
            let owner = conflict.owner_ordinal;

            let best = (0..n)
                .filter(|&r| r != owner)
                .filter(|&r| {
                    pool_for(r, previous, n) != conflict.pool && pool_for(r, next, n) != conflict.pool
                })
                .filter(|&r| sizes[r] < band.max)
                .min_by_key(|&r| {
                    let forward = (r + n - owner) % n;
                    let distance = forward.min(n - forward);
                    (sizes[r], n - distance, r)
                })
                .ok_or_else(|| RotationError::NoEligibleReceiver {
                    cycle_position,
                    owner: conflict.owner.clone(),
                })?;

            sizes[best] += 1;
            table.insert(cycle_position, &conflict.owner, &slots[best].elder);
        }
    }

    Ok(table)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::Directory;

    fn reference() -> (Roster, PoolSet) {
        let directory = Directory::reference().unwrap();
        let roster = Roster::reference().unwrap();
        let pools = PoolSet::partition(directory.families(), roster.pool_count()).unwrap();
        (roster, pools)
    }

    #[test]
    fn test_reference_table_loads() {
        let (roster, _) = reference();
        let table = RedistributionTable::reference().unwrap();

        assert_eq!(table.len(), 8);
        assert_eq!(table.receiver(0, "Kyle Fairman"), Some("Jerry Wood"));
        assert_eq!(table.receiver(2, "Larry McDuffee"), Some("Brian McLaughlin"));
        assert_eq!(table.receiver(4, "Kyle Fairman"), None);
        assert!(table.validate(&roster).is_ok());
    }

    #[test]
    fn test_reference_conflicts() {
        let (roster, pools) = reference();
        let conflicts = find_conflicts(&roster, &pools);

        let pairs: Vec<(usize, &str)> = conflicts
            .iter()
            .map(|c| (c.cycle_position, c.owner.as_str()))
            .collect();

        assert_eq!(
            pairs,
            vec![
                (0, "Kyle Fairman"),
                (1, "Frank Bohannon"),
                (1, "Jerry Wood"),
                (2, "Brian McLaughlin"),
                (2, "Larry McDuffee"),
                (3, "L.A. Fox"),
                (5, "Jonathan Loveday"),
                (7, "Alan Judd"),
            ]
        );
    }

    #[test]
    fn test_reference_table_covers_every_conflict() {
        let (roster, pools) = reference();
        let conflicts = find_conflicts(&roster, &pools);
        let table = RedistributionTable::reference().unwrap();

        assert!(table.missing(&conflicts).is_empty());
        assert!(table.stale(&conflicts).is_empty());
    }

    #[test]
    fn test_cycle_overview_sizes() {
        let (roster, pools) = reference();
        let overview = cycle_overview(&roster, &pools);

        // Cycle position 0: Kyle (ordinal 5) holds pool 5, which has his family
        let kyle = &overview[0][5];
        assert_eq!(kyle.pool, 5);
        assert!(kyle.conflicted);
        assert_eq!(kyle.filtered_size, 18);

        let alan = &overview[0][0];
        assert_eq!(alan.pool, 0);
        assert_eq!(alan.filtered_size, 20);
    }

    #[test]
    fn test_derive_table_for_reference() {
        let (roster, pools) = reference();
        let conflicts = find_conflicts(&roster, &pools);
        let table = derive_table(&roster, &pools).unwrap();

        assert!(table.missing(&conflicts).is_empty());
        assert!(table.validate(&roster).is_ok());

        // Receivers are never the owner's roster neighbours
        for entry in table.entries() {
            let owner = roster.ordinal(&entry.owner).unwrap();
            let receiver = roster.ordinal(&entry.receiver).unwrap();
            assert_ne!(receiver, (owner + 1) % 8);
            assert_ne!(receiver, (owner + 7) % 8);
        }
    }

    #[test]
    fn test_derive_table_fails_for_tiny_roster() {
        use crate::roster::Elder;
        use chrono::Weekday;

        let roster = Roster::new(
            vec![
                Elder::new("A", "A, One", Weekday::Mon),
                Elder::new("B", "B, Two", Weekday::Tue),
            ],
            2,
        )
        .unwrap();
        let families = vec!["A, One".to_string(), "B, Two".to_string()];
        let pools = PoolSet::partition(&families, 2).unwrap();

        let err = derive_table(&roster, &pools).unwrap_err();
        assert!(matches!(err, RotationError::NoEligibleReceiver { .. }));
    }

    #[test]
    fn test_json_round_trip_preserves_entries() {
        let table = RedistributionTable::reference().unwrap();
        let json = table.to_json().unwrap();
        let reloaded = RedistributionTable::from_json(&json).unwrap();

        assert_eq!(table, reloaded);
    }

    #[test]
    fn test_duplicate_entry_rejected() {
        let entry = RedistributionEntry {
            cycle_position: 0,
            owner: "A".to_string(),
            receiver: "B".to_string(),
        };

        assert!(RedistributionTable::from_entries(vec![entry.clone(), entry]).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_entries() {
        let (roster, _) = reference();

        let mut table = RedistributionTable::new();
        table.insert(0, "Kyle Fairman", "Nobody");
        assert!(table.validate(&roster).is_err());

        let mut table = RedistributionTable::new();
        table.insert(0, "Kyle Fairman", "Kyle Fairman");
        assert!(table.validate(&roster).is_err());

        let mut table = RedistributionTable::new();
        table.insert(8, "Kyle Fairman", "Jerry Wood");
        assert!(table.validate(&roster).is_err());
    }

    #[test]
    fn test_fallback_ordinal() {
        assert_eq!(fallback_ordinal(5, 8), 1);
        assert_eq!(fallback_ordinal(0, 8), 4);
    }
}
