// 🎱 Pool Partitioner - Round-robin split of the family universe
//
// Family at sorted position i goes to pool i mod N. Sizes differ by at
// most one, so no rebalancing pass exists (or is correct to add).

use crate::error::{RotationError, RotationResult};
use std::collections::HashMap;

/// Accepted per-elder list sizes: one either side of floor(U / N).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceBand {
    pub min: usize,
    pub max: usize,
}

impl BalanceBand {
    pub fn for_universe(total: usize, n: usize) -> Self {
        let base = total / n.max(1);
        BalanceBand {
            min: base.saturating_sub(1),
            max: base + 1,
        }
    }

    pub fn contains(&self, size: usize) -> bool {
        self.min <= size && size <= self.max
    }
}

/// N disjoint pools covering every family, each sorted.
///
/// Built once at startup and shared read-only by the rotation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSet {
    pools: Vec<Vec<String>>,

    /// family → index of the pool that holds it
    home: HashMap<String, usize>,
}

impl PoolSet {
    /// Partition families into `n` pools.
    ///
    /// Input order does not matter; families are sorted canonically first.
    pub fn partition(families: &[String], n: usize) -> RotationResult<Self> {
        if n == 0 {
            return Err(RotationError::invalid("pool count must be positive"));
        }

        if families.is_empty() {
            return Err(RotationError::invalid("cannot partition an empty family list"));
        }

        let mut sorted: Vec<&String> = families.iter().collect();
        sorted.sort();

        let mut pools: Vec<Vec<String>> = vec![Vec::new(); n];
        let mut home = HashMap::with_capacity(sorted.len());

        for (i, family) in sorted.into_iter().enumerate() {
            let pool_idx = i % n;
            pools[pool_idx].push(family.clone());

            if home.insert(family.clone(), pool_idx).is_some() {
                return Err(RotationError::invalid(format!(
                    "family appears more than once: {}",
                    family
                )));
            }
        }

        // Members stay in sorted order
        for pool in &mut pools {
            pool.sort();
        }

        Ok(PoolSet { pools, home })
    }

    /// Number of pools (N)
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn pool(&self, index: usize) -> &[String] {
        &self.pools[index]
    }

    pub fn pools(&self) -> &[Vec<String>] {
        &self.pools
    }

    /// Pool that holds a family
    pub fn home_pool(&self, family: &str) -> Option<usize> {
        self.home.get(family).copied()
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.pools.iter().map(Vec::len).collect()
    }

    /// Total families across all pools
    pub fn total(&self) -> usize {
        self.home.len()
    }

    pub fn balance_band(&self) -> BalanceBand {
        BalanceBand::for_universe(self.total(), self.len())
    }
}

// ============================================================================
// TESTS
// ============================================================================
