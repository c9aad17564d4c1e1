// ✅ Schedule Verification - Invariant checks over computed weeks
//
// Per week:   coverage, duplicates, own family, balance band, fallback use
// Across weeks: no week-to-week repeats, N-week periodicity
//
// Runs before anything is published; a failed check aborts the run.

use crate::rotation::{RotationEngine, WeeklyAssignment};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// ISSUES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical, // An invariant is broken
    Warning,  // Schedule is valid but the table needs regeneration
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Check {
    Coverage,
    Duplicate,
    OwnFamily,
    Balance,
    WeekToWeekRepeat,
    CycleRepeat,
    UnresolvedConflict,
}

impl Check {
    pub fn name(&self) -> &'static str {
        match self {
            Check::Coverage => "coverage",
            Check::Duplicate => "duplicate",
            Check::OwnFamily => "own_family",
            Check::Balance => "balance",
            Check::WeekToWeekRepeat => "week_to_week_repeat",
            Check::CycleRepeat => "cycle_repeat",
            Check::UnresolvedConflict => "unresolved_conflict",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationIssue {
    pub check: Check,
    pub severity: Severity,
    pub week_index: i64,
    pub elder: Option<String>,
    pub message: String,
}

impl VerificationIssue {
    fn critical(check: Check, week_index: i64, elder: Option<&str>, message: String) -> Self {
        VerificationIssue {
            check,
            severity: Severity::Critical,
            week_index,
            elder: elder.map(str::to_string),
            message,
        }
    }
}

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub first_week: i64,
    pub weeks_checked: usize,
    pub issues: Vec<VerificationIssue>,
}

impl VerificationReport {
    /// No critical issues
    pub fn passed(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == Severity::Critical)
    }

    /// No issues at all, warnings included
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn count(&self, check: Check) -> usize {
        self.issues.iter().filter(|i| i.check == check).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "Weeks {}..={}: {} issue(s) ({} critical)",
            self.first_week,
            self.first_week + self.weeks_checked as i64 - 1,
            self.issues.len(),
            self.issues
                .iter()
                .filter(|i| i.severity == Severity::Critical)
                .count()
        )
    }
}

// ============================================================================
// SINGLE WEEK
// ============================================================================

/// Check one computed week against the engine's configuration
pub fn verify_week(engine: &RotationEngine, week: &WeeklyAssignment) -> Vec<VerificationIssue> {
    let mut issues = Vec::new();
    let w = week.week_index;
    let band = engine.balance_band();

    // Balance + own family
    for assignment in &week.elders {
        let size = assignment.families.len();
        if !band.contains(size) {
            issues.push(VerificationIssue::critical(
                Check::Balance,
                w,
                Some(&assignment.elder),
                format!(
                    "{}: {} families (should be {}-{})",
                    assignment.elder, size, band.min, band.max
                ),
            ));
        }

        if let Some(own) = engine.roster().owned_family(&assignment.elder) {
            if assignment.families.contains(own) {
                issues.push(VerificationIssue::critical(
                    Check::OwnFamily,
                    w,
                    Some(&assignment.elder),
                    format!("{} has their own family in the list", assignment.elder),
                ));
            }
        }
    }

    // Duplicates
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for family in week.elders.iter().flat_map(|a| a.families.iter()) {
        *counts.entry(family.as_str()).or_insert(0) += 1;
    }
    for (family, count) in &counts {
        if *count > 1 {
            issues.push(VerificationIssue::critical(
                Check::Duplicate,
                w,
                None,
                format!("{} assigned {} times this week", family, count),
            ));
        }
    }

    // Coverage
    let universe = engine.all_entities();
    let assigned: BTreeSet<&str> = counts.keys().copied().collect();

    for family in &universe {
        if !assigned.contains(family.as_str()) {
            issues.push(VerificationIssue::critical(
                Check::Coverage,
                w,
                None,
                format!("missing family: {}", family),
            ));
        }
    }
    for family in &assigned {
        if !universe.contains(*family) {
            issues.push(VerificationIssue::critical(
                Check::Coverage,
                w,
                None,
                format!("family not in directory: {}", family),
            ));
        }
    }

    // Fallback redistributions
    for anomaly in week.anomalies() {
        issues.push(VerificationIssue {
            check: Check::UnresolvedConflict,
            severity: Severity::Warning,
            week_index: w,
            elder: Some(anomaly.owner.clone()),
            message: format!(
                "no table entry for {} at cycle position {}; fell back to {}",
                anomaly.owner, week.cycle_position, anomaly.receiver
            ),
        });
    }

    issues
}

// ============================================================================
// MULTI-WEEK
// ============================================================================

/// Verify `weeks` consecutive weeks starting at `first_week`.
///
/// Periodicity is checked for every week whose W + N is also in range,
/// so at least 2N weeks are needed to compare a full cycle.
pub fn verify_algorithm(engine: &RotationEngine, first_week: i64, weeks: usize) -> VerificationReport {
    let n = engine.cycle_length();
    let computed: Vec<WeeklyAssignment> = (0..weeks as i64)
        .map(|offset| engine.assign(first_week + offset))
        .collect();

    let mut issues = Vec::new();

    for week in &computed {
        issues.extend(verify_week(engine, week));
    }

    for pair in computed.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);

        for (before, after) in previous.elders.iter().zip(&current.elders) {
            let overlap = before.families.intersection(&after.families).count();
            if overlap > 0 {
                issues.push(VerificationIssue::critical(
                    Check::WeekToWeekRepeat,
                    current.week_index,
                    Some(&after.elder),
                    format!(
                        "{}: {} repeat(s) from week {}",
                        after.elder, overlap, previous.week_index
                    ),
                ));
            }
        }
    }

    for (week, later) in computed.iter().zip(computed.iter().skip(n)) {
        for (a, b) in week.elders.iter().zip(&later.elders) {
            if a.families != b.families {
                issues.push(VerificationIssue::critical(
                    Check::CycleRepeat,
                    later.week_index,
                    Some(&b.elder),
                    format!(
                        "{}: week {} differs from week {}",
                        b.elder, later.week_index, week.week_index
                    ),
                ));
            }
        }
    }

    VerificationReport {
        first_week,
        weeks_checked: weeks,
        issues,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> RotationEngine {
        RotationEngine::reference().unwrap()
    }

    #[test]
    fn test_reference_algorithm_is_clean() {
        let engine = engine();
        let report = verify_algorithm(&engine, 32, 16);

        assert!(report.is_clean(), "{:?}", report.issues);
        assert!(report.passed());
        assert_eq!(report.summary(), "Weeks 32..=47: 0 issue(s) (0 critical)");
    }

    #[test]
    fn test_detects_own_family() {
        let engine = engine();
        let mut week = engine.assign(1);

        let kyle_family = engine.roster().owned_family("Kyle Fairman").unwrap().to_string();
        for assignment in &mut week.elders {
            assignment.families.remove(&kyle_family);
        }
        week.elders[5].families.insert(kyle_family);

        let issues = verify_week(&engine, &week);
        assert!(issues.iter().any(|i| i.check == Check::OwnFamily));
    }

    #[test]
    fn test_detects_missing_and_duplicate() {
        let engine = engine();
        let mut week = engine.assign(3);

        let moved = week.elders[0].families.iter().next().unwrap().clone();
        week.elders[0].families.remove(&moved);
        let kept = week.elders[2].families.iter().next().unwrap().clone();
        week.elders[1].families.insert(kept);

        let issues = verify_week(&engine, &week);
        assert!(issues.iter().any(|i| i.check == Check::Coverage));
        assert!(issues.iter().any(|i| i.check == Check::Duplicate));
    }

    #[test]
    fn test_detects_imbalance() {
        let engine = engine();
        let mut week = engine.assign(1);

        let drained: Vec<String> = week.elders[0].families.iter().take(5).cloned().collect();
        for family in drained {
            week.elders[0].families.remove(&family);
            week.elders[1].families.insert(family);
        }

        let issues = verify_week(&engine, &week);
        let balance: Vec<_> = issues.iter().filter(|i| i.check == Check::Balance).collect();
        assert_eq!(balance.len(), 2);
    }

    #[test]
    fn test_fallback_is_a_warning() {
        use crate::directory::Directory;
        use crate::redistribution::RedistributionTable;
        use crate::roster::Roster;

        let engine = RotationEngine::new(
            Directory::reference().unwrap(),
            Roster::reference().unwrap(),
            RedistributionTable::new(),
        )
        .unwrap();

        let report = verify_algorithm(&engine, 1, 8);
        assert!(report.count(Check::UnresolvedConflict) > 0);
        assert!(!report.is_clean());
    }
}
