// 👥 Elder Roster - Ordered assignees + owned families + prayer days
//
// Roster order is significant: an elder's ordinal is its rotation offset.
// Each elder owns exactly one family that must never land in its own list.

use crate::directory::Directory;
use crate::error::{RotationError, RotationResult};
use anyhow::{Context, Result};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Reference roster (8 elders, 8 pools)
const REFERENCE_ROSTER: &str = include_str!("../data/roster.json");

// ============================================================================
// ELDER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Elder {
    /// Display name, unique within the roster
    pub name: String,

    /// Directory id of the elder's own household
    pub family: String,

    /// Day of the week this elder prays through the list
    pub day: Weekday,
}

impl Elder {
    pub fn new(name: &str, family: &str, day: Weekday) -> Self {
        Elder {
            name: name.to_string(),
            family: family.to_string(),
            day,
        }
    }
}

/// On-disk roster layout
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RosterFile {
    pool_count: usize,
    elders: Vec<Elder>,
}

// ============================================================================
// ROSTER
// ============================================================================

/// Validated, ordered list of elders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    elders: Vec<Elder>,
    pool_count: usize,
}

impl Roster {
    /// Load the embedded reference roster
    pub fn reference() -> Result<Self> {
        Self::from_json(REFERENCE_ROSTER).context("Failed to parse reference roster")
    }

    /// Load roster from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read roster file: {:?}", path.as_ref()))?;

        Self::from_json(&content)
            .with_context(|| format!("Failed to load roster file: {:?}", path.as_ref()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: RosterFile = serde_json::from_str(content).context("Failed to parse roster JSON")?;
        Ok(Roster::new(file.elders, file.pool_count)?)
    }

    /// Build and validate a roster
    pub fn new(elders: Vec<Elder>, pool_count: usize) -> RotationResult<Self> {
        if pool_count == 0 {
            return Err(RotationError::invalid("pool count must be positive"));
        }

        if elders.is_empty() {
            return Err(RotationError::invalid("roster is empty"));
        }

        // A lone elder would have to keep its own family
        if elders.len() < 2 {
            return Err(RotationError::invalid("roster needs at least two elders"));
        }

        // Every pool needs an owner each week, and every elder needs a pool
        if elders.len() != pool_count {
            return Err(RotationError::invalid(format!(
                "roster has {} elders but pool count is {}",
                elders.len(),
                pool_count
            )));
        }

        let mut names = HashSet::new();
        let mut families = HashSet::new();

        for elder in &elders {
            if elder.name.trim().is_empty() {
                return Err(RotationError::invalid("elder with empty name"));
            }

            if !names.insert(elder.name.as_str()) {
                return Err(RotationError::invalid(format!("duplicate elder: {}", elder.name)));
            }

            if elder.family.trim().is_empty() {
                return Err(RotationError::invalid(format!(
                    "elder {} has no owned family",
                    elder.name
                )));
            }

            if !families.insert(elder.family.as_str()) {
                return Err(RotationError::invalid(format!(
                    "family owned by more than one elder: {}",
                    elder.family
                )));
            }
        }

        Ok(Roster { elders, pool_count })
    }

    /// Every owned family must exist in the directory
    pub fn validate_against(&self, directory: &Directory) -> RotationResult<()> {
        for elder in &self.elders {
            if !directory.contains(&elder.family) {
                return Err(RotationError::invalid(format!(
                    "family of {} not found in directory: {}",
                    elder.name, elder.family
                )));
            }
        }
        Ok(())
    }

    pub fn elders(&self) -> &[Elder] {
        &self.elders
    }

    pub fn len(&self) -> usize {
        self.elders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elders.is_empty()
    }

    /// N: number of pools and length of the rotation cycle
    pub fn pool_count(&self) -> usize {
        self.pool_count
    }

    /// Ordinal (rotation offset) of an elder
    pub fn ordinal(&self, name: &str) -> Option<usize> {
        self.elders.iter().position(|e| e.name == name)
    }

    pub fn elder(&self, name: &str) -> Option<&Elder> {
        self.elders.iter().find(|e| e.name == name)
    }

    pub fn owned_family(&self, name: &str) -> Option<&str> {
        self.elder(name).map(|e| e.family.as_str())
    }

    /// Elders praying on a given weekday, in roster order
    pub fn elders_for_day(&self, day: Weekday) -> Vec<&Elder> {
        self.elders.iter().filter(|e| e.day == day).collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn two_elders() -> Vec<Elder> {
        vec![
            Elder::new("A", "Adams, Ann", Weekday::Mon),
            Elder::new("B", "Baker, Bob", Weekday::Tue),
        ]
    }

    #[test]
    fn test_reference_roster() {
        let roster = Roster::reference().unwrap();

        assert_eq!(roster.len(), 8);
        assert_eq!(roster.pool_count(), 8);
        assert_eq!(roster.ordinal("Alan Judd"), Some(0));
        assert_eq!(roster.ordinal("Kyle Fairman"), Some(5));
        assert_eq!(
            roster.owned_family("Jerry Wood"),
            Some("Wood, Jerry & Rebecca")
        );
    }

    #[test]
    fn test_reference_roster_matches_directory() {
        let roster = Roster::reference().unwrap();
        let directory = Directory::reference().unwrap();

        assert!(roster.validate_against(&directory).is_ok());
    }

    #[test]
    fn test_prayer_days() {
        let roster = Roster::reference().unwrap();

        let monday: Vec<&str> = roster
            .elders_for_day(Weekday::Mon)
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(monday, vec!["Alan Judd", "Brian McLaughlin"]);

        let sunday = roster.elders_for_day(Weekday::Sun);
        assert_eq!(sunday.len(), 1);
        assert_eq!(sunday[0].name, "Larry McDuffee");
    }

    #[test]
    fn test_duplicate_elder_rejected() {
        let mut elders = two_elders();
        elders[1].name = "A".to_string();

        let err = Roster::new(elders, 2).unwrap_err();
        assert!(err.to_string().contains("duplicate elder"));
    }

    #[test]
    fn test_missing_family_rejected() {
        let mut elders = two_elders();
        elders[0].family = "  ".to_string();

        let err = Roster::new(elders, 2).unwrap_err();
        assert!(err.to_string().contains("no owned family"));
    }

    #[test]
    fn test_shared_family_rejected() {
        let mut elders = two_elders();
        elders[1].family = "Adams, Ann".to_string();

        assert!(Roster::new(elders, 2).is_err());
    }

    #[test]
    fn test_pool_count_must_match_roster() {
        assert!(Roster::new(two_elders(), 3).is_err());
        assert!(Roster::new(two_elders(), 0).is_err());
        assert!(Roster::new(Vec::new(), 2).is_err());
        assert!(Roster::new(two_elders()[..1].to_vec(), 1).is_err());
    }

    #[test]
    fn test_unknown_family_rejected() {
        let roster = Roster::new(two_elders(), 2).unwrap();
        let directory = Directory::from_families(vec!["Adams, Ann".to_string()]).unwrap();

        let err = roster.validate_against(&directory).unwrap_err();
        assert!(err.to_string().contains("Baker, Bob"));
    }

    #[test]
    fn test_roster_json_accepts_long_day_names() {
        let json = r#"{"pool_count": 2, "elders": [
            {"name": "A", "family": "Adams, Ann", "day": "Mon"},
            {"name": "B", "family": "Baker, Bob", "day": "Sunday"}
        ]}"#;

        let roster = Roster::from_json(json).unwrap();
        assert_eq!(roster.elders()[1].day, Weekday::Sun);
    }
}
