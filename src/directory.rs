// 📇 Family Directory - Two-column CSV → canonical family ids
// "Last Name,First Names" rows become "Last, First" identifiers

use crate::error::{RotationError, RotationResult};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Reference congregation directory (155 families)
const REFERENCE_DIRECTORY: &str = include_str!("../data/directory.csv");

// ============================================================================
// CSV ROW
// ============================================================================

#[derive(Debug, Deserialize)]
struct DirectoryRow {
    #[serde(rename = "Last Name")]
    last_name: String,

    #[serde(rename = "First Names")]
    first_names: String,
}

impl DirectoryRow {
    /// Canonical family id, e.g. "Bell, Jim & Beth"
    fn family_id(&self) -> String {
        format!("{}, {}", self.last_name.trim(), self.first_names.trim())
    }
}

// ============================================================================
// DIRECTORY
// ============================================================================

/// The full family universe, sorted lexicographically and free of duplicates.
///
/// Sorted order matters: pool membership is decided by position in this list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    families: Vec<String>,
}

impl Directory {
    /// Load the embedded reference directory
    pub fn reference() -> Result<Self> {
        Self::from_reader(REFERENCE_DIRECTORY.as_bytes()).context("Failed to parse reference directory")
    }

    /// Load a directory CSV from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open directory file: {}", path.display()))?;

        Self::from_reader(file)
            .with_context(|| format!("Failed to load directory: {}", path.display()))
    }

    /// Parse a directory from any CSV source with a header row
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(source);

        let mut families = Vec::new();

        for (line_num, result) in reader.deserialize::<DirectoryRow>().enumerate() {
            // +2: 1-indexed + header row
            let row = result.with_context(|| format!("Failed to parse directory line {}", line_num + 2))?;

            if row.last_name.trim().is_empty() {
                anyhow::bail!("Directory line {} has an empty last name", line_num + 2);
            }

            families.push(row.family_id());
        }

        Ok(Self::from_families(families)?)
    }

    /// Build a directory from already-formatted family ids
    pub fn from_families(mut families: Vec<String>) -> RotationResult<Self> {
        if families.is_empty() {
            return Err(RotationError::invalid("family directory is empty"));
        }

        families.sort();

        let mut seen = BTreeSet::new();
        for family in &families {
            if !seen.insert(family.as_str()) {
                return Err(RotationError::invalid(format!(
                    "family appears more than once in directory: {}",
                    family
                )));
            }
        }

        Ok(Directory { families })
    }

    /// All families in canonical (sorted) order
    pub fn families(&self) -> &[String] {
        &self.families
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    pub fn contains(&self, family: &str) -> bool {
        self.families
            .binary_search_by(|f| f.as_str().cmp(family))
            .is_ok()
    }

    /// Canonical position of a family, if present
    pub fn position(&self, family: &str) -> Option<usize> {
        self.families.binary_search_by(|f| f.as_str().cmp(family)).ok()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_directory_size() {
        let directory = Directory::reference().unwrap();
        assert_eq!(directory.len(), 155);
    }

    #[test]
    fn test_reference_directory_is_sorted() {
        let directory = Directory::reference().unwrap();
        let families = directory.families();

        assert_eq!(families[0], "Allred, Patric & Courtney; Brady Hoyt, Allie Grace");
        assert_eq!(families[1], "Austin, Shawn");
        assert!(families.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_quoted_first_names_keep_commas() {
        let directory = Directory::reference().unwrap();

        assert!(directory.contains("Fairman, Kyle & Leigh Ann; Wyatt, Audrey"));
        assert!(directory.contains("Judd, Alan & Amy; Anderson, Adrian, Adam"));
        assert_eq!(
            directory.position("Fairman, Kyle & Leigh Ann; Wyatt, Audrey"),
            Some(37)
        );
    }

    #[test]
    fn test_from_reader_trims_and_sorts() {
        let csv = "Last Name,First Names\nWood, Jerry & Rebecca\nBeach,Bruce\n";
        let directory = Directory::from_reader(csv.as_bytes()).unwrap();

        assert_eq!(directory.families(), &["Beach, Bruce", "Wood, Jerry & Rebecca"]);
    }

    #[test]
    fn test_duplicate_family_rejected() {
        let csv = "Last Name,First Names\nBeach,Bruce\nBeach,Bruce\n";
        let err = Directory::from_reader(csv.as_bytes()).unwrap_err();

        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_empty_directory_rejected() {
        let err = Directory::from_families(Vec::new()).unwrap_err();
        assert!(matches!(err, RotationError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_empty_last_name_rejected() {
        let csv = "Last Name,First Names\n,Bruce\n";
        assert!(Directory::from_reader(csv.as_bytes()).is_err());
    }
}
