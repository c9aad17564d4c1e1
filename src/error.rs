// ⚠️ Rotation Errors
// Configuration problems are fatal at startup; table gaps are recoverable.

use thiserror::Error;

/// Errors raised by the rotation core.
///
/// Everything except `UnresolvedConflict` is detected while building the
/// engine. Once an engine exists, `assign` is total.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RotationError {
    /// Empty universe, empty roster, zero pools, duplicate elders,
    /// missing or unknown owned families, malformed redistribution entries.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A reachable self-conflict has no entry in the redistribution table.
    #[error("no redistribution entry for {owner} at cycle position {cycle_position}")]
    UnresolvedConflict {
        cycle_position: usize,
        owner: String,
    },

    /// Table derivation found no elder able to absorb a filtered family
    /// without breaking the balance band or the no-repeat rule.
    #[error("no eligible receiver for {owner}'s family at cycle position {cycle_position}")]
    NoEligibleReceiver {
        cycle_position: usize,
        owner: String,
    },

    /// A continuous week whose Monday falls outside the representable calendar.
    #[error("week {0} is out of range")]
    WeekOutOfRange(i64),
}

impl RotationError {
    pub fn invalid(message: impl Into<String>) -> Self {
        RotationError::InvalidConfiguration(message.into())
    }
}

pub type RotationResult<T> = Result<T, RotationError>;
