//! Segment visibility rules.
//!
//! A transaction without a segment is shared overhead: it is visible under
//! every concrete segment filter. Summing the reports of two different
//! concrete segments therefore counts every shared entry twice. That is a
//! property of the rule, and callers combining segment reports must account
//! for it.

use contabil_shared::types::{ALL_SEGMENTS_SENTINEL, SegmentId};
use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::types::Transaction;

/// Which segments a report covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "segmentId", rename_all = "snake_case")]
pub enum SegmentScope {
    /// Every transaction, regardless of segment.
    #[default]
    All,
    /// One segment plus the shared entries.
    Specific(SegmentId),
    /// Shared entries only.
    Shared,
}

impl SegmentScope {
    /// Parses a raw request filter.
    ///
    /// Both an absent filter and the sentinel `0` mean "all segments".
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidSegmentFilter` for negative values.
    pub fn from_filter(raw: Option<i64>) -> Result<Self, ValidationError> {
        match raw {
            None | Some(ALL_SEGMENTS_SENTINEL) => Ok(Self::All),
            Some(value) => SegmentId::new(value)
                .map(Self::Specific)
                .map_err(|_| ValidationError::InvalidSegmentFilter(value)),
        }
    }

    /// Returns true if `transaction` is visible under this scope.
    #[must_use]
    pub fn includes(self, transaction: &Transaction) -> bool {
        SegmentPartitionResolver::include(transaction, self)
    }
}

/// Decides segment visibility of transactions.
pub struct SegmentPartitionResolver;

impl SegmentPartitionResolver {
    /// Returns true if `transaction` is visible under `filter`.
    #[must_use]
    pub fn include(transaction: &Transaction, filter: SegmentScope) -> bool {
        match (filter, transaction.segment_id) {
            (SegmentScope::All, _) | (SegmentScope::Specific(_) | SegmentScope::Shared, None) => {
                true
            }
            (SegmentScope::Specific(wanted), Some(own)) => wanted == own,
            (SegmentScope::Shared, Some(_)) => false,
        }
    }

    /// Returns true if `transaction` is visible under `filter` only because
    /// it is shared, i.e. a strict segment match would have excluded it.
    #[must_use]
    pub fn via_shared_fallback(transaction: &Transaction, filter: SegmentScope) -> bool {
        matches!(filter, SegmentScope::Specific(_)) && transaction.segment_id.is_none()
    }
}
