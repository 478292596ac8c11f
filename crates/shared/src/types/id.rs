//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `CostCenterId` where a
//! `TransactionId` is expected.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Macro to generate typed integer ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Creates an ID from its raw value.
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw value.
            #[must_use]
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse()?))
            }
        }
    };
}

typed_id!(TransactionId, "Unique identifier for a ledger transaction.");
typed_id!(CostCenterId, "Unique identifier for a cost center.");

/// Raw segment value reserved for "all segments".
pub const ALL_SEGMENTS_SENTINEL: i64 = 0;

/// Rejected segment identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid segment id {0}: segment ids must be positive")]
pub struct InvalidSegmentId(pub i64);

/// Identifier of a concrete organizational segment.
///
/// Always positive: the "all segments" sentinel can never name a real segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct SegmentId(i64);

impl SegmentId {
    /// Creates a segment id, rejecting the sentinel and negative values.
    pub const fn new(raw: i64) -> Result<Self, InvalidSegmentId> {
        if raw > ALL_SEGMENTS_SENTINEL {
            Ok(Self(raw))
        } else {
            Err(InvalidSegmentId(raw))
        }
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn into_inner(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for SegmentId {
    type Error = InvalidSegmentId;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<SegmentId> for i64 {
    fn from(id: SegmentId) -> Self {
        id.0
    }
}

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
