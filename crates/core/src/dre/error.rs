//! DRE error types.

use chrono::NaiveDate;
use contabil_shared::AppError;
use contabil_shared::types::{MoneyError, TransactionId};
use rust_decimal::Decimal;
use thiserror::Error;

/// External collaborator a fetch went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Ledger store.
    Ledger,
    /// Chart-of-accounts store.
    ChartOfAccounts,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ledger => write!(f, "ledger"),
            Self::ChartOfAccounts => write!(f, "chart_of_accounts"),
        }
    }
}

/// Request errors detected before any fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Invalid date range.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date.
        start: NaiveDate,
        /// End date.
        end: NaiveDate,
    },

    /// Segment filter that is neither a segment id nor the sentinel.
    #[error("Invalid segment filter: {0}")]
    InvalidSegmentFilter(i64),
}

/// Failures of the ledger or chart-of-accounts collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataSourceError {
    /// The source could not be reached or failed to answer.
    #[error("{origin} source unavailable: {message}")]
    Unavailable {
        /// Failing source.
        origin: SourceKind,
        /// Collaborator-supplied detail.
        message: String,
    },

    /// The deadline elapsed before the source answered.
    #[error("{origin} source timed out")]
    Timeout {
        /// Failing source.
        origin: SourceKind,
    },

    /// The caller cancelled the build while the source was being queried.
    #[error("{origin} fetch cancelled")]
    Cancelled {
        /// Source being queried.
        origin: SourceKind,
    },
}

/// Fetched data violating ledger invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerDataError {
    /// Transaction amount is negative.
    #[error("Transaction {id} has negative amount {amount}")]
    NegativeAmount {
        /// Transaction ID.
        id: TransactionId,
        /// Offending amount.
        amount: Decimal,
    },

    /// Transaction amount cannot be represented in cents.
    #[error("Transaction {id} has an invalid amount: {cause}")]
    InvalidAmount {
        /// Transaction ID.
        id: TransactionId,
        /// Conversion failure.
        #[source]
        cause: MoneyError,
    },

    /// A running total left the supported range.
    #[error("Report totals overflow the supported range")]
    TotalOverflow,
}

/// Errors returned by report builds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DreError {
    /// The request was rejected before any fetch.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A collaborator failed; never downgraded to an empty report.
    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    /// The fetched data is unusable.
    #[error(transparent)]
    LedgerData(#[from] LedgerDataError),
}

impl From<DreError> for AppError {
    fn from(err: DreError) -> Self {
        let message = err.to_string();
        match err {
            DreError::Validation(_) => Self::Validation(message),
            DreError::LedgerData(_) => Self::BusinessRule(message),
            DreError::DataSource(DataSourceError::Unavailable { .. }) => {
                Self::ExternalService(message)
            }
            DreError::DataSource(
                DataSourceError::Timeout { .. } | DataSourceError::Cancelled { .. },
            ) => Self::Timeout(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_mapping() {
        let start = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();

        let app: AppError = DreError::from(ValidationError::InvalidDateRange { start, end }).into();
        assert_eq!(app.status_code(), 400);
        assert_eq!(
            app.to_string(),
            "Validation error: Invalid date range: start 2025-02-01 is after end 2025-01-01"
        );

        let app: AppError = DreError::from(DataSourceError::Unavailable {
            origin: SourceKind::Ledger,
            message: "connection refused".into(),
        })
        .into();
        assert_eq!(app.status_code(), 502);
        assert_eq!(
            app.to_string(),
            "External service error: ledger source unavailable: connection refused"
        );

        let app: AppError = DreError::from(DataSourceError::Timeout {
            origin: SourceKind::ChartOfAccounts,
        })
        .into();
        assert_eq!(app.error_code(), "TIMEOUT");

        let app: AppError = DreError::from(DataSourceError::Cancelled {
            origin: SourceKind::Ledger,
        })
        .into();
        assert_eq!(app.status_code(), 504);

        let app: AppError = DreError::from(LedgerDataError::TotalOverflow).into();
        assert_eq!(app.status_code(), 422);
    }
}
