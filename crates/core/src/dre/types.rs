//! Ledger and chart-of-accounts input types.

use chrono::NaiveDate;
use contabil_shared::types::{Cents, CostCenterId, SegmentId, TransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerDataError;

/// Direction of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money coming in.
    Revenue,
    /// Money going out.
    Expense,
}

/// A ledger transaction as supplied by the ledger store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Transaction ID.
    pub id: TransactionId,
    /// Revenue or expense.
    pub kind: TransactionKind,
    /// Non-negative amount with at most cent precision.
    pub amount: Decimal,
    /// Booking date.
    pub occurred_on: NaiveDate,
    /// Category label, joined against `Account::category_label`.
    pub category_label: String,
    /// Owning segment; `None` means shared across all segments.
    #[serde(default)]
    pub segment_id: Option<SegmentId>,
    /// Cost center, informational only.
    #[serde(default)]
    pub cost_center_id: Option<CostCenterId>,
}

impl Transaction {
    /// Returns the amount in cents, enforcing the non-negative invariant.
    ///
    /// # Errors
    ///
    /// Returns `LedgerDataError::NegativeAmount` or
    /// `LedgerDataError::InvalidAmount` when the stored amount is unusable.
    pub fn amount_cents(&self) -> Result<Cents, LedgerDataError> {
        let cents = Cents::from_decimal(self.amount).map_err(|cause| {
            LedgerDataError::InvalidAmount {
                id: self.id,
                cause,
            }
        })?;
        if cents.is_negative() {
            return Err(LedgerDataError::NegativeAmount {
                id: self.id,
                amount: self.amount,
            });
        }
        Ok(cents)
    }
}

/// Account classification in the chart of accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Asset account.
    Asset,
    /// Liability account.
    Liability,
    /// Equity account.
    Equity,
    /// Revenue account.
    Revenue,
    /// Expense account.
    Expense,
}

/// A chart-of-accounts entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Account code, also the statement ordering key.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Account type.
    pub kind: AccountKind,
    /// Category label this account claims.
    pub category_label: String,
}

/// An organizational segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment ID (never the "all segments" sentinel).
    pub id: SegmentId,
    /// Segment name.
    pub name: String,
}

/// Inclusive reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriod {
    /// First day of the period.
    pub start: NaiveDate,
    /// Last day of the period.
    pub end: NaiveDate,
}

impl ReportPeriod {
    /// Returns true if `date` falls inside the period.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}
