//! DRE report output types.
//!
//! Reports are assembled by the builder and are read-only afterwards.

use contabil_shared::types::{CostCenterId, TransactionId};
use rust_decimal::Decimal;
use serde::Serialize;

use super::segment::SegmentScope;
use super::types::{ReportPeriod, Segment};

/// One account line of the revenue or expense section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLine {
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Section total for this account.
    pub total: Decimal,
}

/// Activity whose category matched no account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UncategorizedSummary {
    /// Unmatched revenue.
    pub revenue_total: Decimal,
    /// Unmatched expense.
    pub expense_total: Decimal,
    /// Distinct labels with no account.
    pub labels: Vec<String>,
    /// Transactions in this summary, ascending.
    pub transaction_ids: Vec<TransactionId>,
}

/// Revenue and expense of one cost center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostCenterLine {
    /// Cost center, `None` for transactions without one.
    pub cost_center_id: Option<CostCenterId>,
    /// Revenue total.
    pub revenue: Decimal,
    /// Expense total.
    pub expense: Decimal,
    /// Revenue minus expense.
    pub net: Decimal,
}

/// Income statement for one period and segment filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DreReport {
    pub(crate) period: ReportPeriod,
    pub(crate) segment_filter: SegmentScope,
    pub(crate) revenue_lines: Vec<ReportLine>,
    pub(crate) expense_lines: Vec<ReportLine>,
    pub(crate) uncategorized: UncategorizedSummary,
    pub(crate) total_revenue: Decimal,
    pub(crate) total_expense: Decimal,
    pub(crate) net_result: Decimal,
    pub(crate) margin_percent: Decimal,
    pub(crate) cost_center_analysis: Vec<CostCenterLine>,
    pub(crate) transaction_count: usize,
}

impl DreReport {
    /// Reporting period.
    #[must_use]
    pub const fn period(&self) -> ReportPeriod {
        self.period
    }

    /// Segment filter the report was built for.
    #[must_use]
    pub const fn segment_filter(&self) -> SegmentScope {
        self.segment_filter
    }

    /// Revenue lines, by account code.
    #[must_use]
    pub fn revenue_lines(&self) -> &[ReportLine] {
        &self.revenue_lines
    }

    /// Expense lines, by account code.
    #[must_use]
    pub fn expense_lines(&self) -> &[ReportLine] {
        &self.expense_lines
    }

    /// Uncategorized activity.
    #[must_use]
    pub const fn uncategorized(&self) -> &UncategorizedSummary {
        &self.uncategorized
    }

    /// Total revenue, uncategorized included.
    #[must_use]
    pub const fn total_revenue(&self) -> Decimal {
        self.total_revenue
    }

    /// Total expense, uncategorized included.
    #[must_use]
    pub const fn total_expense(&self) -> Decimal {
        self.total_expense
    }

    /// `total_revenue - total_expense`.
    #[must_use]
    pub const fn net_result(&self) -> Decimal {
        self.net_result
    }

    /// Net result as a percentage of revenue; zero without revenue.
    #[must_use]
    pub const fn margin_percent(&self) -> Decimal {
        self.margin_percent
    }

    /// Per cost center totals, by net descending.
    #[must_use]
    pub fn cost_center_analysis(&self) -> &[CostCenterLine] {
        &self.cost_center_analysis
    }

    /// Number of transactions that passed the period and segment filters.
    #[must_use]
    pub const fn transaction_count(&self) -> usize {
        self.transaction_count
    }
}

/// Report of one segment within a breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentReport {
    /// The segment.
    pub segment: Segment,
    /// Its report, shared entries included.
    pub report: DreReport,
}
