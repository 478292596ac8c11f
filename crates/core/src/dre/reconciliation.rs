//! Cross-check of flat ledger totals against account-joined report totals.
//!
//! The flat path sums visible transactions directly. The joined path takes
//! the account lines of the assembled report. A gap between the two is a
//! data-quality signal: it should be fully explained by uncategorized
//! activity. Any remainder means the two paths disagree on visibility.

use contabil_shared::types::{Cents, TransactionId};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use super::aggregator::ChartOfAccounts;
use super::builder::assemble_report;
use super::error::LedgerDataError;
use super::report::DreReport;
use super::segment::{SegmentPartitionResolver, SegmentScope};
use super::types::{ReportPeriod, Transaction, TransactionKind};

/// Totals computed by both paths over the same inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    /// Revenue summed straight from the ledger.
    pub flat_revenue: Decimal,
    /// Expense summed straight from the ledger.
    pub flat_expense: Decimal,
    /// Revenue over account-matched report lines.
    pub joined_revenue: Decimal,
    /// Expense over account-matched report lines.
    pub joined_expense: Decimal,
    /// Transactions whose label matched no account.
    pub unmatched_transaction_ids: Vec<TransactionId>,
    /// Revenue of the unmatched transactions.
    pub unmatched_revenue: Decimal,
    /// Expense of the unmatched transactions.
    pub unmatched_expense: Decimal,
    /// Transactions visible only through the shared-segment rule.
    pub shared_fallback_ids: Vec<TransactionId>,
}

/// Divergence between the flat and joined totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationMismatch {
    /// `flat_revenue - joined_revenue`.
    pub revenue_gap: Decimal,
    /// `flat_expense - joined_expense`.
    pub expense_gap: Decimal,
    /// Revenue gap not covered by unmatched transactions.
    pub unexplained_revenue: Decimal,
    /// Expense gap not covered by unmatched transactions.
    pub unexplained_expense: Decimal,
}

impl ReconciliationMismatch {
    /// Returns true if unmatched transactions account for the whole gap.
    #[must_use]
    pub fn is_explained(&self) -> bool {
        self.unexplained_revenue.is_zero() && self.unexplained_expense.is_zero()
    }
}

impl Reconciliation {
    /// `flat_revenue - joined_revenue`.
    #[must_use]
    pub fn revenue_gap(&self) -> Decimal {
        self.flat_revenue - self.joined_revenue
    }

    /// `flat_expense - joined_expense`.
    #[must_use]
    pub fn expense_gap(&self) -> Decimal {
        self.flat_expense - self.joined_expense
    }

    /// Returns true if both paths agree exactly.
    #[must_use]
    pub fn is_reconciled(&self) -> bool {
        self.revenue_gap().is_zero() && self.expense_gap().is_zero()
    }

    /// Describes the divergence, if any.
    #[must_use]
    pub fn mismatch(&self) -> Option<ReconciliationMismatch> {
        if self.is_reconciled() {
            return None;
        }
        let revenue_gap = self.revenue_gap();
        let expense_gap = self.expense_gap();
        Some(ReconciliationMismatch {
            revenue_gap,
            expense_gap,
            unexplained_revenue: revenue_gap - self.unmatched_revenue,
            unexplained_expense: expense_gap - self.unmatched_expense,
        })
    }
}

/// Recomputes report totals through the flat ledger path.
pub struct ReconciliationValidator;

impl ReconciliationValidator {
    /// Assembles the report for `period` and `scope`, then reconciles it.
    pub fn check(
        period: ReportPeriod,
        scope: SegmentScope,
        transactions: &[Transaction],
        chart: &ChartOfAccounts,
    ) -> Result<Reconciliation, LedgerDataError> {
        let report = assemble_report(period, scope, transactions, chart)?;
        Self::reconcile(&report, transactions)
    }

    /// Reconciles `report` against the transactions it was built from.
    pub fn reconcile(
        report: &DreReport,
        transactions: &[Transaction],
    ) -> Result<Reconciliation, LedgerDataError> {
        let period = report.period();
        let scope = report.segment_filter();

        let mut flat_revenue = Cents::ZERO;
        let mut flat_expense = Cents::ZERO;
        let mut shared_fallback_ids = Vec::new();

        for transaction in transactions {
            if !period.contains(transaction.occurred_on)
                || !SegmentPartitionResolver::include(transaction, scope)
            {
                continue;
            }
            let amount = transaction.amount_cents()?;
            let total = match transaction.kind {
                TransactionKind::Revenue => &mut flat_revenue,
                TransactionKind::Expense => &mut flat_expense,
            };
            *total = total
                .checked_add(amount)
                .map_err(|_| LedgerDataError::TotalOverflow)?;
            if SegmentPartitionResolver::via_shared_fallback(transaction, scope) {
                shared_fallback_ids.push(transaction.id);
            }
        }
        shared_fallback_ids.sort_unstable();

        let uncategorized = report.uncategorized();
        let reconciliation = Reconciliation {
            flat_revenue: flat_revenue.to_decimal(),
            flat_expense: flat_expense.to_decimal(),
            joined_revenue: report.revenue_lines().iter().map(|line| line.total).sum(),
            joined_expense: report.expense_lines().iter().map(|line| line.total).sum(),
            unmatched_transaction_ids: uncategorized.transaction_ids.clone(),
            unmatched_revenue: uncategorized.revenue_total,
            unmatched_expense: uncategorized.expense_total,
            shared_fallback_ids,
        };

        match reconciliation.mismatch() {
            Some(mismatch) => warn!(
                revenue_gap = %mismatch.revenue_gap,
                expense_gap = %mismatch.expense_gap,
                unexplained_revenue = %mismatch.unexplained_revenue,
                unexplained_expense = %mismatch.unexplained_expense,
                unmatched = reconciliation.unmatched_transaction_ids.len(),
                "DRE totals diverge from the flat ledger"
            ),
            None => debug!(
                revenue = %reconciliation.flat_revenue,
                expense = %reconciliation.flat_expense,
                "DRE totals reconciled"
            ),
        }

        Ok(reconciliation)
    }
}
