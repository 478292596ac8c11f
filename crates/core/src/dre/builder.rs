//! DRE report building.
//!
//! A build validates the request, fetches the ledger and the chart of
//! accounts concurrently, filters by period and segment, aggregates by
//! account and assembles the report. `assemble_report` is the single
//! aggregation path: segment breakdowns and reconciliation reuse it.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use contabil_shared::types::{Cents, CostCenterId};
use rayon::prelude::*;
use rust_decimal::Decimal;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::aggregator::{AccountAggregator, BucketKey, ChartOfAccounts};
use super::error::{DataSourceError, DreError, LedgerDataError, SourceKind, ValidationError};
use super::reconciliation::{Reconciliation, ReconciliationValidator};
use super::report::{CostCenterLine, DreReport, ReportLine, SegmentReport, UncategorizedSummary};
use super::segment::{SegmentPartitionResolver, SegmentScope};
use super::source::{ChartOfAccountsSource, LedgerSource};
use super::types::{ReportPeriod, Segment, Transaction, TransactionKind};

/// Raw report request, as mapped from query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportQuery {
    /// First day of the period (inclusive).
    pub period_start: NaiveDate,
    /// Last day of the period (inclusive).
    pub period_end: NaiveDate,
    /// Segment id; `None` or `0` mean all segments.
    pub segment_filter: Option<i64>,
}

impl ReportQuery {
    /// Creates a query.
    #[must_use]
    pub const fn new(
        period_start: NaiveDate,
        period_end: NaiveDate,
        segment_filter: Option<i64>,
    ) -> Self {
        Self {
            period_start,
            period_end,
            segment_filter,
        }
    }

    /// Checks the query and resolves its period and segment scope.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidDateRange` when the start is after the
    /// end, `ValidationError::InvalidSegmentFilter` for a negative segment.
    pub fn validate(&self) -> Result<(ReportPeriod, SegmentScope), ValidationError> {
        if self.period_start > self.period_end {
            return Err(ValidationError::InvalidDateRange {
                start: self.period_start,
                end: self.period_end,
            });
        }
        let scope = SegmentScope::from_filter(self.segment_filter)?;
        Ok((
            ReportPeriod {
                start: self.period_start,
                end: self.period_end,
            },
            scope,
        ))
    }
}

/// Caller-side limits on the fetch phase.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Absolute deadline for both fetches.
    pub deadline: Option<Instant>,
    /// Aborts the fetches when cancelled.
    pub cancel: CancellationToken,
}

impl BuildOptions {
    /// Options with a deadline `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Fetched, read-only inputs of one build.
struct Snapshot {
    transactions: Vec<Transaction>,
    chart: ChartOfAccounts,
}

/// Builds DRE reports from a ledger and a chart of accounts.
///
/// Builders hold no mutable state; one instance can serve concurrent builds.
#[derive(Debug, Clone)]
pub struct DreReportBuilder<L, A> {
    ledger: L,
    accounts: A,
    fetch_timeout: Option<Duration>,
}

impl<L, A> DreReportBuilder<L, A>
where
    L: LedgerSource,
    A: ChartOfAccountsSource,
{
    /// Creates a builder without a default fetch timeout.
    #[must_use]
    pub const fn new(ledger: L, accounts: A) -> Self {
        Self {
            ledger,
            accounts,
            fetch_timeout: None,
        }
    }

    /// Sets the timeout applied when the caller supplies no deadline.
    #[must_use]
    pub const fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Builds the report for `query`.
    ///
    /// The query is validated before anything is fetched. Source failures are
    /// returned as they are; an empty ledger yields an all-zero report.
    pub async fn build(
        &self,
        query: &ReportQuery,
        options: &BuildOptions,
    ) -> Result<DreReport, DreError> {
        let (period, scope) = query.validate()?;
        let snapshot = self.fetch(period, scope, options).await?;
        let report = assemble_report(period, scope, &snapshot.transactions, &snapshot.chart)?;

        info!(
            start = %period.start,
            end = %period.end,
            segment = ?scope,
            transactions = report.transaction_count,
            total_revenue = %report.total_revenue,
            total_expense = %report.total_expense,
            net_result = %report.net_result,
            "DRE report built"
        );

        Ok(report)
    }

    /// Builds one report per segment from a single fetch.
    ///
    /// Shared entries appear in every segment's report, so the segment
    /// totals do not add up to the all-segments report. Reports come back in
    /// the order of `segments`.
    ///
    /// The fetches are awaited like in `build`. The per-segment assembly then
    /// runs on the rayon pool and blocks the calling task until every report
    /// is done, holding the runtime worker for that time. Callers with large
    /// segment catalogs on a busy runtime should run this future through
    /// `tokio::task::spawn_blocking` + `Handle::block_on`, or on a dedicated
    /// runtime.
    pub async fn build_segment_breakdown(
        &self,
        period_start: NaiveDate,
        period_end: NaiveDate,
        segments: &[Segment],
        options: &BuildOptions,
    ) -> Result<Vec<SegmentReport>, DreError> {
        let (period, scope) = ReportQuery::new(period_start, period_end, None).validate()?;
        let snapshot = self.fetch(period, scope, options).await?;

        // Blocks this task until the rayon fan-out completes.
        let reports = segments
            .par_iter()
            .map(|segment| {
                assemble_report(
                    period,
                    SegmentScope::Specific(segment.id),
                    &snapshot.transactions,
                    &snapshot.chart,
                )
                .map(|report| SegmentReport {
                    segment: segment.clone(),
                    report,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            start = %period.start,
            end = %period.end,
            segments = reports.len(),
            "Segment breakdown built"
        );

        Ok(reports)
    }

    /// Fetches like `build` and cross-checks the flat and account-joined totals.
    pub async fn reconcile(
        &self,
        query: &ReportQuery,
        options: &BuildOptions,
    ) -> Result<Reconciliation, DreError> {
        let (period, scope) = query.validate()?;
        let snapshot = self.fetch(period, scope, options).await?;
        Ok(ReconciliationValidator::check(
            period,
            scope,
            &snapshot.transactions,
            &snapshot.chart,
        )?)
    }

    async fn fetch(
        &self,
        period: ReportPeriod,
        scope: SegmentScope,
        options: &BuildOptions,
    ) -> Result<Snapshot, DataSourceError> {
        let deadline = options
            .deadline
            .or_else(|| self.fetch_timeout.map(|timeout| Instant::now() + timeout));

        let (transactions, accounts) = tokio::try_join!(
            guarded(
                SourceKind::Ledger,
                deadline,
                &options.cancel,
                self.ledger.get_transactions(period.start, period.end, scope),
            ),
            guarded(
                SourceKind::ChartOfAccounts,
                deadline,
                &options.cancel,
                self.accounts.get_accounts(),
            ),
        )?;

        debug!(
            transactions = transactions.len(),
            accounts = accounts.len(),
            "Fetched ledger snapshot"
        );

        Ok(Snapshot {
            transactions,
            chart: ChartOfAccounts::new(accounts),
        })
    }
}

/// Runs one fetch under the deadline and the cancellation token.
async fn guarded<T>(
    origin: SourceKind,
    deadline: Option<Instant>,
    cancel: &CancellationToken,
    fetch: impl Future<Output = Result<T, DataSourceError>>,
) -> Result<T, DataSourceError> {
    let bounded = async {
        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fetch)
                .await
                .unwrap_or_else(|_| Err(DataSourceError::Timeout { origin })),
            None => fetch.await,
        }
    };

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(DataSourceError::Cancelled { origin }),
        result = bounded => result,
    }
}

/// Assembles a report from already-fetched data.
///
/// Transactions outside `period` are skipped with a warning; the segment rule
/// is applied to the rest. Every remaining transaction lands in exactly one
/// bucket.
pub fn assemble_report(
    period: ReportPeriod,
    scope: SegmentScope,
    transactions: &[Transaction],
    chart: &ChartOfAccounts,
) -> Result<DreReport, LedgerDataError> {
    let mut out_of_period = 0usize;
    let visible: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| {
            if !period.contains(t.occurred_on) {
                out_of_period += 1;
                return false;
            }
            SegmentPartitionResolver::include(t, scope)
        })
        .collect();

    if out_of_period > 0 {
        warn!(
            count = out_of_period,
            start = %period.start,
            end = %period.end,
            "Ledger returned transactions outside the requested period"
        );
    }
    debug!(
        fetched = transactions.len(),
        visible = visible.len(),
        segment = ?scope,
        "Applied period and segment filters"
    );

    let buckets = AccountAggregator::aggregate(visible.iter().copied(), chart)?;

    let mut revenue_lines = Vec::new();
    let mut expense_lines = Vec::new();
    let mut uncategorized = UncategorizedSummary::default();
    let mut total_revenue = Cents::ZERO;
    let mut total_expense = Cents::ZERO;

    for bucket in buckets {
        total_revenue = total_revenue
            .checked_add(bucket.revenue_total)
            .map_err(|_| LedgerDataError::TotalOverflow)?;
        total_expense = total_expense
            .checked_add(bucket.expense_total)
            .map_err(|_| LedgerDataError::TotalOverflow)?;

        match bucket.key {
            BucketKey::Account { code, name } => {
                if bucket.revenue_total.is_positive() {
                    revenue_lines.push(ReportLine {
                        code: code.clone(),
                        name: name.clone(),
                        total: bucket.revenue_total.to_decimal(),
                    });
                }
                if bucket.expense_total.is_positive() {
                    expense_lines.push(ReportLine {
                        code,
                        name,
                        total: bucket.expense_total.to_decimal(),
                    });
                }
            }
            BucketKey::Uncategorized => {
                if !bucket.transaction_ids.is_empty() {
                    warn!(
                        count = bucket.transaction_ids.len(),
                        labels = ?bucket.unmatched_labels,
                        "Transactions without a matching account reported as uncategorized"
                    );
                }
                uncategorized = UncategorizedSummary {
                    revenue_total: bucket.revenue_total.to_decimal(),
                    expense_total: bucket.expense_total.to_decimal(),
                    labels: bucket.unmatched_labels.into_iter().collect(),
                    transaction_ids: bucket.transaction_ids,
                };
            }
        }
    }

    let net_result = total_revenue
        .checked_sub(total_expense)
        .map_err(|_| LedgerDataError::TotalOverflow)?;
    let total_revenue = total_revenue.to_decimal();
    let net_result = net_result.to_decimal();

    Ok(DreReport {
        period,
        segment_filter: scope,
        revenue_lines,
        expense_lines,
        uncategorized,
        total_revenue,
        total_expense: total_expense.to_decimal(),
        net_result,
        margin_percent: margin_percent(net_result, total_revenue),
        cost_center_analysis: cost_center_analysis(&visible)?,
        transaction_count: visible.len(),
    })
}

fn margin_percent(net_result: Decimal, total_revenue: Decimal) -> Decimal {
    if total_revenue.is_zero() {
        return Decimal::ZERO;
    }
    net_result
        .checked_div(total_revenue)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map_or(Decimal::ZERO, |percent| percent.round_dp(2))
}

fn cost_center_analysis(visible: &[&Transaction]) -> Result<Vec<CostCenterLine>, LedgerDataError> {
    let mut totals: BTreeMap<Option<CostCenterId>, (Cents, Cents)> = BTreeMap::new();

    for transaction in visible {
        let amount = transaction.amount_cents()?;
        let (revenue, expense) = totals.entry(transaction.cost_center_id).or_default();
        let slot = match transaction.kind {
            TransactionKind::Revenue => revenue,
            TransactionKind::Expense => expense,
        };
        *slot = slot
            .checked_add(amount)
            .map_err(|_| LedgerDataError::TotalOverflow)?;
    }

    let mut lines = totals
        .into_iter()
        .map(|(cost_center_id, (revenue, expense))| {
            let net = revenue
                .checked_sub(expense)
                .map_err(|_| LedgerDataError::TotalOverflow)?;
            Ok((cost_center_id, revenue, expense, net))
        })
        .collect::<Result<Vec<_>, LedgerDataError>>()?;

    // Stable: ties keep cost center order.
    lines.sort_by(|a, b| b.3.cmp(&a.3));

    Ok(lines
        .into_iter()
        .map(|(cost_center_id, revenue, expense, net)| CostCenterLine {
            cost_center_id,
            revenue: revenue.to_decimal(),
            expense: expense.to_decimal(),
            net: net.to_decimal(),
        })
        .collect())
}
