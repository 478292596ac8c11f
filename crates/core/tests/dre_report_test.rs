//! End-to-end DRE builds over in-memory and scripted collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Barrier;
use tokio_util::sync::CancellationToken;

use contabil_core::dre::{
    Account, AccountKind, BuildOptions, ChartOfAccountsSource, DataSourceError, DreError,
    DreReportBuilder, InMemoryChartOfAccounts, InMemoryLedger, LedgerSource, ReportQuery,
    Segment, SegmentScope, SourceKind, Transaction, TransactionKind, ValidationError,
};
use contabil_shared::types::{CostCenterId, SegmentId, TransactionId};

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap()
}

fn tx(
    id: i64,
    kind: TransactionKind,
    amount: Decimal,
    label: &str,
    segment: Option<i64>,
) -> Transaction {
    Transaction {
        id: TransactionId::new(id),
        kind,
        amount,
        occurred_on: date(1, 15),
        category_label: label.to_string(),
        segment_id: segment.map(|s| SegmentId::new(s).unwrap()),
        cost_center_id: None,
    }
}

fn accounts() -> Vec<Account> {
    vec![
        Account {
            code: "4.1".into(),
            name: "Product Sales".into(),
            kind: AccountKind::Revenue,
            category_label: "Sales".into(),
        },
        Account {
            code: "3.1".into(),
            name: "Office Rent".into(),
            kind: AccountKind::Expense,
            category_label: "Rent".into(),
        },
        Account {
            code: "9.0".into(),
            name: "Miscellaneous".into(),
            kind: AccountKind::Expense,
            category_label: "Misc".into(),
        },
    ]
}

fn scenario_ledger() -> Vec<Transaction> {
    vec![
        tx(1, TransactionKind::Revenue, dec!(100), "Sales", Some(1)),
        tx(2, TransactionKind::Expense, dec!(40), "Rent", None),
    ]
}

fn builder(
    transactions: Vec<Transaction>,
) -> DreReportBuilder<InMemoryLedger, InMemoryChartOfAccounts> {
    DreReportBuilder::new(
        InMemoryLedger::new(transactions),
        InMemoryChartOfAccounts::new(accounts()),
    )
}

fn january(segment: Option<i64>) -> ReportQuery {
    ReportQuery::new(date(1, 1), date(1, 31), segment)
}

/// Ledger stub that counts calls and can fail, stall or rendezvous.
#[derive(Default)]
struct ScriptedLedger {
    calls: AtomicUsize,
    fail: bool,
    delay: Option<Duration>,
    barrier: Option<Arc<Barrier>>,
    transactions: Vec<Transaction>,
}

#[async_trait]
impl LedgerSource for ScriptedLedger {
    async fn get_transactions(
        &self,
        _start: NaiveDate,
        _end: NaiveDate,
        _segment: SegmentScope,
    ) -> Result<Vec<Transaction>, DataSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(DataSourceError::Unavailable {
                origin: SourceKind::Ledger,
                message: "connection refused".into(),
            });
        }
        Ok(self.transactions.clone())
    }
}

/// Account stub mirroring `ScriptedLedger`.
#[derive(Default)]
struct ScriptedAccounts {
    calls: AtomicUsize,
    barrier: Option<Arc<Barrier>>,
}

#[async_trait]
impl ChartOfAccountsSource for ScriptedAccounts {
    async fn get_accounts(&self) -> Result<Vec<Account>, DataSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        Ok(accounts())
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_scenario_a_segment_with_shared_expense() {
    let report = builder(scenario_ledger())
        .build(&january(Some(1)), &BuildOptions::default())
        .await
        .unwrap();

    assert_eq!(report.transaction_count(), 2);
    assert_eq!(report.total_revenue(), dec!(100));
    assert_eq!(report.total_expense(), dec!(40));
    assert_eq!(report.net_result(), dec!(60));
    assert_eq!(report.margin_percent(), dec!(60.00));
    assert_eq!(report.revenue_lines()[0].code, "4.1");
    assert_eq!(report.expense_lines()[0].name, "Office Rent");
}

#[tokio::test]
async fn test_scenario_b_other_segment_sees_only_shared_entry() {
    let report = builder(scenario_ledger())
        .build(&january(Some(2)), &BuildOptions::default())
        .await
        .unwrap();

    assert_eq!(report.transaction_count(), 1);
    assert_eq!(report.total_revenue(), Decimal::ZERO);
    assert_eq!(report.total_expense(), dec!(40));
    assert_eq!(report.net_result(), dec!(-40));
    assert!(report.revenue_lines().is_empty());
    assert_eq!(report.margin_percent(), Decimal::ZERO);
}

#[tokio::test]
async fn test_scenario_c_unknown_category_is_uncategorized() {
    let mut ledger = scenario_ledger();
    ledger.push(tx(3, TransactionKind::Revenue, dec!(15.50), "Unknown", None));

    let report = builder(ledger)
        .build(&january(None), &BuildOptions::default())
        .await
        .unwrap();

    let uncategorized = report.uncategorized();
    assert_eq!(uncategorized.revenue_total, dec!(15.50));
    assert_eq!(uncategorized.expense_total, Decimal::ZERO);
    assert_eq!(uncategorized.labels, vec!["Unknown".to_string()]);
    assert_eq!(uncategorized.transaction_ids, vec![TransactionId::new(3)]);
    assert_eq!(report.total_revenue(), dec!(115.50));
    assert_eq!(report.revenue_lines().len(), 1);
}

#[tokio::test]
async fn test_scenario_d_inverted_range_fetches_nothing() {
    let ledger = Arc::new(ScriptedLedger::default());
    let accounts = Arc::new(ScriptedAccounts::default());
    let builder = DreReportBuilder::new(Arc::clone(&ledger), Arc::clone(&accounts));

    let err = builder
        .build(
            &ReportQuery::new(date(2, 1), date(1, 1), None),
            &BuildOptions::default(),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DreError::Validation(ValidationError::InvalidDateRange {
            start: date(2, 1),
            end: date(1, 1),
        })
    );
    assert_eq!(ledger.calls.load(Ordering::SeqCst), 0);
    assert_eq!(accounts.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_scenario_e_mixed_category_split_not_netted() {
    let ledger = vec![
        tx(1, TransactionKind::Revenue, dec!(50), "Misc", None),
        tx(2, TransactionKind::Expense, dec!(20), "Misc", None),
    ];

    let report = builder(ledger)
        .build(&january(None), &BuildOptions::default())
        .await
        .unwrap();

    assert_eq!(report.revenue_lines().len(), 1);
    assert_eq!(report.revenue_lines()[0].code, "9.0");
    assert_eq!(report.revenue_lines()[0].total, dec!(50));
    assert_eq!(report.expense_lines().len(), 1);
    assert_eq!(report.expense_lines()[0].code, "9.0");
    assert_eq!(report.expense_lines()[0].total, dec!(20));
    assert_eq!(report.net_result(), dec!(30));
}

// ============================================================================
// Edge cases
// ============================================================================

#[tokio::test]
async fn test_empty_ledger_is_zero_report() {
    let report = builder(Vec::new())
        .build(&january(Some(3)), &BuildOptions::default())
        .await
        .unwrap();

    assert_eq!(report.transaction_count(), 0);
    assert_eq!(report.total_revenue(), Decimal::ZERO);
    assert_eq!(report.total_expense(), Decimal::ZERO);
    assert_eq!(report.net_result(), Decimal::ZERO);
    assert!(report.revenue_lines().is_empty());
    assert!(report.expense_lines().is_empty());
    assert!(report.cost_center_analysis().is_empty());
}

#[tokio::test]
async fn test_sentinel_and_absent_filter_match() {
    let builder = builder(scenario_ledger());

    let unfiltered = builder
        .build(&january(None), &BuildOptions::default())
        .await
        .unwrap();
    let sentinel = builder
        .build(&january(Some(0)), &BuildOptions::default())
        .await
        .unwrap();

    assert_eq!(unfiltered, sentinel);
    assert_eq!(unfiltered.segment_filter(), SegmentScope::All);
}

#[tokio::test]
async fn test_out_of_period_rows_are_excluded() {
    let mut late = tx(9, TransactionKind::Revenue, dec!(999), "Sales", None);
    late.occurred_on = date(3, 1);
    let ledger = ScriptedLedger {
        transactions: vec![tx(1, TransactionKind::Revenue, dec!(10), "Sales", None), late],
        ..ScriptedLedger::default()
    };

    let report = DreReportBuilder::new(ledger, ScriptedAccounts::default())
        .build(&january(None), &BuildOptions::default())
        .await
        .unwrap();

    assert_eq!(report.transaction_count(), 1);
    assert_eq!(report.total_revenue(), dec!(10));
}

#[tokio::test]
async fn test_cost_center_analysis_orders_by_net() {
    let mut sales = tx(1, TransactionKind::Revenue, dec!(500), "Sales", None);
    sales.cost_center_id = Some(CostCenterId::new(2));
    let mut rent = tx(2, TransactionKind::Expense, dec!(80), "Rent", None);
    rent.cost_center_id = Some(CostCenterId::new(1));
    let untagged = tx(3, TransactionKind::Expense, dec!(5), "Rent", None);

    let report = builder(vec![sales, rent, untagged])
        .build(&january(None), &BuildOptions::default())
        .await
        .unwrap();

    let lines = report.cost_center_analysis();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].cost_center_id, Some(CostCenterId::new(2)));
    assert_eq!(lines[0].net, dec!(500));
    assert_eq!(lines[1].cost_center_id, None);
    assert_eq!(lines[1].net, dec!(-5));
    assert_eq!(lines[2].cost_center_id, Some(CostCenterId::new(1)));
    assert_eq!(lines[2].net, dec!(-80));
}

#[tokio::test]
async fn test_negative_amount_fails_the_build() {
    let report = builder(vec![tx(4, TransactionKind::Expense, dec!(-1), "Rent", None)])
        .build(&january(None), &BuildOptions::default())
        .await;

    assert!(matches!(report, Err(DreError::LedgerData(_))));
}

#[tokio::test]
async fn test_report_json_shape() {
    let report = builder(scenario_ledger())
        .build(&january(Some(1)), &BuildOptions::default())
        .await
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["period"]["start"], "2025-01-01");
    assert_eq!(json["period"]["end"], "2025-01-31");
    assert_eq!(json["segmentFilter"]["scope"], "specific");
    assert_eq!(json["segmentFilter"]["segmentId"], 1);
    assert_eq!(json["revenueLines"][0]["code"], "4.1");
    assert_eq!(json["revenueLines"][0]["total"], "100.00");
    assert_eq!(json["uncategorized"]["revenueTotal"], "0.00");
    assert_eq!(json["totalRevenue"], "100.00");
    assert_eq!(json["totalExpense"], "40.00");
    assert_eq!(json["netResult"], "60.00");
}

// ============================================================================
// Fetch guard
// ============================================================================

#[tokio::test]
async fn test_fetches_run_concurrently() {
    let barrier = Arc::new(Barrier::new(2));
    let ledger = ScriptedLedger {
        barrier: Some(Arc::clone(&barrier)),
        transactions: scenario_ledger(),
        ..ScriptedLedger::default()
    };
    let accounts = ScriptedAccounts {
        barrier: Some(barrier),
        ..ScriptedAccounts::default()
    };
    let builder = DreReportBuilder::new(ledger, accounts);

    // Sequential fetches would never get past the barrier.
    let report = tokio::time::timeout(
        Duration::from_secs(5),
        builder.build(&january(None), &BuildOptions::default()),
    )
    .await
    .expect("fetches must overlap")
    .unwrap();

    assert_eq!(report.net_result(), dec!(60));
}

#[tokio::test]
async fn test_unavailable_source_propagates_unchanged() {
    let ledger = ScriptedLedger {
        fail: true,
        ..ScriptedLedger::default()
    };

    let err = DreReportBuilder::new(ledger, ScriptedAccounts::default())
        .build(&january(None), &BuildOptions::default())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DreError::DataSource(DataSourceError::Unavailable {
            origin: SourceKind::Ledger,
            message: "connection refused".into(),
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_caller_deadline_times_out() {
    let ledger = ScriptedLedger {
        delay: Some(Duration::from_secs(60)),
        ..ScriptedLedger::default()
    };

    let err = DreReportBuilder::new(ledger, ScriptedAccounts::default())
        .build(
            &january(None),
            &BuildOptions::with_timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DreError::DataSource(DataSourceError::Timeout {
            origin: SourceKind::Ledger,
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_builder_default_timeout_applies() {
    let ledger = ScriptedLedger {
        delay: Some(Duration::from_secs(60)),
        ..ScriptedLedger::default()
    };

    let err = DreReportBuilder::new(ledger, ScriptedAccounts::default())
        .with_fetch_timeout(Duration::from_millis(500))
        .build(&january(None), &BuildOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DreError::DataSource(DataSourceError::Timeout { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_aborts_fetch() {
    let ledger = ScriptedLedger {
        delay: Some(Duration::from_secs(60)),
        ..ScriptedLedger::default()
    };
    let builder = DreReportBuilder::new(ledger, ScriptedAccounts::default());
    let cancel = CancellationToken::new();
    let options = BuildOptions::default().with_cancel(cancel.clone());

    let trigger = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
    });

    let err = builder.build(&january(None), &options).await.unwrap_err();
    trigger.await.unwrap();

    assert_eq!(
        err,
        DreError::DataSource(DataSourceError::Cancelled {
            origin: SourceKind::Ledger,
        })
    );
}

// ============================================================================
// Breakdown and reconciliation
// ============================================================================

#[tokio::test]
async fn test_segment_breakdown_reuses_one_fetch() {
    let ledger = Arc::new(ScriptedLedger {
        transactions: scenario_ledger(),
        ..ScriptedLedger::default()
    });
    let builder = DreReportBuilder::new(Arc::clone(&ledger), ScriptedAccounts::default());
    let segments = vec![
        Segment {
            id: SegmentId::new(1).unwrap(),
            name: "Retail".into(),
        },
        Segment {
            id: SegmentId::new(2).unwrap(),
            name: "Wholesale".into(),
        },
    ];

    let reports = builder
        .build_segment_breakdown(date(1, 1), date(1, 31), &segments, &BuildOptions::default())
        .await
        .unwrap();

    assert_eq!(ledger.calls.load(Ordering::SeqCst), 1);
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].segment.name, "Retail");
    assert_eq!(reports[0].report.net_result(), dec!(60));
    assert_eq!(reports[1].report.net_result(), dec!(-40));
    // The shared rent shows up in both segments.
    assert_eq!(
        reports[0].report.total_expense() + reports[1].report.total_expense(),
        dec!(80)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_segment_breakdown_keeps_segment_order_on_worker_threads() {
    let ledger: Vec<Transaction> = (1..=40)
        .map(|id| tx(id, TransactionKind::Revenue, dec!(10), "Sales", Some(id)))
        .chain(std::iter::once(tx(100, TransactionKind::Expense, dec!(1), "Rent", None)))
        .collect();
    let segments: Vec<Segment> = (1..=40)
        .rev()
        .map(|id| Segment {
            id: SegmentId::new(id).unwrap(),
            name: format!("Segment {id}"),
        })
        .collect();

    let handle = tokio::spawn(async move {
        builder(ledger)
            .build_segment_breakdown(date(1, 1), date(1, 31), &segments, &BuildOptions::default())
            .await
    });
    let reports = handle.await.unwrap().unwrap();

    let ids: Vec<i64> = reports.iter().map(|r| r.segment.id.into_inner()).collect();
    assert_eq!(ids, (1..=40).rev().collect::<Vec<_>>());
    for report in &reports {
        assert_eq!(report.report.total_revenue(), dec!(10));
        assert_eq!(report.report.total_expense(), dec!(1));
        assert_eq!(report.report.transaction_count(), 2);
    }
}

#[tokio::test]
async fn test_builder_reconcile_reports_unmatched_entries() {
    let mut ledger = scenario_ledger();
    ledger.push(tx(3, TransactionKind::Expense, dec!(7), "Typo", Some(1)));

    let reconciliation = builder(ledger)
        .reconcile(&january(Some(1)), &BuildOptions::default())
        .await
        .unwrap();

    assert_eq!(reconciliation.flat_revenue, dec!(100));
    assert_eq!(reconciliation.flat_expense, dec!(47));
    assert_eq!(reconciliation.joined_revenue, dec!(100));
    assert_eq!(reconciliation.joined_expense, dec!(40));
    assert_eq!(
        reconciliation.unmatched_transaction_ids,
        vec![TransactionId::new(3)]
    );
    assert_eq!(reconciliation.shared_fallback_ids, vec![TransactionId::new(2)]);

    let mismatch = reconciliation.mismatch().unwrap();
    assert_eq!(mismatch.expense_gap, dec!(7));
    assert!(mismatch.is_explained());
}
