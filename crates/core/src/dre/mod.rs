//! Income statement (DRE) generation.
//!
//! Turns a flat transaction ledger into revenue and expense totals grouped
//! by chart-of-accounts category:
//! - Segment visibility (`segment`)
//! - Category bucketing (`aggregator`)
//! - Report assembly with concurrent, deadline-bound fetches (`builder`)
//! - Flat vs. account-joined cross-check (`reconciliation`)
//! - Collaborator traits and in-memory collaborators (`source`)
//! - Chart of accounts caching (`cache`)

pub mod aggregator;
pub mod builder;
pub mod cache;
pub mod error;
pub mod reconciliation;
pub mod report;
pub mod segment;
pub mod source;
pub mod types;


pub use aggregator::{
    AccountAggregator, AccountBucket, BucketKey, CategoryMatch, ChartOfAccounts,
    UNCATEGORIZED_LABEL, cmp_account_codes,
};
pub use builder::{BuildOptions, DreReportBuilder, ReportQuery, assemble_report};
pub use cache::CachedChartOfAccounts;
pub use error::{DataSourceError, DreError, LedgerDataError, SourceKind, ValidationError};
pub use reconciliation::{Reconciliation, ReconciliationMismatch, ReconciliationValidator};
pub use report::{CostCenterLine, DreReport, ReportLine, SegmentReport, UncategorizedSummary};
pub use segment::{SegmentPartitionResolver, SegmentScope};
pub use source::{
    ChartOfAccountsSource, InMemoryChartOfAccounts, InMemoryLedger, LedgerSource,
};
pub use types::{Account, AccountKind, ReportPeriod, Segment, Transaction, TransactionKind};
