//! Ledger and chart-of-accounts collaborators.
//!
//! The engine never owns this data: it reads snapshots through these traits.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::error::DataSourceError;
use super::segment::SegmentScope;
use super::types::{Account, Transaction};

/// Read access to ledger transactions.
///
/// `segment` is a hint: implementations may narrow their result with
/// `SegmentScope::includes` but must never apply a stricter rule, since the
/// builder re-applies the visibility rule itself.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    /// Returns transactions booked within `[start, end]`.
    async fn get_transactions(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        segment: SegmentScope,
    ) -> Result<Vec<Transaction>, DataSourceError>;
}

/// Read access to the chart of accounts.
#[async_trait]
pub trait ChartOfAccountsSource: Send + Sync {
    /// Returns the full account set.
    async fn get_accounts(&self) -> Result<Vec<Account>, DataSourceError>;
}

#[async_trait]
impl<T: LedgerSource + ?Sized> LedgerSource for Arc<T> {
    async fn get_transactions(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        segment: SegmentScope,
    ) -> Result<Vec<Transaction>, DataSourceError> {
        (**self).get_transactions(start, end, segment).await
    }
}

#[async_trait]
impl<T: ChartOfAccountsSource + ?Sized> ChartOfAccountsSource for Arc<T> {
    async fn get_accounts(&self) -> Result<Vec<Account>, DataSourceError> {
        (**self).get_accounts().await
    }
}

/// Ledger held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    transactions: Vec<Transaction>,
}

impl InMemoryLedger {
    /// Creates a ledger over `transactions`.
    #[must_use]
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }
}

#[async_trait]
impl LedgerSource for InMemoryLedger {
    async fn get_transactions(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        segment: SegmentScope,
    ) -> Result<Vec<Transaction>, DataSourceError> {
        Ok(self
            .transactions
            .iter()
            .filter(|t| start <= t.occurred_on && t.occurred_on <= end && segment.includes(t))
            .cloned()
            .collect())
    }
}

/// Chart of accounts held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryChartOfAccounts {
    accounts: Vec<Account>,
}

impl InMemoryChartOfAccounts {
    /// Creates a chart over `accounts`.
    #[must_use]
    pub fn new(accounts: Vec<Account>) -> Self {
        Self { accounts }
    }
}

#[async_trait]
impl ChartOfAccountsSource for InMemoryChartOfAccounts {
    async fn get_accounts(&self) -> Result<Vec<Account>, DataSourceError> {
        Ok(self.accounts.clone())
    }
}
