//! Chart of accounts caching using Moka.
//!
//! The account set is small and changes rarely, so builds can share one
//! snapshot for a while instead of reloading it per request. Ledger data is
//! never cached.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use super::error::DataSourceError;
use super::source::ChartOfAccountsSource;
use super::types::Account;

/// Default time-to-live for cache entries (5 minutes).
const DEFAULT_TTL_SECS: u64 = 300;

/// Account source wrapper that memoizes the full account set.
///
/// The cache holds exactly one entry, the whole set, so only its lifetime is
/// tunable. Failed loads are not cached; the next call retries the inner
/// source.
#[derive(Clone)]
pub struct CachedChartOfAccounts<S> {
    inner: Arc<S>,
    cache: Cache<(), Arc<Vec<Account>>>,
}

impl<S: ChartOfAccountsSource + 'static> CachedChartOfAccounts<S> {
    /// Wraps `inner` with the default 5 minute TTL.
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self::with_ttl(inner, DEFAULT_TTL_SECS)
    }

    /// Wraps `inner` with a custom time-to-live.
    #[must_use]
    pub fn with_ttl(inner: S, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            inner: Arc::new(inner),
            cache,
        }
    }

    /// Drops the cached account set.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
    }
}

#[async_trait]
impl<S: ChartOfAccountsSource + 'static> ChartOfAccountsSource for CachedChartOfAccounts<S> {
    async fn get_accounts(&self) -> Result<Vec<Account>, DataSourceError> {
        let inner = Arc::clone(&self.inner);
        let accounts = self
            .cache
            .try_get_with((), async move { inner.get_accounts().await.map(Arc::new) })
            .await
            .map_err(|err: Arc<DataSourceError>| (*err).clone())?;

        Ok(accounts.as_ref().clone())
    }
}
