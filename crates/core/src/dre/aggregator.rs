//! Category bucketing of ledger transactions.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use contabil_shared::types::{Cents, TransactionId};
use tracing::warn;

use super::error::LedgerDataError;
use super::types::{Account, Transaction, TransactionKind};

/// Label of the bucket collecting transactions with no matching account.
pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";

/// Orders account codes segment by segment, so `5.2.9` precedes `5.2.10`.
///
/// Dot-separated parts compare numerically when both are numbers; a numeric
/// part sorts before a non-numeric one, and two non-numeric parts compare as
/// strings. A code sorts before its own sub-accounts (`5.2` before `5.2.1`).
/// Codes equal part by part (`05` and `5`) fall back to plain string order.
pub fn cmp_account_codes(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (Some(l), Some(r)) => match cmp_code_part(l, r) {
                Ordering::Equal => {}
                unequal => return unequal,
            },
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, None) => return a.cmp(b),
        }
    }
}

fn cmp_code_part(l: &str, r: &str) -> Ordering {
    match (l.parse::<u64>(), r.parse::<u64>()) {
        (Ok(l), Ok(r)) => l.cmp(&r),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => l.cmp(r),
    }
}

/// Map key ordering buckets by `cmp_account_codes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CodeKey<'a>(&'a str);

impl Ord for CodeKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_account_codes(self.0, other.0)
    }
}

impl PartialOrd for CodeKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Result of looking up a category label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryMatch<'a> {
    /// The label belongs to this account.
    Account(&'a Account),
    /// No account claims the label.
    Uncategorized,
}

/// Category label to account lookup, built once from the full account set.
#[derive(Debug, Clone, Default)]
pub struct ChartOfAccounts {
    by_label: HashMap<String, Account>,
}

impl ChartOfAccounts {
    /// Builds the lookup.
    ///
    /// When several accounts claim the same label, the lowest code wins
    /// (see `cmp_account_codes`).
    pub fn new(accounts: impl IntoIterator<Item = Account>) -> Self {
        let mut by_label: HashMap<String, Account> = HashMap::new();

        for account in accounts {
            let replace = match by_label.get(&account.category_label) {
                Some(existing) => {
                    let replace = cmp_account_codes(&account.code, &existing.code).is_lt();
                    let (kept, ignored) = if replace {
                        (&account.code, &existing.code)
                    } else {
                        (&existing.code, &account.code)
                    };
                    warn!(
                        category = %account.category_label,
                        kept = %kept,
                        ignored = %ignored,
                        "Duplicate category label in chart of accounts"
                    );
                    replace
                }
                None => true,
            };
            if replace {
                by_label.insert(account.category_label.clone(), account);
            }
        }

        Self { by_label }
    }

    /// Looks up the account claiming `label` (exact match).
    #[must_use]
    pub fn lookup(&self, label: &str) -> CategoryMatch<'_> {
        self.by_label
            .get(label)
            .map_or(CategoryMatch::Uncategorized, CategoryMatch::Account)
    }

    /// Number of distinct category labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    /// Returns true if no account is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }
}

/// What a bucket stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketKey {
    /// A chart-of-accounts entry.
    Account {
        /// Account code.
        code: String,
        /// Account name.
        name: String,
    },
    /// Transactions whose label matched no account.
    Uncategorized,
}

/// Revenue and expense accumulated for one category.
///
/// Revenue and expense are kept apart and never netted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBucket {
    /// Bucket identity.
    pub key: BucketKey,
    /// Category label, `UNCATEGORIZED_LABEL` for the miss bucket.
    pub category_label: String,
    /// Sum of revenue amounts.
    pub revenue_total: Cents,
    /// Sum of expense amounts.
    pub expense_total: Cents,
    /// Contributing transactions, ascending.
    pub transaction_ids: Vec<TransactionId>,
    /// Labels that fell into the miss bucket; empty for account buckets.
    pub unmatched_labels: BTreeSet<String>,
}

impl AccountBucket {
    fn new(key: BucketKey, category_label: String) -> Self {
        Self {
            key,
            category_label,
            revenue_total: Cents::ZERO,
            expense_total: Cents::ZERO,
            transaction_ids: Vec::new(),
            unmatched_labels: BTreeSet::new(),
        }
    }

    fn uncategorized() -> Self {
        Self::new(BucketKey::Uncategorized, UNCATEGORIZED_LABEL.to_string())
    }

    fn accumulate(&mut self, transaction: &Transaction) -> Result<(), LedgerDataError> {
        let amount = transaction.amount_cents()?;
        let total = match transaction.kind {
            TransactionKind::Revenue => &mut self.revenue_total,
            TransactionKind::Expense => &mut self.expense_total,
        };
        *total = total
            .checked_add(amount)
            .map_err(|_| LedgerDataError::TotalOverflow)?;
        self.transaction_ids.push(transaction.id);
        Ok(())
    }

    /// Returns true for the miss bucket.
    #[must_use]
    pub fn is_uncategorized(&self) -> bool {
        self.key == BucketKey::Uncategorized
    }
}

/// Buckets transactions by account category.
pub struct AccountAggregator;

impl AccountAggregator {
    /// Accumulates `transactions` into per-account buckets.
    ///
    /// Buckets come back ordered by `cmp_account_codes`, followed by the
    /// uncategorized bucket, which is always present (possibly empty).
    pub fn aggregate<'t>(
        transactions: impl IntoIterator<Item = &'t Transaction>,
        chart: &ChartOfAccounts,
    ) -> Result<Vec<AccountBucket>, LedgerDataError> {
        let mut by_code: BTreeMap<CodeKey<'_>, AccountBucket> = BTreeMap::new();
        let mut uncategorized = AccountBucket::uncategorized();

        for transaction in transactions {
            match chart.lookup(&transaction.category_label) {
                CategoryMatch::Account(account) => {
                    by_code
                        .entry(CodeKey(&account.code))
                        .or_insert_with(|| {
                            AccountBucket::new(
                                BucketKey::Account {
                                    code: account.code.clone(),
                                    name: account.name.clone(),
                                },
                                account.category_label.clone(),
                            )
                        })
                        .accumulate(transaction)?;
                }
                CategoryMatch::Uncategorized => {
                    uncategorized.accumulate(transaction)?;
                    uncategorized
                        .unmatched_labels
                        .insert(transaction.category_label.clone());
                }
            }
        }

        let mut buckets: Vec<AccountBucket> = by_code.into_values().collect();
        buckets.push(uncategorized);
        for bucket in &mut buckets {
            bucket.transaction_ids.sort_unstable();
        }

        Ok(buckets)
    }
}
