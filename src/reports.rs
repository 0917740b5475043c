use std::collections::{btree_map, BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::RowError;
use crate::models::{Month, SaleRecord};

pub const DEFAULT_TOP_N: usize = 10;

// ---------------------------------------------------------------------------
// Grouping helpers
// ---------------------------------------------------------------------------

/// Sum `value` per key, keeping groups in first-seen order. Rows for which
/// `value` yields `None` do not contribute (and do not create a group).
fn group_sum<'a, K, V>(rows: &[&'a SaleRecord], key: K, value: V) -> Vec<(String, f64)>
where
    K: Fn(&'a SaleRecord) -> &'a str,
    V: Fn(&SaleRecord) -> Option<f64>,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, f64)> = Vec::new();
    for row in rows {
        let Some(v) = value(*row) else { continue };
        let k = key(*row);
        match index.get(k) {
            Some(&i) => groups[i].1 += v,
            None => {
                index.insert(k, groups.len());
                groups.push((k.to_string(), v));
            }
        }
    }
    groups
}

/// Stable descending sort: ties keep first-seen order.
fn sort_desc<T>(items: &mut [T], measure: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| measure(b).total_cmp(&measure(a)));
}

fn ranked(mut groups: Vec<(String, f64)>, limit: Option<usize>) -> Vec<RankedItem> {
    sort_desc(&mut groups, |g| g.1);
    if let Some(n) = limit {
        groups.truncate(n);
    }
    groups
        .into_iter()
        .map(|(key, value)| RankedItem { key, value })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem {
    pub key: String,
    pub value: f64,
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// Best sellers by summed quantity.
pub fn top_products(rows: &[&SaleRecord], n: usize) -> Vec<RankedItem> {
    let groups = group_sum(rows, |r| r.product.as_str(), |r| Some(r.quantity));
    ranked(groups, Some(n))
}

/// Products ranked by `quantity × (gross − cost)`, summed.
pub fn profitable_products(rows: &[&SaleRecord], n: usize) -> Vec<RankedItem> {
    let groups = group_sum(
        rows,
        |r| r.product.as_str(),
        |r| r.profit().map(|p| r.quantity * p),
    );
    ranked(groups, Some(n))
}

/// Per-sale margin, `(gross − cost) / gross`.
pub fn margin(gross_amount: f64, cost: f64) -> Result<f64, RowError> {
    if gross_amount == 0.0 {
        return Err(RowError::DivisionUndefined);
    }
    Ok((gross_amount - cost) / gross_amount)
}

/// Average margin per product. Sales with zero gross amount have no margin
/// and are left out of the average; a product with no defined margins is
/// absent.
pub fn profit_margin_by_product(rows: &[&SaleRecord], n: usize) -> Vec<RankedItem> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, f64, usize)> = Vec::new();
    for row in rows {
        let Some(cost) = row.cost else { continue };
        let m = match margin(row.gross_amount, cost) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!("{}: {e}", row.product);
                continue;
            }
        };
        match index.get(row.product.as_str()) {
            Some(&i) => {
                groups[i].1 += m;
                groups[i].2 += 1;
            }
            None => {
                index.insert(row.product.as_str(), groups.len());
                groups.push((row.product.clone(), m, 1));
            }
        }
    }
    let averages = groups
        .into_iter()
        .map(|(product, sum, count)| (product, sum / count as f64))
        .collect();
    ranked(averages, Some(n))
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

pub fn profit_by_category(rows: &[&SaleRecord]) -> Vec<RankedItem> {
    let groups = group_sum(rows, |r| r.category.as_str(), |r| r.profit());
    ranked(groups, None)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub revenue: f64,
    pub pct: f64,
}

/// Each category's share of filtered revenue, in percent. Empty when the
/// filtered revenue is zero, since no share is defined then.
pub fn revenue_share_by_category(rows: &[&SaleRecord]) -> Vec<CategoryShare> {
    let mut groups = group_sum(rows, |r| r.category.as_str(), |r| Some(r.gross_amount));
    let total: f64 = groups.iter().map(|g| g.1).sum();
    if total == 0.0 {
        return Vec::new();
    }
    sort_desc(&mut groups, |g| g.1);
    groups
        .into_iter()
        .map(|(category, revenue)| CategoryShare {
            category,
            revenue,
            pct: revenue / total * 100.0,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Seasonality
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketTotal<K> {
    pub bucket: K,
    pub revenue: f64,
    /// Present when the input has a cost column.
    pub profit: Option<f64>,
}

/// Chronological per-bucket totals. Consumed once; buckets without sales
/// never appear.
pub struct Buckets<K> {
    inner: btree_map::IntoIter<K, (f64, Option<f64>)>,
}

impl<K> Iterator for Buckets<K> {
    type Item = BucketTotal<K>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(bucket, (revenue, profit))| BucketTotal {
                bucket,
                revenue,
                profit,
            })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

fn bucketed<K: Ord>(
    rows: &[&SaleRecord],
    with_profit: bool,
    key: impl Fn(NaiveDate) -> K,
) -> Buckets<K> {
    let mut totals: BTreeMap<K, (f64, Option<f64>)> = BTreeMap::new();
    for row in rows {
        let Some(date) = row.date else { continue };
        let entry = totals
            .entry(key(date))
            .or_insert((0.0, with_profit.then_some(0.0)));
        entry.0 += row.gross_amount;
        if let (Some(acc), Some(p)) = (entry.1.as_mut(), row.profit()) {
            *acc += p;
        }
    }
    Buckets {
        inner: totals.into_iter(),
    }
}

pub fn daily_sales(rows: &[&SaleRecord], with_profit: bool) -> Buckets<NaiveDate> {
    bucketed(rows, with_profit, |d| d)
}

pub fn monthly_sales(rows: &[&SaleRecord], with_profit: bool) -> Buckets<Month> {
    bucketed(rows, with_profit, Month::of)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthGrowth {
    pub month: Month,
    pub revenue: f64,
    /// Change against the previous month with sales, in percent.
    pub growth_pct: Option<f64>,
}

pub fn monthly_growth(months: impl Iterator<Item = BucketTotal<Month>>) -> Vec<MonthGrowth> {
    let mut previous: Option<f64> = None;
    months
        .map(|m| {
            let growth_pct = previous
                .filter(|p| *p != 0.0)
                .map(|p| (m.revenue - p) / p * 100.0);
            previous = Some(m.revenue);
            MonthGrowth {
                month: m.bucket,
                revenue: m.revenue,
                growth_pct,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HourTotal {
    pub hour: u32,
    pub revenue: f64,
}

/// Revenue per hour of day, highest first. Sales without a time are skipped.
pub fn peak_hours(rows: &[&SaleRecord]) -> Vec<HourTotal> {
    let mut totals: BTreeMap<u32, f64> = BTreeMap::new();
    for row in rows {
        if let Some(hour) = row.hour {
            *totals.entry(hour).or_default() += row.gross_amount;
        }
    }
    let mut hours: Vec<HourTotal> = totals
        .into_iter()
        .map(|(hour, revenue)| HourTotal { hour, revenue })
        .collect();
    sort_desc(&mut hours, |h| h.revenue);
    hours
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryKpis {
    pub total_revenue: f64,
    pub sale_count: usize,
    pub average_ticket: f64,
    pub total_quantity: f64,
    pub total_profit: Option<f64>,
}

pub fn summary_kpis(rows: &[&SaleRecord], with_profit: bool) -> SummaryKpis {
    let total_revenue: f64 = rows.iter().map(|r| r.gross_amount).sum();
    let sale_count = rows.len();
    SummaryKpis {
        total_revenue,
        sale_count,
        average_ticket: if sale_count > 0 {
            total_revenue / sale_count as f64
        } else {
            0.0
        },
        total_quantity: rows.iter().map(|r| r.quantity).sum(),
        total_profit: with_profit.then(|| rows.iter().filter_map(|r| r.profit()).sum()),
    }
}
