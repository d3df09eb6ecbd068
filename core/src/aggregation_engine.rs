//! Aggregation engine: daily, country, product and monthly rollups.
//!
//! Every reducer is a plain group-by over the full snapshot, recomputed
//! from scratch each batch. Negative lines (returns, chargebacks) are
//! included in every sum; counts are distinct invoices.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    error::AnalyticsResult,
    job::{BatchInput, RecomputeJob, TableWrite},
    model::Transaction,
    outcome::RoundForDisplay,
    store::{tables, AnalyticsStore},
    types::{round_money, round_pct, share_pct, UNKNOWN_LABEL},
};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub sale_date:         NaiveDate,
    pub daily_revenue:     f64,
    pub transaction_count: i64,
    /// Revenue per distinct invoice.
    pub avg_order_value:   f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryAggregate {
    pub country:                  String,
    pub total_revenue:            f64,
    pub transaction_count:        i64,
    pub avg_transaction_value:    f64,
    pub revenue_share_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductAggregate {
    /// Full description; the grouping key.
    pub description:              String,
    /// Truncated for presentation.
    pub display_name:             String,
    pub total_quantity:           i64,
    pub total_revenue:            f64,
    pub avg_unit_price:           f64,
    pub revenue_share_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    pub year:              i32,
    pub month:             u32,
    pub month_label:       String,
    pub total_revenue:     f64,
    pub unique_customers:  i64,
    pub transaction_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub total_revenue:    f64,
    pub total_orders:     i64,
    pub unique_customers: i64,
    pub avg_order_value:  f64,
}

impl RoundForDisplay for DailyAggregate {
    fn rounded(mut self) -> Self {
        self.daily_revenue = round_money(self.daily_revenue);
        self.avg_order_value = round_money(self.avg_order_value);
        self
    }
}

impl RoundForDisplay for CountryAggregate {
    fn rounded(mut self) -> Self {
        self.total_revenue = round_money(self.total_revenue);
        self.avg_transaction_value = round_money(self.avg_transaction_value);
        self.revenue_share_percentage = round_pct(self.revenue_share_percentage);
        self
    }
}

impl RoundForDisplay for ProductAggregate {
    fn rounded(mut self) -> Self {
        self.total_revenue = round_money(self.total_revenue);
        self.avg_unit_price = round_money(self.avg_unit_price);
        self.revenue_share_percentage = round_pct(self.revenue_share_percentage);
        self
    }
}

impl RoundForDisplay for MonthlyAggregate {
    fn rounded(mut self) -> Self {
        self.total_revenue = round_money(self.total_revenue);
        self
    }
}

impl RoundForDisplay for SalesSummary {
    fn rounded(mut self) -> Self {
        self.total_revenue = round_money(self.total_revenue);
        self.avg_order_value = round_money(self.avg_order_value);
        self
    }
}

// ── Reducers ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Bucket<'a> {
    revenue:  f64,
    invoices: BTreeSet<&'a str>,
}

impl Bucket<'_> {
    fn avg_per_invoice(&self) -> f64 {
        if self.invoices.is_empty() {
            0.0
        } else {
            self.revenue / self.invoices.len() as f64
        }
    }
}

fn label_or_unknown(value: &str) -> &str {
    if value.trim().is_empty() {
        UNKNOWN_LABEL
    } else {
        value
    }
}

/// One row per calendar date, ascending.
pub fn daily(transactions: &[Transaction]) -> Vec<DailyAggregate> {
    let mut days: BTreeMap<NaiveDate, Bucket> = BTreeMap::new();
    for t in transactions {
        let b = days.entry(t.invoice_date).or_default();
        b.revenue += t.total_revenue;
        b.invoices.insert(t.invoice_id.as_str());
    }

    days.into_iter()
        .map(|(sale_date, b)| DailyAggregate {
            sale_date,
            daily_revenue:     b.revenue,
            transaction_count: b.invoices.len() as i64,
            avg_order_value:   b.avg_per_invoice(),
        })
        .collect()
}

/// One row per country, empty countries under "Unknown".
/// Ordered by revenue desc, then country.
pub fn by_country(transactions: &[Transaction]) -> Vec<CountryAggregate> {
    let grand_total: f64 = transactions.iter().map(|t| t.total_revenue).sum();

    let mut countries: BTreeMap<&str, Bucket> = BTreeMap::new();
    for t in transactions {
        let b = countries.entry(label_or_unknown(&t.country)).or_default();
        b.revenue += t.total_revenue;
        b.invoices.insert(t.invoice_id.as_str());
    }

    let mut rows: Vec<CountryAggregate> = countries
        .into_iter()
        .map(|(country, b)| CountryAggregate {
            country:                  country.to_string(),
            total_revenue:            b.revenue,
            transaction_count:        b.invoices.len() as i64,
            avg_transaction_value:    b.avg_per_invoice(),
            revenue_share_percentage: share_pct(b.revenue, grand_total),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_revenue
            .total_cmp(&a.total_revenue)
            .then_with(|| a.country.cmp(&b.country))
    });
    rows
}

/// One row per exact product description. Ordered by revenue desc, then
/// description.
pub fn by_product(transactions: &[Transaction], display_limit: usize) -> Vec<ProductAggregate> {
    struct Acc {
        quantity:   i64,
        revenue:    f64,
        price_sum:  f64,
        line_count: usize,
    }

    let grand_total: f64 = transactions.iter().map(|t| t.total_revenue).sum();

    let mut products: BTreeMap<&str, Acc> = BTreeMap::new();
    for t in transactions {
        let acc = products
            .entry(label_or_unknown(&t.product_description))
            .or_insert(Acc { quantity: 0, revenue: 0.0, price_sum: 0.0, line_count: 0 });
        acc.quantity += t.quantity;
        acc.revenue += t.total_revenue;
        acc.price_sum += t.unit_price;
        acc.line_count += 1;
    }

    let mut rows: Vec<ProductAggregate> = products
        .into_iter()
        .map(|(description, acc)| ProductAggregate {
            description:              description.to_string(),
            display_name:             truncate_for_display(description, display_limit),
            total_quantity:           acc.quantity,
            total_revenue:            acc.revenue,
            avg_unit_price:           acc.price_sum / acc.line_count as f64,
            revenue_share_percentage: share_pct(acc.revenue, grand_total),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_revenue
            .total_cmp(&a.total_revenue)
            .then_with(|| a.description.cmp(&b.description))
    });
    rows
}

/// One row per (year, month), ascending.
pub fn monthly(transactions: &[Transaction]) -> Vec<MonthlyAggregate> {
    #[derive(Default)]
    struct Acc<'a> {
        revenue:   f64,
        customers: BTreeSet<&'a str>,
        invoices:  BTreeSet<&'a str>,
    }

    let mut months: BTreeMap<(i32, u32), Acc> = BTreeMap::new();
    for t in transactions {
        let acc = months
            .entry((t.invoice_date.year(), t.invoice_date.month()))
            .or_default();
        acc.revenue += t.total_revenue;
        acc.invoices.insert(t.invoice_id.as_str());
        if t.has_customer() {
            acc.customers.insert(t.customer_id.as_str());
        }
    }

    months
        .into_iter()
        .map(|((year, month), acc)| MonthlyAggregate {
            year,
            month,
            month_label:       format!("{year:04}-{month:02}"),
            total_revenue:     acc.revenue,
            unique_customers:  acc.customers.len() as i64,
            transaction_count: acc.invoices.len() as i64,
        })
        .collect()
}

/// Headline totals over the whole snapshot.
pub fn sales_summary(transactions: &[Transaction]) -> SalesSummary {
    let total_revenue: f64 = transactions.iter().map(|t| t.total_revenue).sum();
    let invoices: BTreeSet<&str> = transactions.iter().map(|t| t.invoice_id.as_str()).collect();
    let customers: BTreeSet<&str> = transactions
        .iter()
        .filter(|t| t.has_customer())
        .map(|t| t.customer_id.as_str())
        .collect();

    let total_orders = invoices.len() as i64;
    SalesSummary {
        total_revenue,
        total_orders,
        unique_customers: customers.len() as i64,
        avg_order_value: if total_orders > 0 {
            total_revenue / total_orders as f64
        } else {
            0.0
        },
    }
}

/// Truncate to `limit` characters, marking the cut with "...".
pub fn truncate_for_display(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let keep = limit.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

// ── Job ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rollup {
    Daily,
    Country,
    Product,
    Monthly,
    Summary,
}

/// One rollup table per job, so each holds its own lock.
#[derive(Debug)]
pub struct RollupJob {
    rollup:        Rollup,
    display_limit: usize,
}

impl RollupJob {
    pub fn new(rollup: Rollup, display_limit: usize) -> Self {
        Self { rollup, display_limit }
    }
}

impl RecomputeJob for RollupJob {
    fn name(&self) -> &'static str {
        match self.rollup {
            Rollup::Daily   => "daily_rollup",
            Rollup::Country => "country_rollup",
            Rollup::Product => "product_rollup",
            Rollup::Monthly => "monthly_rollup",
            Rollup::Summary => "sales_summary",
        }
    }

    fn tables(&self) -> &'static [&'static str] {
        match self.rollup {
            Rollup::Daily   => &[tables::DAILY_SALES],
            Rollup::Country => &[tables::COUNTRY_SUMMARY],
            Rollup::Product => &[tables::PRODUCT_PERFORMANCE],
            Rollup::Monthly => &[tables::MONTHLY_SALES],
            Rollup::Summary => &[tables::SALES_SUMMARY],
        }
    }

    fn recompute(
        &mut self,
        input: &BatchInput,
        store: &AnalyticsStore,
    ) -> AnalyticsResult<Vec<TableWrite>> {
        let txns = &input.transactions;
        let run_id = &input.run_id;

        let (table, rows) = match self.rollup {
            Rollup::Daily => {
                let rows = daily(txns);
                store.replace_daily(run_id, &rows)?;
                (tables::DAILY_SALES, rows.len())
            }
            Rollup::Country => {
                let rows = by_country(txns);
                store.replace_countries(run_id, &rows)?;
                (tables::COUNTRY_SUMMARY, rows.len())
            }
            Rollup::Product => {
                let rows = by_product(txns, self.display_limit);
                store.replace_products(run_id, &rows)?;
                (tables::PRODUCT_PERFORMANCE, rows.len())
            }
            Rollup::Monthly => {
                let rows = monthly(txns);
                store.replace_monthly(run_id, &rows)?;
                (tables::MONTHLY_SALES, rows.len())
            }
            Rollup::Summary => {
                let summary = sales_summary(txns);
                store.replace_sales_summary(run_id, &summary)?;
                (tables::SALES_SUMMARY, 1)
            }
        };

        log::debug!("{}: {rows} rows", self.name());
        Ok(vec![TableWrite { table, rows }])
    }
}
