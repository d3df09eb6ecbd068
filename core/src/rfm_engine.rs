//! RFM engine: per-customer recency/frequency/monetary scoring.
//!
//! This engine:
//!   1. Groups the snapshot by customer (lines without a customer are skipped)
//!   2. Computes recency, distinct-invoice frequency and monetary value
//!   3. Assigns quintile scores 1–5 per metric
//!   4. Derives the composite score and segment label
//!   5. Summarises segments for the segment_summary table
//!
//! Output is a pure function of (transactions, analysis date) and is
//! ordered by customer_id, so repeated runs are byte-identical.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    error::AnalyticsResult,
    job::{BatchInput, RecomputeJob, TableWrite},
    model::Transaction,
    outcome::RoundForDisplay,
    segment::{assign_segment, composite_score},
    store::{tables, AnalyticsStore},
    types::{round_money, round_pct, round_to, share_pct, CustomerId},
};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerMetrics {
    pub customer_id:  CustomerId,
    pub recency_days: i64,
    pub frequency:    i64,
    pub monetary:     f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfmRecord {
    pub customer_id:  CustomerId,
    pub recency_days: i64,
    pub frequency:    i64,
    pub monetary:     f64,
    pub r_score:      u8,
    pub f_score:      u8,
    pub m_score:      u8,
    pub rfm_score:    u16,
    pub segment:      String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub segment:             String,
    pub customer_count:      i64,
    pub total_revenue:       f64,
    pub avg_monetary:        f64,
    pub customer_percentage: f64,
    pub revenue_percentage:  f64,
}

/// Single-customer view served by key lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerValue {
    pub customer_id:           CustomerId,
    pub total_spent:           f64,
    pub total_orders:          i64,
    pub avg_order_value:       f64,
    pub days_since_last_order: i64,
    pub segment:               String,
}

impl From<&RfmRecord> for CustomerValue {
    fn from(r: &RfmRecord) -> Self {
        let avg_order_value = if r.frequency > 0 {
            r.monetary / r.frequency as f64
        } else {
            0.0
        };
        Self {
            customer_id: r.customer_id.clone(),
            total_spent: r.monetary,
            total_orders: r.frequency,
            avg_order_value,
            days_since_last_order: r.recency_days,
            segment: r.segment.clone(),
        }
    }
}

/// Table-wide statistics over rfm_segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfmOverview {
    pub total_customers:        i64,
    pub average_recency_days:   f64,
    pub average_frequency:      f64,
    pub average_customer_value: f64,
    pub total_customer_value:   f64,
    pub best_recency_days:      i64,
    pub worst_recency_days:     i64,
    pub max_frequency:          i64,
    pub max_customer_value:     f64,
}

impl RoundForDisplay for RfmRecord {
    fn rounded(mut self) -> Self {
        self.monetary = round_money(self.monetary);
        self
    }
}

impl RoundForDisplay for SegmentSummary {
    fn rounded(mut self) -> Self {
        self.total_revenue = round_money(self.total_revenue);
        self.avg_monetary = round_money(self.avg_monetary);
        self.customer_percentage = round_pct(self.customer_percentage);
        self.revenue_percentage = round_pct(self.revenue_percentage);
        self
    }
}

impl RoundForDisplay for CustomerValue {
    fn rounded(mut self) -> Self {
        self.total_spent = round_money(self.total_spent);
        self.avg_order_value = round_money(self.avg_order_value);
        self
    }
}

impl RoundForDisplay for RfmOverview {
    fn rounded(mut self) -> Self {
        self.average_recency_days = round_to(self.average_recency_days, 1);
        self.average_frequency = round_money(self.average_frequency);
        self.average_customer_value = round_money(self.average_customer_value);
        self.total_customer_value = round_money(self.total_customer_value);
        self.max_customer_value = round_money(self.max_customer_value);
        self
    }
}

// ── Scoring ──────────────────────────────────────────────────────────────────

/// Per-customer raw metrics, ordered by customer_id.
///
/// Only lines with a customer and `invoice_date <= analysis_date` count.
pub fn customer_metrics(
    transactions: &[Transaction],
    analysis_date: NaiveDate,
) -> Vec<CustomerMetrics> {
    struct Acc<'a> {
        last_invoice: NaiveDate,
        invoices:     BTreeSet<&'a str>,
        monetary:     f64,
    }

    let mut by_customer: BTreeMap<&str, Acc> = BTreeMap::new();
    for t in transactions
        .iter()
        .filter(|t| t.has_customer() && t.invoice_date <= analysis_date)
    {
        let acc = by_customer.entry(t.customer_id.as_str()).or_insert(Acc {
            last_invoice: t.invoice_date,
            invoices:     BTreeSet::new(),
            monetary:     0.0,
        });
        acc.last_invoice = acc.last_invoice.max(t.invoice_date);
        acc.invoices.insert(t.invoice_id.as_str());
        acc.monetary += t.total_revenue;
    }

    by_customer
        .into_iter()
        .map(|(customer_id, acc)| CustomerMetrics {
            customer_id:  customer_id.to_string(),
            recency_days: (analysis_date - acc.last_invoice).num_days(),
            frequency:    acc.invoices.len() as i64,
            monetary:     acc.monetary,
        })
        .collect()
}

/// Quintile scores for a population, given its indices ordered worst to best.
///
/// Rank `i` of `n` falls in bucket `floor(5i / n)`; the score is bucket + 1.
/// For n >= 5 each bucket holds floor(n/5) or ceil(n/5) members.
pub fn quintile_scores(worst_to_best: &[usize]) -> Vec<u8> {
    let n = worst_to_best.len();
    let mut scores = vec![0u8; n];
    for (rank, &idx) in worst_to_best.iter().enumerate() {
        scores[idx] = (rank * 5 / n) as u8 + 1;
    }
    scores
}

/// Stable sort of indices by `cmp`. Because `metrics` is ordered by
/// customer_id, ties keep ascending customer_id order.
fn ranked_indices<F>(metrics: &[CustomerMetrics], cmp: F) -> Vec<usize>
where
    F: Fn(&CustomerMetrics, &CustomerMetrics) -> Ordering,
{
    let mut order: Vec<usize> = (0..metrics.len()).collect();
    order.sort_by(|&a, &b| cmp(&metrics[a], &metrics[b]));
    order
}

/// Score and segment every customer in the snapshot.
pub fn score_customers(transactions: &[Transaction], analysis_date: NaiveDate) -> Vec<RfmRecord> {
    let metrics = customer_metrics(transactions, analysis_date);
    if metrics.is_empty() {
        return Vec::new();
    }

    // Worst first: long recency, few invoices, low spend.
    let r_scores = quintile_scores(&ranked_indices(&metrics, |a, b| {
        b.recency_days.cmp(&a.recency_days)
    }));
    let f_scores = quintile_scores(&ranked_indices(&metrics, |a, b| {
        a.frequency.cmp(&b.frequency)
    }));
    let m_scores = quintile_scores(&ranked_indices(&metrics, |a, b| {
        a.monetary.total_cmp(&b.monetary)
    }));

    metrics
        .into_iter()
        .enumerate()
        .map(|(i, m)| {
            let (r, f, mo) = (r_scores[i], f_scores[i], m_scores[i]);
            RfmRecord {
                customer_id:  m.customer_id,
                recency_days: m.recency_days,
                frequency:    m.frequency,
                monetary:     m.monetary,
                r_score:      r,
                f_score:      f,
                m_score:      mo,
                rfm_score:    composite_score(r, f, mo),
                segment:      assign_segment(r, f, mo).label().to_string(),
            }
        })
        .collect()
}

/// Group RFM records by segment. Ordered by revenue desc, then label.
pub fn summarize_segments(records: &[RfmRecord]) -> Vec<SegmentSummary> {
    let total_customers = records.len() as f64;
    let total_revenue: f64 = records.iter().map(|r| r.monetary).sum();

    let mut groups: BTreeMap<&str, (i64, f64)> = BTreeMap::new();
    for r in records {
        let entry = groups.entry(r.segment.as_str()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += r.monetary;
    }

    let mut summaries: Vec<SegmentSummary> = groups
        .into_iter()
        .map(|(segment, (count, revenue))| SegmentSummary {
            segment:             segment.to_string(),
            customer_count:      count,
            total_revenue:       revenue,
            avg_monetary:        revenue / count as f64,
            customer_percentage: share_pct(count as f64, total_customers),
            revenue_percentage:  share_pct(revenue, total_revenue),
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.total_revenue
            .total_cmp(&a.total_revenue)
            .then_with(|| a.segment.cmp(&b.segment))
    });
    summaries
}

// ── Job ──────────────────────────────────────────────────────────────────────

/// Replaces rfm_segments and segment_summary together.
#[derive(Debug, Default)]
pub struct RfmJob;

impl RecomputeJob for RfmJob {
    fn name(&self) -> &'static str {
        "rfm"
    }

    fn tables(&self) -> &'static [&'static str] {
        &[tables::RFM_SEGMENTS, tables::SEGMENT_SUMMARY]
    }

    fn recompute(
        &mut self,
        input: &BatchInput,
        store: &AnalyticsStore,
    ) -> AnalyticsResult<Vec<TableWrite>> {
        let records = score_customers(&input.transactions, input.analysis_date);
        let summaries = summarize_segments(&records);

        store.replace_rfm(&input.run_id, &records, &summaries)?;

        log::debug!(
            "rfm: {} customers scored into {} segments (analysis date {})",
            records.len(),
            summaries.len(),
            input.analysis_date
        );

        Ok(vec![
            TableWrite { table: tables::RFM_SEGMENTS, rows: records.len() },
            TableWrite { table: tables::SEGMENT_SUMMARY, rows: summaries.len() },
        ])
    }
}
